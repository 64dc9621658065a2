//! Aggregated validation results
//!
//! One [`ValidationReport`] per invocation holds a [`ProjectReport`] per
//! `--project` argument, which in turn holds an [`EntityReport`] for the
//! project file and each selected package.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::validator::ValidationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Project,
    Package,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Project => write!(f, "Project"),
            EntityKind::Package => write!(f, "Package"),
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityStatus {
    /// The file parsed and its rule table ran
    Evaluated { results: Vec<ValidationResult> },
    /// The file could not be read or parsed
    HardFailure { reason: String },
}

impl EntityStatus {
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, EntityStatus::HardFailure { .. })
    }

    /// Rule rows, empty for a hard failure
    pub fn results(&self) -> &[ValidationResult] {
        match self {
            EntityStatus::Evaluated { results } => results,
            EntityStatus::HardFailure { .. } => &[],
        }
    }
}

/// Report for one project or package file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityReport {
    pub kind: EntityKind,
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: EntityStatus,
}

impl EntityReport {
    pub fn evaluated(
        kind: EntityKind,
        name: &str,
        path: &Path,
        results: Vec<ValidationResult>,
    ) -> Self {
        Self {
            kind,
            name: name.to_string(),
            path: path.to_path_buf(),
            status: EntityStatus::Evaluated { results },
        }
    }

    pub fn hard_failure(kind: EntityKind, name: &str, path: &Path, reason: String) -> Self {
        Self {
            kind,
            name: name.to_string(),
            path: path.to_path_buf(),
            status: EntityStatus::HardFailure { reason },
        }
    }

    pub fn success(&self) -> bool {
        match &self.status {
            EntityStatus::Evaluated { results } => results.iter().all(|r| r.passed),
            EntityStatus::HardFailure { .. } => false,
        }
    }

    pub fn passed_rules(&self) -> usize {
        self.status.results().iter().filter(|r| r.passed).count()
    }

    pub fn total_rules(&self) -> usize {
        self.status.results().len()
    }
}

/// Whether the project's files could be found at all
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProjectOutcome {
    Located { entities: Vec<EntityReport> },
    /// Project file missing or ambiguous
    NotLocated { reason: String },
}

/// Report for one `--project` argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReport {
    pub name: String,
    pub root: PathBuf,
    #[serde(flatten)]
    pub outcome: ProjectOutcome,
}

impl ProjectReport {
    pub fn located(name: String, root: &Path, entities: Vec<EntityReport>) -> Self {
        Self {
            name,
            root: root.to_path_buf(),
            outcome: ProjectOutcome::Located { entities },
        }
    }

    /// A project whose files could not be located, named after its directory
    pub fn not_located(root: &Path, reason: String) -> Self {
        let name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self {
            name,
            root: root.to_path_buf(),
            outcome: ProjectOutcome::NotLocated { reason },
        }
    }

    pub fn entities(&self) -> &[EntityReport] {
        match &self.outcome {
            ProjectOutcome::Located { entities } => entities,
            ProjectOutcome::NotLocated { .. } => &[],
        }
    }

    pub fn success(&self) -> bool {
        match &self.outcome {
            ProjectOutcome::Located { entities } => entities.iter().all(EntityReport::success),
            ProjectOutcome::NotLocated { .. } => false,
        }
    }

    pub fn passed_rules(&self) -> usize {
        self.entities().iter().map(EntityReport::passed_rules).sum()
    }

    pub fn total_rules(&self) -> usize {
        self.entities().iter().map(EntityReport::total_rules).sum()
    }

    /// Hard failures, counting a project that could not be located as one
    pub fn hard_failures(&self) -> usize {
        match &self.outcome {
            ProjectOutcome::Located { entities } => entities
                .iter()
                .filter(|e| e.status.is_hard_failure())
                .count(),
            ProjectOutcome::NotLocated { .. } => 1,
        }
    }
}

/// Every project report of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub projects: Vec<ProjectReport>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, project: ProjectReport) {
        self.projects.push(project);
    }

    pub fn success(&self) -> bool {
        self.projects.iter().all(ProjectReport::success)
    }

    pub fn passed_rules(&self) -> usize {
        self.projects.iter().map(ProjectReport::passed_rules).sum()
    }

    pub fn total_rules(&self) -> usize {
        self.projects.iter().map(ProjectReport::total_rules).sum()
    }

    pub fn hard_failures(&self) -> usize {
        self.projects.iter().map(ProjectReport::hard_failures).sum()
    }

    /// Process exit code: 0 when everything passed, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.success() { 0 } else { 1 }
    }
}
