//! Rule evaluation
//!
//! [`validate`] runs one rule table against one descriptor. The
//! [`ValidationEngine`] drives a whole project: locate its files, load each
//! one, evaluate the matching table, and collect the rows into a
//! [`ProjectReport`]. A file that cannot be read or parsed becomes a hard
//! failure for that file only.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::descriptor::{PackageDescriptor, ProjectDescriptor};
use crate::file_discovery::{FileDiscovery, LocatedProject};
use crate::report::{EntityKind, EntityReport, ProjectReport};
use crate::rules::{Requirement, Rule, RuleSet};
use crate::staging::StagedPaths;
use crate::xml::Observed;

/// Outcome of one rule against one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub label: String,
    pub observed: Observed,
    pub expected: String,
    pub passed: bool,
    pub requirement: Requirement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ValidationResult {
    fn new<D>(rule: &Rule<D>, observed: Observed, passed: bool) -> Self {
        Self {
            label: rule.label.to_string(),
            observed,
            expected: rule.expected.to_string(),
            passed,
            requirement: rule.requirement,
            hint: rule.hint.map(str::to_string),
        }
    }

    pub fn status(&self) -> &'static str {
        if self.passed { "PASS" } else { "FAIL" }
    }
}

/// Evaluate a single rule
///
/// Returns `None` when an optional rule has nothing to look at.
pub fn evaluate<D>(descriptor: &D, rule: &Rule<D>) -> Option<ValidationResult> {
    match rule.extract(descriptor) {
        Ok(value) => {
            let passed = rule.expected.accepts(&value);
            trace!(rule = rule.label, observed = %value, passed, "evaluated rule");
            Some(ValidationResult::new(rule, Observed::Present(value), passed))
        }
        Err(err) => match rule.requirement {
            Requirement::Required => {
                debug!(rule = rule.label, error = %err, "required value missing");
                Some(ValidationResult::new(rule, Observed::Absent, false))
            }
            Requirement::Optional => {
                trace!(rule = rule.label, error = %err, "optional rule not applicable");
                None
            }
        },
    }
}

/// Evaluate every rule in declaration order
pub fn validate<D>(descriptor: &D, rules: &[Rule<D>]) -> Vec<ValidationResult> {
    rules
        .iter()
        .filter_map(|rule| evaluate(descriptor, rule))
        .collect()
}

/// Validates whole projects with a fixed rule set
#[derive(Debug, Default)]
pub struct ValidationEngine {
    discovery: FileDiscovery,
    rules: RuleSet,
}

impl ValidationEngine {
    pub fn new(discovery: FileDiscovery, rules: RuleSet) -> Self {
        Self { discovery, rules }
    }

    /// Locate, load and validate everything under one project root
    pub fn validate_project(&self, root: &Path, staged: Option<&StagedPaths>) -> ProjectReport {
        info!(project = %root.display(), "Processing project");

        let located = match self.discovery.locate(root, staged) {
            Ok(located) => located,
            Err(err) => {
                warn!(project = %root.display(), error = %err, "could not locate project");
                return ProjectReport::not_located(root, err.to_string());
            }
        };

        let mut entities = Vec::with_capacity(located.selected_packages.len() + 1);
        if located.include_project {
            entities.push(self.validate_project_file(&located));
        } else {
            debug!(
                project = %located.project_file.display(),
                "project file not staged, skipping project rules"
            );
        }
        for package in &located.selected_packages {
            entities.push(self.validate_package_file(package));
        }

        ProjectReport::located(located.name(), root, entities)
    }

    pub fn validate_project_file(&self, located: &LocatedProject) -> EntityReport {
        let path = &located.project_file;
        match ProjectDescriptor::load(path, located.package_files.clone()) {
            Ok(project) => EntityReport::evaluated(
                EntityKind::Project,
                &project.name,
                path,
                validate(&project, &self.rules.project),
            ),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "project file unusable");
                EntityReport::hard_failure(EntityKind::Project, &located.name(), path, err.to_string())
            }
        }
    }

    pub fn validate_package_file(&self, path: &Path) -> EntityReport {
        match PackageDescriptor::load(path) {
            Ok(package) => EntityReport::evaluated(
                EntityKind::Package,
                &package.name,
                path,
                validate(&package, &self.rules.package),
            ),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "package file unusable");
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                EntityReport::hard_failure(EntityKind::Package, &name, path, err.to_string())
            }
        }
    }
}
