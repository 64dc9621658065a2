use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, ValidatorError};
use crate::staging::StagedPaths;

/// Extension of project definition files
pub const PROJECT_EXTENSION: &str = "dtproj";

/// Extension of package definition files
pub const PACKAGE_EXTENSION: &str = "dtsx";

/// Kind of SSIS file, decided by extension alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Project,
    Package,
}

impl FileKind {
    pub fn of(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            PROJECT_EXTENSION => Some(FileKind::Project),
            PACKAGE_EXTENSION => Some(FileKind::Package),
            _ => None,
        }
    }
}

/// Every SSIS file found under a root, in walk order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveredFiles {
    pub projects: Vec<PathBuf>,
    pub packages: Vec<PathBuf>,
}

/// Files that make up one project, after the optional staging filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedProject {
    pub root: PathBuf,
    pub project_file: PathBuf,
    /// False only when a staging filter is active and the project file is not staged
    pub include_project: bool,
    /// All package files on disk, used for linkage checks
    pub package_files: Vec<PathBuf>,
    /// Package files to validate
    pub selected_packages: Vec<PathBuf>,
}

impl LocatedProject {
    /// Project name, taken from the project file stem
    pub fn name(&self) -> String {
        self.project_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Finds project and package files beneath a project root
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// Directory names never descended into (build output); hidden directories are always skipped
    skipped_directories: Vec<String>,
}

impl FileDiscovery {
    pub fn new() -> Self {
        Self {
            skipped_directories: vec!["bin".to_string(), "obj".to_string()],
        }
    }

    /// Walk `root` and classify every SSIS file below it
    pub fn discover_files(&self, root: &Path) -> Result<DiscoveredFiles> {
        let metadata =
            std::fs::metadata(root).map_err(|e| ValidatorError::FileSystemTraversal {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;
        if !metadata.is_dir() {
            return Err(ValidatorError::FileSystemTraversal {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let skipped = self.skipped_directories.clone();
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
                    return true;
                }
                let name = entry.file_name();
                let hidden = name.to_string_lossy().starts_with('.');
                !hidden && !skipped.iter().any(|skip| name.eq_ignore_ascii_case(skip))
            })
            .build();

        let mut files = DiscoveredFiles::default();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Log error but continue processing other files
                    warn!("Error walking {}: {}", root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            match FileKind::of(entry.path()) {
                Some(FileKind::Project) => files.projects.push(entry.into_path()),
                Some(FileKind::Package) => files.packages.push(entry.into_path()),
                None => {}
            }
        }

        debug!(
            root = %root.display(),
            projects = files.projects.len(),
            packages = files.packages.len(),
            "discovered files"
        );
        Ok(files)
    }

    /// Locate the single project file and the package files under `root`
    ///
    /// With `staged`, only staged packages are selected, and the project file
    /// itself is only included when it is staged too.
    pub fn locate(&self, root: &Path, staged: Option<&StagedPaths>) -> Result<LocatedProject> {
        let DiscoveredFiles {
            mut projects,
            packages,
        } = self.discover_files(root)?;

        let project_file = match projects.len() {
            0 => {
                return Err(ValidatorError::ProjectFileNotFound {
                    root: root.to_path_buf(),
                });
            }
            1 => projects.remove(0),
            _ => {
                return Err(ValidatorError::AmbiguousProjectFile {
                    root: root.to_path_buf(),
                    candidates: projects,
                });
            }
        };

        let (include_project, selected_packages): (bool, Vec<PathBuf>) = match staged {
            Some(staged) => (
                staged.contains(&project_file),
                packages
                    .iter()
                    .filter(|package| staged.contains(package))
                    .cloned()
                    .collect(),
            ),
            None => (true, packages.clone()),
        };

        if staged.is_some() {
            debug!(
                project_staged = include_project,
                staged_packages = selected_packages.len(),
                "applied staging filter"
            );
        }

        Ok(LocatedProject {
            root: root.to_path_buf(),
            project_file,
            include_project,
            package_files: packages,
            selected_packages,
        })
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}
