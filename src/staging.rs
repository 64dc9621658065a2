//! Staged-file lookup for repository mode
//!
//! The validator never touches git state itself. A [`StagingProvider`]
//! produces the set of staged paths once, up front, and that set is handed
//! explicitly to the file locator.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{Result, ValidatorError};

/// Paths staged in a repository, relative to its root with `/` separators
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StagedPaths {
    repository_root: PathBuf,
    paths: BTreeSet<String>,
}

impl StagedPaths {
    pub fn new<I, S>(repository_root: impl Into<PathBuf>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repository_root = repository_root.into();
        let repository_root =
            std::fs::canonicalize(&repository_root).unwrap_or(repository_root);
        Self {
            repository_root,
            paths: paths
                .into_iter()
                .map(|p| p.into().replace('\\', "/"))
                .collect(),
        }
    }

    pub fn repository_root(&self) -> &Path {
        &self.repository_root
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Is the file at `path` (absolute or relative to the working directory) staged?
    pub fn contains(&self, path: &Path) -> bool {
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        match absolute.strip_prefix(&self.repository_root) {
            Ok(relative) => self.paths.contains(&to_slash(relative)),
            Err(_) => false,
        }
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Source of the staged-path set
#[cfg_attr(test, mockall::automock)]
pub trait StagingProvider {
    /// Staged (added or modified) paths of the repository containing `start`
    fn staged_paths(&self, start: &Path) -> Result<StagedPaths>;
}

/// Reads the git index through the `git` executable
#[derive(Debug, Default, Clone, Copy)]
pub struct GitStaging;

impl GitStaging {
    fn git(&self, start: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(start)
            .output()
            .map_err(|err| ValidatorError::Staging {
                details: format!("failed to run git: {}", err),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ValidatorError::Staging {
                details: format!(
                    "git {} exited with {}: {}",
                    args.join(" "),
                    output.status,
                    stderr.trim()
                ),
            });
        }

        String::from_utf8(output.stdout).map_err(|err| ValidatorError::Staging {
            details: err.to_string(),
        })
    }
}

impl StagingProvider for GitStaging {
    fn staged_paths(&self, start: &Path) -> Result<StagedPaths> {
        let toplevel = self.git(start, &["rev-parse", "--show-toplevel"])?;
        let repository_root = PathBuf::from(toplevel.trim());

        let diff = self.git(
            start,
            &["diff", "--cached", "--name-only", "--diff-filter=AM", "-z"],
        )?;
        let staged = StagedPaths::new(
            repository_root,
            diff.split('\0').filter(|entry| !entry.is_empty()),
        );

        debug!(
            repository = %staged.repository_root().display(),
            staged = staged.len(),
            "read staged paths"
        );
        Ok(staged)
    }
}
