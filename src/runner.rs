//! One invocation, start to finish
//!
//! Staging is resolved before any project is touched. Projects are then
//! validated in argument order, and in streaming formats each block is
//! written as soon as its project is done.

use std::io::Write;

use anyhow::Context;
use tracing::info;

use crate::cli::Config;
use crate::error::Result;
use crate::output::Output;
use crate::report::ValidationReport;
use crate::staging::{StagedPaths, StagingProvider};
use crate::validator::ValidationEngine;

/// Validate every configured project and write the report to `out`
pub fn run<W: Write>(
    config: &Config,
    engine: &ValidationEngine,
    staging: &dyn StagingProvider,
    output: &Output,
    out: &mut W,
) -> anyhow::Result<ValidationReport> {
    let staged: Option<StagedPaths> = if config.repository {
        let start = config
            .projects
            .first()
            .context("--repository needs a project path")?;
        let staged = staging.staged_paths(start)?;
        info!(
            repository = %staged.repository_root().display(),
            staged = staged.len(),
            "Repository mode: validating staged files only"
        );
        Some(staged)
    } else {
        info!(projects = config.projects.len(), "Validating all files");
        None
    };

    let mut report = ValidationReport::new();
    for root in &config.projects {
        let project = engine.validate_project(root, staged.as_ref());
        if output.streams() {
            write_block(out, &output.format_project(&project)).context("writing report")?;
        }
        report.push(project);
    }

    let overall = output.format_overall(&report)?;
    write_block(out, &overall).context("writing report")?;

    Ok(report)
}

fn write_block<W: Write>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}
