use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::ValidatorError;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub enum VerbosityLevel {
    /// Only failures and the overall line
    Quiet,
    /// Every rule row
    #[default]
    Normal,
    /// Rule rows plus hints and file paths
    Verbose,
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per rule, grouped by project and file
    #[default]
    Human,
    /// The whole report as a JSON document
    Json,
    /// One line per project
    Summary,
}

/// Runtime configuration derived from CLI
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub projects: Vec<PathBuf>,
    pub repository: bool,
    pub format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
    pub colors: bool,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            projects: cli.projects.clone(),
            repository: cli.repository,
            format: cli.format,
            verbose: cli.verbose,
            quiet: cli.quiet,
            colors: !cli.no_color && atty::is(atty::Stream::Stdout),
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// SSIS project and package policy validator
#[derive(Parser, Debug, Clone)]
#[command(name = "ssis-validator")]
#[command(about = "Check SSIS project and package files against deployment policy")]
#[command(version)]
pub struct Cli {
    /// Project directory to validate (repeatable)
    #[arg(
        short = 'p',
        long = "project",
        value_name = "PATH",
        required = true,
        action = clap::ArgAction::Append
    )]
    pub projects: Vec<PathBuf>,

    /// Only validate files staged in the enclosing git repository
    #[arg(short = 'r', long = "repository")]
    pub repository: bool,

    /// Report format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (failures only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Checks clap cannot express on its own
    pub fn validate(&self) -> Result<(), ValidatorError> {
        if self.repository && self.projects.len() != 1 {
            return Err(ValidatorError::Config(format!(
                "--repository requires exactly one --project, got {}",
                self.projects.len()
            )));
        }
        Ok(())
    }
}
