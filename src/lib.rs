//! # ssis-validator Library
//!
//! Policy checks for SQL Server Integration Services projects. Each project
//! directory is searched for its `.dtproj` file and `.dtsx` packages, every
//! file is parsed, and a fixed table of rules is evaluated against it. The
//! resulting report decides the process exit code, which makes the tool
//! usable as a CI or pre-commit gate.

pub mod cli;
pub mod descriptor;
pub mod error;
pub mod error_reporter;
pub mod file_discovery;
pub mod logging;
pub mod output;
pub mod report;
pub mod rules;
pub mod runner;
pub mod staging;
pub mod validator;
pub mod xml;

pub use cli::{Cli, Config, OutputFormat, VerbosityLevel};
pub use descriptor::{PackageDescriptor, ProjectDescriptor};
pub use error::{LookupError, ValidatorError};
pub use error_reporter::ErrorReporter;
pub use file_discovery::{DiscoveredFiles, FileDiscovery, FileKind, LocatedProject};
pub use output::Output;
pub use report::{
    EntityKind, EntityReport, EntityStatus, ProjectOutcome, ProjectReport, ValidationReport,
};
pub use rules::{Expected, Requirement, Rule, RuleSet};
pub use staging::{GitStaging, StagedPaths, StagingProvider};
pub use validator::{ValidationEngine, ValidationResult, validate};
pub use xml::{Namespaces, Node, Observed, XmlDocument};
