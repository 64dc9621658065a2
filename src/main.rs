use std::process::ExitCode;

use clap::CommandFactory;
use clap::error::ErrorKind;

use ssis_validator::cli::{Cli, Config};
use ssis_validator::error_reporter::ErrorReporter;
use ssis_validator::file_discovery::FileDiscovery;
use ssis_validator::logging;
use ssis_validator::output::Output;
use ssis_validator::rules::RuleSet;
use ssis_validator::runner;
use ssis_validator::staging::GitStaging;
use ssis_validator::validator::ValidationEngine;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    if let Err(err) = cli.validate() {
        Cli::command().error(ErrorKind::ArgumentConflict, err).exit();
    }

    let config = Config::from_cli(&cli);
    logging::init(config.verbosity());
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "ssis-validator starting");

    let engine = ValidationEngine::new(FileDiscovery::new(), RuleSet::standard());
    let output = Output::new(config.verbosity(), config.format).with_colors(config.colors);
    let mut stdout = std::io::stdout().lock();

    match runner::run(&config, &engine, &GitStaging, &output, &mut stdout) {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(err) => {
            ErrorReporter::new(config.verbosity()).report(&err);
            ExitCode::FAILURE
        }
    }
}
