use crate::cli::VerbosityLevel;
use crate::error::ValidatorError;

/// Prints errors that end the invocation, with verbosity-dependent detail
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
}

impl ErrorReporter {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    /// Report a fatal error to stderr
    pub fn report(&self, error: &anyhow::Error) {
        eprintln!("{}", self.format(error));
    }

    pub fn format(&self, error: &anyhow::Error) -> String {
        let validator_error = error.downcast_ref::<ValidatorError>();
        match self.verbosity {
            VerbosityLevel::Quiet => format!("ERROR: {}", error),
            VerbosityLevel::Normal => {
                let mut output = format!("Error: {}", error);
                if let Some(suggestion) = validator_error.and_then(suggestion) {
                    output.push_str(&format!("\nSuggestion: {}", suggestion));
                }
                output
            }
            VerbosityLevel::Verbose => {
                let mut output = format!("Error: {}", error);
                if let Some(suggestion) = validator_error.and_then(suggestion) {
                    output.push_str(&format!("\nSuggestion: {}", suggestion));
                }
                output.push_str("\nError Chain:");
                for (level, cause) in error.chain().skip(1).enumerate() {
                    output.push_str(&format!("\n  {}: {}", level + 1, cause));
                }
                output
            }
        }
    }
}

fn suggestion(error: &ValidatorError) -> Option<&'static str> {
    match error {
        ValidatorError::Staging { .. } => {
            Some("Run inside a git checkout with git on PATH, or drop --repository")
        }
        ValidatorError::Config(_) => Some("Run with --help to see valid option combinations"),
        ValidatorError::Io(_) | ValidatorError::FileRead { .. } => {
            Some("Check that the files exist and are readable")
        }
        ValidatorError::MalformedXml { .. } => {
            Some("Open the file in Visual Studio and save it again")
        }
        ValidatorError::ProjectFileNotFound { .. } => {
            Some("Point --project at the directory holding the .dtproj file")
        }
        ValidatorError::AmbiguousProjectFile { .. } => {
            Some("Point --project at a directory holding a single .dtproj file")
        }
        ValidatorError::FileSystemTraversal { .. } | ValidatorError::Json(_) => None,
    }
}
