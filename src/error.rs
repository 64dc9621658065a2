use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed XML: {path} - {details}")]
    MalformedXml { path: PathBuf, details: String },

    #[error("No .dtproj file found under {root}")]
    ProjectFileNotFound { root: PathBuf },

    #[error("Ambiguous project: {} .dtproj files found under {root}", .candidates.len())]
    AmbiguousProjectFile {
        root: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("File system traversal error: {path} - {reason}")]
    FileSystemTraversal { path: PathBuf, reason: String },

    #[error("Staging lookup failed: {details}")]
    Staging { details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lookup failures raised by rule extractors
///
/// These never reach the user: the validator turns them into failing rows
/// (required rules) or drops the row entirely (optional rules).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Attribute not found: {attribute}")]
    AttributeNotFound { attribute: String },
}

impl LookupError {
    pub fn missing(attribute: impl Into<String>) -> Self {
        LookupError::AttributeNotFound {
            attribute: attribute.into(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidatorError>;

/// Extractor result type alias
pub type LookupResult<T> = std::result::Result<T, LookupError>;
