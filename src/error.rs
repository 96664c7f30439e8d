use std::path::PathBuf;
use thiserror::Error;

/// Failures the migrator reports to its caller.
///
/// Remote-model trouble never shows up here: those paths degrade to the
/// deterministic fallback. What remains is misconfiguration and file I/O.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("sample schema {path:?} could not be loaded: {reason}")]
    SampleSchema { path: PathBuf, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MigrateError>;
