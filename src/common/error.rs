//! Error types for qfrun
//!
//! Messages are meant to be read in a CI log, so they name the offending
//! value and, where possible, how to fix it.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qfrun
#[derive(Error, Debug)]
pub enum Error {
    // === Argument Engine Errors ===
    #[error("Preset '{kind}' for '{key}' requires a value")]
    InvalidPreset { kind: String, key: String },

    #[error("No suite files matched '{0}'")]
    NoSuitesResolved(String),

    // === Runner Errors ===
    #[error("QF-Test runner '{name}' not found. Searched: {searched}")]
    RunnerNotFound { name: String, searched: String },

    #[error("Failed to launch '{program}': {reason}")]
    LaunchFailed { program: String, reason: String },

    #[error("Runner timed out after {0} seconds")]
    Timeout(u64),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid preset error
    pub fn invalid_preset(kind: impl ToString, key: &str) -> Self {
        Self::InvalidPreset {
            kind: kind.to_string(),
            key: key.to_string(),
        }
    }

    /// Create a runner not found error with search paths
    pub fn runner_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::RunnerNotFound {
            name: name.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Create a launch failed error
    pub fn launch_failed(program: &str, reason: impl ToString) -> Self {
        Self::LaunchFailed {
            program: program.to_string(),
            reason: reason.to_string(),
        }
    }
}
