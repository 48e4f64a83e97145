//! Error types for CLI operations.

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Bad invocation (no inputs, conflicting overrides...)
    #[error("Invalid arguments: {message}")]
    Argument { message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// Input file could not be read
    #[error("Cannot read input file {}: {source}", .path.display())]
    InputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration or job construction error
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Results could not be written
    #[error("Cannot write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The job ended in a failure outcome
    #[error("Job {job_id} failed: {outcome}")]
    RunFailed { job_id: String, outcome: String },

    /// The job succeeded but its worker could not be stopped
    #[error("Job {job_id} succeeded but worker teardown failed: {error}")]
    TeardownFailed { job_id: String, error: String },
}

impl CliError {
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
