//! Layered error definitions
//!
//! Categorized by source: config / key / state / store / worker

use thiserror::Error;

/// Unified contract error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Job Errors =====
    /// Store key rejected
    #[error("invalid store key '{key}': {message}")]
    InvalidKey { key: String, message: String },

    /// Job has nothing to submit
    #[error("job has no inputs")]
    EmptyJob,

    /// Run state machine violation
    #[error("invalid state transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid key error
    pub fn invalid_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Shared store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing medium IO failure
    #[error("store io error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Write was rejected by the backend
    #[error("store rejected write to '{key}': {message}")]
    WriteRejected { key: String, message: String },

    /// Backend not reachable (container gone, volume unmounted...)
    #[error("store backend unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Wrap an IO error with the key it happened on
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }

    /// Create write rejected error
    pub fn write_rejected(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteRejected {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Worker lifecycle errors
#[derive(Debug, Error)]
pub enum WorkerError {
    /// External command could not be spawned
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// External command exited unsuccessfully
    #[error("'{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// Worker refused to start
    #[error("worker '{worker}' failed to start: {message}")]
    StartFailed { worker: String, message: String },

    /// Worker is not running
    #[error("worker '{worker}' is not running")]
    NotRunning { worker: String },
}

impl WorkerError {
    /// Create start failure
    pub fn start_failed(worker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StartFailed {
            worker: worker.into(),
            message: message.into(),
        }
    }
}
