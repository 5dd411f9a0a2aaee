//! Error types for tunnelbar-core operations.
//!
//! Most of the core never surfaces these: probe failures become connection
//! states and a broken data file becomes an empty document. What remains are
//! setup-time failures (paths, config files) and caller mistakes.

use std::path::PathBuf;

/// All errors that can occur in tunnelbar-core operations.
#[derive(Debug, thiserror::Error)]
pub enum TunnelbarError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Configuration write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid recent-location capacity: {0} (must be at least 1)")]
    InvalidCapacity(usize),

    #[error("Invalid polling interval: {0}s (must be at least 1)")]
    InvalidInterval(u64),

    #[error("Invalid location pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Command Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("No command template configured for operation: {0}")]
    UnknownOperation(String),

    #[error("Command execution failed: {operation}: {details}")]
    CommandFailed { operation: String, details: String },
}

impl TunnelbarError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        TunnelbarError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using TunnelbarError.
pub type Result<T> = std::result::Result<T, TunnelbarError>;
