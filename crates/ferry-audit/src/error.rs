//! Error types for the audit crate.

use thiserror::Error;

/// Errors that can occur while creating or reading an audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to initialize the audit log file.
    #[error("failed to initialize audit log {path}: {source}")]
    InitializationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A line does not have the `timestamp,json` shape.
    #[error("malformed audit line: {0}")]
    MalformedLine(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
