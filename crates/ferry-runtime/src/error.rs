//! Error types for the provisioning workflow.
//!
//! Only [`RunError`] aborts a run. Everything else is caught at the record
//! (or role) boundary, written to the audit log and counted.

use serde_json::Value;
use thiserror::Error;

/// A failed call to the identity provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The token endpoint refused the client credentials.
    #[error("token request failed with status {status}: {body}")]
    Auth { status: u16, body: Value },

    /// The provider answered with a non-success status.
    #[error("provider rejected request with status {status}: {body}")]
    Rejected { status: u16, body: Value },

    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create call succeeded but carried no usable `Location` header.
    #[error("created resource has no usable Location header")]
    MissingLocation,

    /// The request never got a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Context for audit payloads: the response body when there is one,
    /// otherwise the error message.
    pub fn detail(&self) -> Value {
        match self {
            Self::Auth { body, .. } | Self::Rejected { body, .. } => body.clone(),
            other => Value::String(other.to_string()),
        }
    }

    /// HTTP status of the failed response, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Rejected { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// True when the provider reports a conflict with an existing object.
    pub fn is_conflict(&self) -> bool {
        if self.status() == Some(409) {
            return true;
        }
        match self {
            Self::Rejected { body, .. } => body
                .get("errorMessage")
                .and_then(Value::as_str)
                .map(|m| m.contains("already exists"))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Why a single record could not be provisioned. Never aborts the batch.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("record {0} has neither a phone number nor an email address")]
    NoUsername(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Failures that abort a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Token acquisition failed; nothing can proceed without credentials.
    #[error("failed to acquire provider token: {0}")]
    Auth(#[source] ProviderError),

    /// The pending record snapshot could not be read.
    #[error("failed to read source records: {0}")]
    Source(#[source] anyhow::Error),

    /// The run's audit file could not be created.
    #[error(transparent)]
    Audit(#[from] ferry_audit::AuditError),
}
