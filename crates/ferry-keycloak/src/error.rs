use thiserror::Error;

/// Errors raised while building a client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid provider base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}
