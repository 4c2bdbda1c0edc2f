//! Error types for the sync-service client

use thiserror::Error;

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connect, timeout, broken stream)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer from the sync service
    #[error("Server returned HTTP {0}")]
    Status(u16),

    /// Body that does not decode into the expected type
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}
