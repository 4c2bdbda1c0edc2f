//! Common error types for onair

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for onair operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the onair crates
#[derive(Error, Debug)]
pub enum Error {
    /// Remote station source unreachable or answered with a non-2xx status
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Remote station source answered with a body that does not fit the schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Push to a single client channel failed
    #[error("Channel delivery failure: {0}")]
    ChannelDelivery(String),

    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Soft-failure class of a poll error, if this error is one
    ///
    /// Poll cycles only ever fail softly: both kinds are recovered by keeping
    /// the last known status and retrying on the next tick.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Error::UpstreamUnavailable(_) => Some(FailureKind::UpstreamUnavailable),
            Error::MalformedResponse(_) => Some(FailureKind::MalformedResponse),
            _ => None,
        }
    }
}

/// Soft failure reported for a poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Network error or non-2xx status
    UpstreamUnavailable,
    /// JSON parse or schema mismatch
    MalformedResponse,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::UpstreamUnavailable => write!(f, "UpstreamUnavailable"),
            FailureKind::MalformedResponse => write!(f, "MalformedResponse"),
        }
    }
}
