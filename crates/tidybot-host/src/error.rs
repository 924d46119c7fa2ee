//! Error types for tidybot-host

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by a repository host operation.
#[derive(Error, Debug)]
pub enum HostError {
    /// Transport-level failure (connect, TLS, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The host answered with a non-success status
    #[error("host API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Requested resource does not exist
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Rate limit exhausted
    #[error("rate limit exceeded, resets at {reset_at:?}")]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// Endpoint URL could not be built
    #[error("invalid API url: {0}")]
    InvalidUrl(String),

    /// Response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Failure injected by a test fake
    #[error("injected failure: {0}")]
    Injected(String),
}

impl HostError {
    /// Whether the error is a 404-style absence rather than a real failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            HostError::NotFound { .. } => true,
            HostError::Api { status, .. } => *status == 404,
            _ => false,
        }
    }
}
