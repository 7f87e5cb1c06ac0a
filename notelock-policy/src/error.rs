//! Policy error types.

use thiserror::Error;

/// Result type for breach lookups.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors from the breach-check service. Never surfaced by
/// [`breach_count`](crate::breach_count) or validation; they only reach
/// callers of a [`BreachLookup`](crate::BreachLookup) directly.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed range response: {0}")]
    Protocol(String),
}

impl PolicyError {
    /// Short label safe to log: never includes response text or URLs.
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyError::Http(e) if e.is_timeout() => "timeout",
            PolicyError::Http(e) if e.is_connect() => "connect",
            PolicyError::Http(e) if e.is_status() => "status",
            PolicyError::Http(_) => "http",
            PolicyError::Protocol(_) => "protocol",
        }
    }
}
