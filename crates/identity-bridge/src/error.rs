//! Bridge error types.

use thiserror::Error;

/// Error type for reconciliation and provider operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Uniqueness violation on create. Recovered internally by retrying the
    /// reconciliation as an update; surfaces only if the retry also fails.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Referenced user or organization no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backing store rejected the operation
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Identity provider returned a non-success response
    #[error("Provider error: {status} - {message}")]
    Provider {
        /// HTTP status code from the provider
        status: u16,
        /// Response summary for debugging
        message: String,
    },

    /// Claim storage error
    #[error("Storage error: {0}")]
    Storage(#[from] claim_store::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl BridgeError {
    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            BridgeError::Provider { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

/// Result type alias using BridgeError.
pub type BridgeResult<T> = Result<T, BridgeError>;
