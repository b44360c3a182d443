//! Channel and transport error types.

use thiserror::Error;

/// Error type for upstream feed operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Upstream connection could not be established
    #[error("Transport connect error: {0}")]
    Connect(String),

    /// Upstream closed the feed unexpectedly
    #[error("Transport closed: {0}")]
    Closed(String),

    /// Malformed event or protocol violation
    #[error("Transport protocol error: {0}")]
    Protocol(String),
}

/// Failure reported by a subscriber callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    /// Create a callback error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Error delivered to a subscriber's `on_error` callback or returned from
/// registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Upstream feed failure; the key has returned to closed
    #[error("Channel transport error: {0}")]
    Transport(#[from] TransportError),

    /// This subscriber's own callback failed on a dispatched event
    #[error("Channel callback error: {0}")]
    Callback(#[from] CallbackError),
}

/// Result type alias for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;
