//! Runtime error types.

use identity_bridge::BridgeError;
use realtime_channels::ChannelError;
use thiserror::Error;

/// Error type for runtime-level flows.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Identity provider rejected the login token
    #[error("Authentication rejected with status {0}")]
    AuthRejected(u16),

    /// Reconciliation or claim handling failed
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Realtime channel failure
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using RuntimeError.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
