//! Local session-claim storage for the identity bridge.
//!
//! This crate provides the storage port behind which reconciled identity
//! claims live between reconciliations:
//! - **In-memory**: per-process map, the default for embedded/browser-like hosts
//! - **File**: JSON file with atomic replace, for daemon restarts
//!
//! Claims are a cache of the internal user record as of the last
//! reconciliation. They are never authoritative on their own.

mod claims;
mod file;
mod keys;
mod memory;
mod store;
mod traits;

pub use claims::{SessionClaims, UserRole};
pub use file::FileClaimStorage;
pub use keys::StorageKeys;
pub use memory::MemoryClaimStorage;
pub use store::ClaimStore;
pub use traits::ClaimStorage;

use thiserror::Error;

/// Error type for claim storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for claim storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
