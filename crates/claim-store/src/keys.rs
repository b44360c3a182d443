//! Storage key constants.

/// Storage keys used by the claim store
pub struct StorageKeys;

impl StorageKeys {
    /// Reconciled session claims (JSON)
    pub const SESSION_CLAIMS: &'static str = "session_claims";
}
