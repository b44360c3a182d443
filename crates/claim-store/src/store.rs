//! Typed facade over a claim storage backend.

use crate::{ClaimStorage, SessionClaims, StorageError, StorageKeys, StorageResult};
use std::sync::Arc;
use tracing::debug;

/// Manages the reconciled session claims behind a storage port.
///
/// The identity bridge is the only writer; everything else reads. Claims
/// are serialized as one JSON value under a single key so a partially
/// written multi-key session can never be observed.
#[derive(Clone)]
pub struct ClaimStore {
    storage: Arc<dyn ClaimStorage>,
}

impl ClaimStore {
    /// Create a claim store over the given backend.
    pub fn new(storage: Arc<dyn ClaimStorage>) -> Self {
        Self { storage }
    }

    /// Write the current session claims, replacing any previous value.
    pub fn write(&self, claims: &SessionClaims) -> StorageResult<()> {
        let json = serde_json::to_string(claims)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(StorageKeys::SESSION_CLAIMS, &json)?;
        debug!(
            internal_user_id = claims.internal_user_id,
            external_user_id = %claims.external_user_id,
            "Session claims written"
        );
        Ok(())
    }

    /// Read the current session claims, if any.
    pub fn read(&self) -> StorageResult<Option<SessionClaims>> {
        match self.storage.get(StorageKeys::SESSION_CLAIMS)? {
            Some(json) => {
                let claims: SessionClaims = serde_json::from_str(&json)
                    .map_err(|e| StorageError::Encoding(e.to_string()))?;
                Ok(Some(claims))
            }
            None => Ok(None),
        }
    }

    /// Remove all stored claims. Idempotent.
    pub fn clear(&self) -> StorageResult<()> {
        let existed = self.storage.delete(StorageKeys::SESSION_CLAIMS)?;
        if existed {
            debug!("Session claims cleared");
        }
        Ok(())
    }

    /// Check whether claims are currently stored.
    pub fn has_claims(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::SESSION_CLAIMS)
    }
}
