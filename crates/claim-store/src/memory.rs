//! In-memory storage backend.

use crate::{ClaimStorage, StorageResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local claim storage backed by a mutex-guarded map.
///
/// The default backend for hosts that keep session state for the lifetime
/// of the process (tests, embedded UIs, short-lived tools).
#[derive(Default)]
pub struct MemoryClaimStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryClaimStorage {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClaimStorage for MemoryClaimStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().expect("lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        Ok(entries.remove(key).is_some())
    }
}
