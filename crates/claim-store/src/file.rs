//! File-backed storage backend.

use crate::{ClaimStorage, StorageError, StorageResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Claim storage persisted as a single JSON file.
///
/// Writes go to a sibling temp file and are moved into place, so a crash
/// mid-write leaves the previous contents intact. A mutex serializes
/// writers within the process; cross-process locking is not provided.
pub struct FileClaimStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileClaimStorage {
    /// Create a store backed by the given file path.
    ///
    /// The file does not need to exist yet; parent directories are created
    /// on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| StorageError::Encoding(e.to_string()))
    }

    fn persist(&self, entries: &HashMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), entries = entries.len(), "Claim file persisted");
        Ok(())
    }
}

impl ClaimStorage for FileClaimStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock().expect("lock poisoned");
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.load()?;
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().expect("lock poisoned");
        let mut entries = self.load()?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.persist(&entries)?;
        }
        Ok(existed)
    }
}
