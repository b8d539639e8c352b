//! Durable local state store.
//!
//! The queue persists its entries as one JSON document under a well-known
//! key. The store is injected so the queue can be exercised without a real
//! filesystem; production uses [`FileStore`], tests use [`MemoryStore`].

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::StoreError;

/// Key under which the offline queue persists itself.
pub const QUEUE_STATE_KEY: &str = "offline_queue";

/// A durable key-value store for JSON documents.
pub trait StateStore: Send + Sync {
    /// Read the document for `key`, or `None` if it was never written.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write the document for `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// ============================================================================
// File-backed store
// ============================================================================

/// Production store: one `<key>.json` file per key under the state dir.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: PathBuf) -> Result<Self, StoreError> {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .map_err(|e| StoreError::StateDirUnavailable(format!("{}: {}", dir.display(), e)))?;
        }
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StateStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| StoreError::Read { path, source })
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        fs::write(&path, value).map_err(|source| StoreError::Write { path, source })
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Ephemeral store for tests and sessions that opt out of durability.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
