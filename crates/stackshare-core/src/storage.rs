//! Durable key-value seam.
//!
//! The store never touches a global storage API directly; it is handed a
//! [`KeyValueStore`]. The file-backed implementation lives in the
//! infrastructure crate. [`MemoryKeyValueStore`] is the in-process fake.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Result, StackError};

/// Byte-oriented key-value storage.
///
/// Writes are synchronous: `set` returns only after the value is durable for
/// this backend. Concurrent writers from other processes race; the later
/// write wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory [`KeyValueStore`].
///
/// Clones share the same map, so a test can keep a handle while the store
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StackError::internal(format!("memory store poisoned: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StackError::internal(format!("memory store poisoned: {}", e)))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StackError::internal(format!("memory store poisoned: {}", e)))?;
        entries.remove(key);
        Ok(())
    }
}
