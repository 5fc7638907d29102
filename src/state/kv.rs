use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Minimal key-value contract the service relies on.
///
/// Each key is read and written independently. There are no transactions
/// and no atomic increment, so callers that read-modify-write can race.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// A single KV entry with a value and creation timestamp.
///
/// `created_at` is the Unix timestamp (seconds since epoch) at which
/// the key was last set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub value: String,
    pub created_at: i64,
}

/// Internal HashMap type.
pub type InnerMap = HashMap<String, Entry>;

/// In-process store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    map: Arc<RwLock<InnerMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, used when writing snapshots.
    pub fn entries(&self) -> Result<InnerMap, StoreError> {
        let map = self.map.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.clone())
    }

    /// Replace the whole content, used when loading snapshots.
    pub fn replace(&self, entries: InnerMap) -> Result<(), StoreError> {
        let mut map = self.map.write().map_err(|_| StoreError::Poisoned)?;
        *map = entries;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.map.read().map_err(|_| StoreError::Poisoned)?.len())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.map.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut map = self.map.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(
            key.to_string(),
            Entry {
                value,
                created_at: Utc::now().timestamp(),
            },
        );
        Ok(())
    }
}
