// Cache storage backend trait and in-memory implementation
// Author: kelexine (https://github.com/kelexine)

use super::models::{CacheStats, PartitionStats};
use crate::error::Result;
use crate::models::ResponseSnapshot;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Named partitions of `key → snapshot` entries.
///
/// Each operation is atomic on its own: a put replaces the whole entry, a
/// delete drops the whole partition. Nothing here needs outer locking.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if it does not exist.
    async fn open(&self, name: &str) -> Result<()>;

    /// Store `response` under `key`, creating the partition if needed.
    async fn put(&self, name: &str, key: &str, response: ResponseSnapshot) -> Result<()>;

    async fn get(&self, name: &str, key: &str) -> Result<Option<ResponseSnapshot>>;

    /// Names of every partition, from every generation.
    async fn names(&self) -> Result<Vec<String>>;

    /// Drop a partition. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Keys stored in a partition; empty if it does not exist.
    async fn keys(&self, name: &str) -> Result<Vec<String>>;

    async fn stats(&self) -> Result<CacheStats> {
        let mut partitions = Vec::new();
        for name in self.names().await? {
            let entries = self.keys(&name).await?.len();
            partitions.push(PartitionStats { name, entries });
        }
        Ok(CacheStats { partitions })
    }
}

/// Process-local storage. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    partitions: RwLock<BTreeMap<String, HashMap<String, ResponseSnapshot>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<()> {
        self.partitions.write().entry(name.to_string()).or_default();
        Ok(())
    }

    async fn put(&self, name: &str, key: &str, response: ResponseSnapshot) -> Result<()> {
        self.partitions
            .write()
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), response);
        Ok(())
    }

    async fn get(&self, name: &str, key: &str) -> Result<Option<ResponseSnapshot>> {
        Ok(self
            .partitions
            .read()
            .get(name)
            .and_then(|p| p.get(key))
            .cloned())
    }

    async fn names(&self) -> Result<Vec<String>> {
        Ok(self.partitions.read().keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.partitions.write().remove(name).is_some())
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .partitions
            .read()
            .get(name)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}
