use async_trait::async_trait;
use dashmap::DashMap;

use crate::{cache::PersistedCache, Result, RpcHandlerError};

/// Key-value persistence for latency caches.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// Process-local store, mostly useful for tests and for sharing a warm cache
/// between handlers of the same process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

pub async fn load_persisted(store: &dyn CacheStore, key: &str) -> Result<Option<PersistedCache>> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| RpcHandlerError::Storage(format!("corrupt cache entry {key}: {e}"))),
        None => Ok(None),
    }
}

pub async fn save_persisted(store: &dyn CacheStore, key: &str, cache: &PersistedCache) -> Result<()> {
    let raw = serde_json::to_string(cache)?;
    store.set(key, raw).await
}
