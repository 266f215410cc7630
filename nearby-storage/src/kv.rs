//! Durable key-value storage.
//!
//! The persisted cache tier and the offline mutation queue both sit on a
//! string-keyed, string-valued store. [`DurableStore`] is that seam;
//! [`MemoryStore`] backs tests and ephemeral sessions, and
//! [`LmdbStore`](crate::lmdb_store::LmdbStore) persists across launches.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nearby_core::NearbyResult;
use tokio::sync::RwLock;

/// String key-value persistence.
///
/// Implementations must be safe to share across tasks. Values are opaque
/// strings; callers own the encoding.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> NearbyResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> NearbyResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> NearbyResult<()>;

    /// List every key starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> NearbyResult<Vec<String>>;
}

#[async_trait]
impl<S: DurableStore + ?Sized> DurableStore for Arc<S> {
    async fn get(&self, key: &str) -> NearbyResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> NearbyResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> NearbyResult<()> {
        (**self).remove(key).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> NearbyResult<Vec<String>> {
        (**self).keys_with_prefix(prefix).await
    }
}

/// In-memory store.
///
/// Uses tokio::sync::RwLock for safe async access.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> NearbyResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> NearbyResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> NearbyResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> NearbyResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
