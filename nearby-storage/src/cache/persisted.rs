//! Persisted cache tier.
//!
//! Entries are stored in a [`DurableStore`] as JSON
//! `{ "businesses": [...], "updatedAt": <epoch-ms> }` under a [`CacheKey`].

use std::sync::Arc;

use chrono::DateTime;
use nearby_core::{Business, NearbyResult, StorageError, Timestamp};
use serde::{Deserialize, Serialize};

use super::freshness::CacheEntry;
use super::key::CacheKey;
use crate::kv::DurableStore;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredResults {
    businesses: Vec<Business>,
    updated_at: i64,
}

/// Cross-session tier keyed by rounded [`CacheKey`]s.
pub struct PersistedTier<S: DurableStore> {
    store: Arc<S>,
    prefix: String,
}

impl<S: DurableStore> PersistedTier<S> {
    pub fn new(store: Arc<S>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Prefix shared by every key in this tier.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the entry under `key`.
    ///
    /// Returns `StorageError::Corrupted` if the stored value does not parse.
    pub async fn get(&self, key: &CacheKey) -> NearbyResult<Option<CacheEntry<Vec<Business>>>> {
        let Some(raw) = self.store.get(key.as_str()).await? else {
            return Ok(None);
        };

        let stored: StoredResults =
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupted {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        let updated_at =
            DateTime::from_timestamp_millis(stored.updated_at).ok_or_else(|| {
                StorageError::Corrupted {
                    key: key.to_string(),
                    reason: format!("invalid updatedAt {}", stored.updated_at),
                }
            })?;

        Ok(Some(CacheEntry::new(
            key.as_str(),
            stored.businesses,
            updated_at,
        )))
    }

    /// Replace the entry under `key`.
    pub async fn put(
        &self,
        key: &CacheKey,
        businesses: &[Business],
        updated_at: Timestamp,
    ) -> NearbyResult<()> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct StoredRef<'a> {
            businesses: &'a [Business],
            updated_at: i64,
        }

        let raw = serde_json::to_string(&StoredRef {
            businesses,
            updated_at: updated_at.timestamp_millis(),
        })
        .map_err(|e| StorageError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        self.store.set(key.as_str(), &raw).await
    }

    pub async fn remove(&self, key: &CacheKey) -> NearbyResult<()> {
        self.store.remove(key.as_str()).await
    }

    /// Remove every entry in this tier. Returns how many keys were removed.
    pub async fn clear(&self) -> NearbyResult<u64> {
        let keys = self
            .store
            .keys_with_prefix(&format!("{}:", self.prefix))
            .await?;
        let mut removed = 0;
        for key in keys {
            self.store.remove(&key).await?;
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use chrono::Utc;
    use nearby_core::{LocationSnapshot, NearbyQuery};

    const PREFIX: &str = "nearbyBusinesses_v1";

    fn tier() -> (PersistedTier<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (PersistedTier::new(Arc::clone(&store), PREFIX), store)
    }

    fn key() -> CacheKey {
        let query = NearbyQuery::new(LocationSnapshot::new(40.7128, -74.006), 1000);
        CacheKey::for_query(PREFIX, &query, 4)
    }

    fn business() -> Business {
        Business::new("b-1", "Joe's Pizza", LocationSnapshot::new(40.713, -74.005))
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (tier, _store) = tier();
        let now = DateTime::from_timestamp_millis(Utc::now().timestamp_millis())
            .expect("millis should convert");
        tier.put(&key(), &[business()], now)
            .await
            .expect("put should succeed");

        let entry = tier
            .get(&key())
            .await
            .expect("get should succeed")
            .expect("entry should exist");
        assert_eq!(entry.payload, vec![business()]);
        assert_eq!(entry.updated_at, now);
    }

    #[tokio::test]
    async fn test_stored_json_shape() {
        let (tier, store) = tier();
        tier.put(&key(), &[business()], Utc::now())
            .await
            .expect("put should succeed");

        let raw = store
            .get(key().as_str())
            .await
            .expect("get should succeed")
            .expect("value should exist");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert!(value["businesses"].is_array());
        assert!(value["updatedAt"].is_i64());
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_an_error() {
        let (tier, store) = tier();
        store
            .set(key().as_str(), "{not json")
            .await
            .expect("set should succeed");

        let err = tier.get(&key()).await.expect_err("corrupt data must fail");
        assert!(matches!(
            err,
            nearby_core::NearbyError::Storage(StorageError::Corrupted { .. })
        ));
    }

    #[tokio::test]
    async fn test_clear_only_touches_prefix() {
        let (tier, store) = tier();
        tier.put(&key(), &[business()], Utc::now())
            .await
            .expect("put should succeed");
        store
            .set("offlineMutations_v1", "[]")
            .await
            .expect("set should succeed");

        assert_eq!(tier.clear().await.expect("clear should succeed"), 1);
        assert_eq!(store.len().await, 1);
    }
}
