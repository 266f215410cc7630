//! LMDB-backed durable store.
//!
//! Uses the heed crate (Rust bindings for LMDB) for a memory-mapped,
//! crash-safe key-value file that survives app restarts.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get` and `keys_with_prefix`
//! - Write transactions for `set` and `remove`

use std::path::Path;

use async_trait::async_trait;
use heed::types::Str;
use heed::{Database, Env, EnvOpenOptions};
use nearby_core::{NearbyError, NearbyResult, StorageError};

use crate::kv::DurableStore;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for NearbyError {
    fn from(e: LmdbStoreError) -> Self {
        NearbyError::Storage(StorageError::BackendUnavailable {
            reason: e.to_string(),
        })
    }
}

/// LMDB-backed [`DurableStore`].
///
/// # Example
///
/// ```ignore
/// use nearby_storage::{DurableStore, LmdbStore};
///
/// let store = LmdbStore::open("/data/nearby", 64)?;
/// store.set("offlineMutations_v1", "{\"mutations\":[]}").await?;
/// ```
pub struct LmdbStore {
    env: Env,
    db: Database<Str, Str>,
}

impl LmdbStore {
    /// Open (or create) a store in `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per directory by this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Str, Str> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self { env, db })
    }

    fn read_failed(key: &str, e: heed::Error) -> NearbyError {
        StorageError::ReadFailed {
            key: key.to_string(),
            reason: e.to_string(),
        }
        .into()
    }

    fn write_failed(key: &str, e: heed::Error) -> NearbyError {
        StorageError::WriteFailed {
            key: key.to_string(),
            reason: e.to_string(),
        }
        .into()
    }
}

#[async_trait]
impl DurableStore for LmdbStore {
    async fn get(&self, key: &str) -> NearbyResult<Option<String>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| Self::read_failed(key, e))?;
        let value = self
            .db
            .get(&rtxn, key)
            .map_err(|e| Self::read_failed(key, e))?;
        Ok(value.map(str::to_string))
    }

    async fn set(&self, key: &str, value: &str) -> NearbyResult<()> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| Self::write_failed(key, e))?;
        self.db
            .put(&mut wtxn, key, value)
            .map_err(|e| Self::write_failed(key, e))?;
        wtxn.commit().map_err(|e| Self::write_failed(key, e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> NearbyResult<()> {
        let remove_failed = |e: heed::Error| -> NearbyError {
            StorageError::RemoveFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }
            .into()
        };
        let mut wtxn = self.env.write_txn().map_err(remove_failed)?;
        self.db.delete(&mut wtxn, key).map_err(remove_failed)?;
        wtxn.commit().map_err(remove_failed)?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> NearbyResult<Vec<String>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| Self::read_failed(prefix, e))?;
        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| Self::read_failed(prefix, e))?;

        let mut keys = Vec::new();
        for result in iter {
            match result {
                Ok((key, _)) if key.starts_with(prefix) => keys.push(key.to_string()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable LMDB entry");
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LmdbStore::open(temp_dir.path(), 10).expect("Failed to open store");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _temp_dir) = create_test_store();
        store
            .set("offlineMutations_v1", "[]")
            .await
            .expect("set should succeed");

        let value = store
            .get("offlineMutations_v1")
            .await
            .expect("get should succeed");
        assert_eq!(value.as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (store, _temp_dir) = create_test_store();
        let value = store.get("missing").await.expect("get should succeed");
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_and_remove() {
        let (store, _temp_dir) = create_test_store();
        store.set("k", "old").await.expect("set should succeed");
        store.set("k", "new").await.expect("set should succeed");
        assert_eq!(
            store.get("k").await.expect("get should succeed").as_deref(),
            Some("new")
        );

        store.remove("k").await.expect("remove should succeed");
        assert!(store.get("k").await.expect("get should succeed").is_none());
        store.remove("k").await.expect("removing twice should succeed");
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let (store, _temp_dir) = create_test_store();
        for key in [
            "nearbyBusinesses_v1:1.0000:2.0000:500:",
            "nearbyBusinesses_v1:3.0000:4.0000:500:cafe",
            "offlineMutations_v1",
        ] {
            store.set(key, "{}").await.expect("set should succeed");
        }

        let keys = store
            .keys_with_prefix("nearbyBusinesses_v1:")
            .await
            .expect("keys should succeed");
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.starts_with("nearbyBusinesses_v1:")));
    }
}
