//! Bounded offline mutation queue.
//!
//! Writes made while offline are appended here and replayed later. The whole
//! queue lives under one key as JSON `{ "mutations": [...] }`; a bare array is
//! accepted on read. The queue never holds more than its capacity: appending
//! past it drops the oldest entries first.
//!
//! Unparsable queue data reads as an empty queue. Individual entries that do
//! not parse are skipped. Only backend failures are returned as errors.

use std::collections::HashSet;
use std::sync::Arc;

use nearby_core::{MutationId, NearbyConfig, NearbyResult, OfflineMutation, StorageError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::kv::DurableStore;

#[derive(Serialize)]
struct StoredQueueRef<'a> {
    mutations: &'a [OfflineMutation],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredQueue {
    Wrapped { mutations: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

/// FIFO queue of mutations awaiting replay.
pub struct OfflineMutationQueue<S: DurableStore> {
    store: Arc<S>,
    key: String,
    capacity: usize,
    // Serialises read-modify-write cycles.
    lock: Mutex<()>,
}

impl<S: DurableStore> OfflineMutationQueue<S> {
    /// Create a queue using the key and capacity from `config`.
    pub fn new(store: Arc<S>, config: &NearbyConfig) -> Self {
        Self::with_key(store, config.queue_key.clone(), config.queue_capacity)
    }

    /// Create a queue under an explicit key and capacity.
    pub fn with_key(store: Arc<S>, key: impl Into<String>, capacity: usize) -> Self {
        Self {
            store,
            key: key.into(),
            capacity: capacity.max(1),
            lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `mutation`, dropping the oldest entries beyond capacity.
    ///
    /// No deduplication is performed.
    pub async fn enqueue(&self, mutation: OfflineMutation) -> NearbyResult<()> {
        let _guard = self.lock.lock().await;

        let mut mutations = self.load().await?;
        tracing::debug!(
            id = %mutation.id,
            kind = mutation.kind.label(),
            queued = mutations.len(),
            "Queueing offline mutation"
        );
        mutations.push(mutation);

        let dropped = self.trim(&mut mutations);
        if dropped > 0 {
            tracing::warn!(
                dropped,
                capacity = self.capacity,
                "Offline queue full, dropped oldest mutations"
            );
        }

        self.save(&mutations).await
    }

    /// Every queued mutation, oldest first.
    pub async fn get_all(&self) -> NearbyResult<Vec<OfflineMutation>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Overwrite the queue with `mutations`.
    ///
    /// Used after a replay pass with the mutations that did not apply. Input
    /// beyond capacity keeps only its newest entries.
    pub async fn replace_all(&self, mut mutations: Vec<OfflineMutation>) -> NearbyResult<()> {
        let _guard = self.lock.lock().await;
        self.trim(&mut mutations);
        self.save(&mutations).await
    }

    /// Finish a replay pass over the snapshot `attempted`.
    ///
    /// The queue becomes `survivors` followed by every mutation enqueued
    /// since the snapshot was taken (any id not in `attempted`), in queue
    /// order. Runs under the queue lock, so concurrent enqueues are either
    /// kept here or land after it. Returns how many late mutations were kept.
    pub async fn settle_replay(
        &self,
        attempted: &[MutationId],
        mut survivors: Vec<OfflineMutation>,
    ) -> NearbyResult<usize> {
        let _guard = self.lock.lock().await;

        let attempted: HashSet<MutationId> = attempted.iter().copied().collect();
        let late: Vec<OfflineMutation> = self
            .load()
            .await?
            .into_iter()
            .filter(|mutation| !attempted.contains(&mutation.id))
            .collect();
        let kept = late.len();

        survivors.extend(late);
        self.trim(&mut survivors);
        self.save(&survivors).await?;
        Ok(kept)
    }

    /// Remove every queued mutation.
    pub async fn clear(&self) -> NearbyResult<()> {
        let _guard = self.lock.lock().await;
        self.store.remove(&self.key).await
    }

    pub async fn len(&self) -> NearbyResult<usize> {
        Ok(self.get_all().await?.len())
    }

    pub async fn is_empty(&self) -> NearbyResult<bool> {
        Ok(self.len().await? == 0)
    }

    fn trim(&self, mutations: &mut Vec<OfflineMutation>) -> usize {
        let excess = mutations.len().saturating_sub(self.capacity);
        mutations.drain(..excess);
        excess
    }

    async fn load(&self) -> NearbyResult<Vec<OfflineMutation>> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };

        let values = match serde_json::from_str::<StoredQueue>(&raw) {
            Ok(StoredQueue::Wrapped { mutations }) | Ok(StoredQueue::Bare(mutations)) => mutations,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Offline queue unreadable, treating as empty");
                return Ok(Vec::new());
            }
        };

        let total = values.len();
        let mutations: Vec<OfflineMutation> = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(mutation) => Some(mutation),
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "Skipping malformed offline mutation");
                    None
                }
            })
            .collect();

        if mutations.len() < total {
            tracing::warn!(
                key = %self.key,
                skipped = total - mutations.len(),
                "Offline queue contained malformed entries"
            );
        }

        Ok(mutations)
    }

    async fn save(&self, mutations: &[OfflineMutation]) -> NearbyResult<()> {
        let raw = serde_json::to_string(&StoredQueueRef { mutations }).map_err(|e| {
            StorageError::Serialization {
                key: self.key.clone(),
                reason: e.to_string(),
            }
        })?;
        self.store.set(&self.key, &raw).await
    }
}
