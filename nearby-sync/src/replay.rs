//! Replay of mutations queued while offline.
//!
//! A replay pass confirms connectivity, applies every queued mutation in the
//! order it was queued, and rewrites the queue with the mutations that did
//! not apply followed by any queued while the pass was running.

use std::sync::Arc;

use async_trait::async_trait;
use nearby_core::{MutationId, NearbyError, NearbyResult, OfflineMutation};
use nearby_storage::{DurableStore, OfflineMutationQueue};

use crate::connectivity::ConnectivityMonitor;

/// Applies one mutation to the backend.
#[async_trait]
pub trait MutationSink: Send + Sync {
    async fn apply(&self, mutation: &OfflineMutation) -> Result<(), NearbyError>;
}

/// Outcome of one replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Mutations the backend accepted and that were removed from the queue.
    pub applied: usize,
    /// Mutations that failed and were kept for the next pass.
    pub failed: usize,
    /// True if the pass did nothing because the device was offline.
    pub skipped_offline: bool,
}

impl ReplayReport {
    fn offline() -> Self {
        Self {
            skipped_offline: true,
            ..Self::default()
        }
    }

    /// Whether anything is still waiting in the queue.
    pub fn has_pending(&self) -> bool {
        self.failed > 0
    }
}

/// Drains an [`OfflineMutationQueue`] into a [`MutationSink`].
pub struct OfflineReplayer<S: DurableStore> {
    queue: Arc<OfflineMutationQueue<S>>,
    sink: Arc<dyn MutationSink>,
    monitor: ConnectivityMonitor,
}

impl<S: DurableStore> OfflineReplayer<S> {
    pub fn new(
        queue: Arc<OfflineMutationQueue<S>>,
        sink: Arc<dyn MutationSink>,
        monitor: ConnectivityMonitor,
    ) -> Self {
        Self {
            queue,
            sink,
            monitor,
        }
    }

    /// Run one replay pass.
    ///
    /// Mutations enqueued while the pass runs are not applied in this pass;
    /// they stay queued behind the failed ones for the next.
    pub async fn replay(&self) -> NearbyResult<ReplayReport> {
        if !self.monitor.check_connectivity().await {
            tracing::debug!("Offline, skipping mutation replay");
            return Ok(ReplayReport::offline());
        }

        let pending = self.queue.get_all().await?;
        if pending.is_empty() {
            return Ok(ReplayReport::default());
        }

        let attempted: Vec<MutationId> = pending.iter().map(|m| m.id).collect();
        let mut report = ReplayReport::default();
        let mut survivors = Vec::new();

        for mutation in pending {
            match self.sink.apply(&mutation).await {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    tracing::warn!(
                        id = %mutation.id,
                        kind = mutation.kind.label(),
                        error = %e,
                        "Offline mutation failed to replay, keeping it queued"
                    );
                    report.failed += 1;
                    survivors.push(mutation);
                }
            }
        }

        let late = self.queue.settle_replay(&attempted, survivors).await?;

        tracing::info!(
            applied = report.applied,
            failed = report.failed,
            late,
            "Offline mutation replay finished"
        );
        Ok(report)
    }
}
