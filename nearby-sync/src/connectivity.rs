//! Network connectivity tracking.
//!
//! [`ConnectivityMonitor`] wraps a platform [`NetworkStatusProvider`] and
//! collapses its tri-state reachability into a single boolean. Before the
//! first probe completes the device is assumed to be connected.

use std::sync::Arc;

use async_trait::async_trait;
use nearby_core::ConnectivityError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Reachability as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkState {
    Connected,
    Disconnected,
    /// The platform has not determined reachability yet.
    #[default]
    Unknown,
}

impl NetworkState {
    /// Collapse to a boolean. Only an explicit disconnect counts as offline.
    pub fn is_connected(self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// Build from a platform flag where `None` means undetermined.
    pub fn from_reachable(reachable: Option<bool>) -> Self {
        match reachable {
            Some(true) => Self::Connected,
            Some(false) => Self::Disconnected,
            None => Self::Unknown,
        }
    }
}

/// Platform network-status collaborator.
#[async_trait]
pub trait NetworkStatusProvider: Send + Sync {
    /// Actively probe the network.
    async fn probe(&self) -> Result<NetworkState, ConnectivityError>;

    /// Stream of state changes pushed by the platform.
    fn subscribe(&self) -> watch::Receiver<NetworkState>;
}

/// Shared connectivity state.
///
/// Cloning is cheap; clones observe the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    provider: Arc<dyn NetworkStatusProvider>,
    state: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(provider: Arc<dyn NetworkStatusProvider>) -> Self {
        let (state, _) = watch::channel(true);
        Self {
            provider,
            state: Arc::new(state),
        }
    }

    /// Last known connectivity without probing.
    pub fn is_connected(&self) -> bool {
        *self.state.borrow()
    }

    /// Probe the network and update the shared state.
    ///
    /// A failed probe counts as disconnected; the error is logged, not
    /// returned.
    pub async fn check_connectivity(&self) -> bool {
        let connected = match self.provider.probe().await {
            Ok(state) => state.is_connected(),
            Err(e) => {
                tracing::warn!(error = %e, "Connectivity probe failed, assuming offline");
                false
            }
        };

        let previous = self.state.send_replace(connected);
        if previous != connected {
            tracing::info!(connected, "Connectivity changed");
        }
        connected
    }

    /// Watch the boolean connectivity state.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Follow platform change events until the provider's stream closes.
    ///
    /// `on_offline` runs on every connected to disconnected transition. What
    /// it does (alerting, pausing work) is up to the caller.
    pub fn spawn_listener<F>(&self, on_offline: F) -> JoinHandle<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut events = self.provider.subscribe();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            while events.changed().await.is_ok() {
                let connected = events.borrow_and_update().is_connected();
                let was_connected = *state.borrow();

                if was_connected && !connected {
                    tracing::info!("Device went offline");
                    on_offline();
                } else if !was_connected && connected {
                    tracing::info!("Device back online");
                }
                state.send_replace(connected);
            }
            tracing::debug!("Network status stream closed");
        })
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("connected", &self.is_connected())
            .finish()
    }
}
