//! Process-wide device location.
//!
//! [`LocationCoordinator`] owns the last known position and guarantees at
//! most one device-location query at a time: concurrent refreshes join the
//! fetch already in flight and resolve to the same snapshot.
//!
//! Every snapshot the coordinator settles on, including fallbacks after a
//! failed fetch, is broadcast to subscribers. Subscribers only see snapshots
//! published after they subscribe; seed initial state from
//! [`LocationCoordinator::current`].
//!
//! ```text
//! refresh A ─┐
//! refresh B ─┼──► in-flight fetch ──► provider
//! refresh C ─┘          │
//!                       ▼
//!              broadcast + resolve all
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use nearby_core::{LocationError, LocationSnapshot, NearbyConfig};
use once_cell::sync::OnceCell;
use tokio::sync::broadcast;

/// Buffered snapshots per subscriber before it starts lagging.
const BROADCAST_CAPACITY: usize = 16;

static GLOBAL: OnceCell<LocationCoordinator> = OnceCell::new();

/// Device-location collaborator.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Ask for (or confirm) permission. `Ok(false)` means denied.
    async fn request_permission(&self) -> Result<bool, LocationError>;

    /// One-shot position query. The provider enforces `timeout` itself.
    async fn current_position(&self, timeout: Duration) -> Result<LocationSnapshot, LocationError>;
}

type InFlight = Shared<BoxFuture<'static, LocationSnapshot>>;

#[derive(Default)]
struct CoordinatorState {
    last: Option<LocationSnapshot>,
    in_flight: Option<InFlight>,
    last_error: Option<LocationError>,
}

struct Inner {
    provider: Arc<dyn LocationProvider>,
    default_location: LocationSnapshot,
    timeout: Duration,
    state: Mutex<CoordinatorState>,
    updates: broadcast::Sender<LocationSnapshot>,
}

/// Shared owner of the device location.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct LocationCoordinator {
    inner: Arc<Inner>,
}

impl LocationCoordinator {
    pub fn new(provider: Arc<dyn LocationProvider>, config: &NearbyConfig) -> Self {
        let (updates, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                provider,
                default_location: config.default_location,
                timeout: config.location_timeout,
                state: Mutex::new(CoordinatorState::default()),
                updates,
            }),
        }
    }

    /// Install the process-wide coordinator.
    ///
    /// Only the first call takes effect; later calls return the existing
    /// instance.
    pub fn install_global(
        provider: Arc<dyn LocationProvider>,
        config: &NearbyConfig,
    ) -> &'static LocationCoordinator {
        let mut installed = false;
        let coordinator = GLOBAL.get_or_init(|| {
            installed = true;
            Self::new(provider, config)
        });
        if !installed {
            tracing::warn!("Location coordinator already installed, keeping existing instance");
        }
        coordinator
    }

    /// The process-wide coordinator, if installed.
    pub fn global() -> Option<&'static LocationCoordinator> {
        GLOBAL.get()
    }

    /// Current location.
    ///
    /// Without `force`, a known location is returned without I/O. Otherwise
    /// the device is queried, joining any fetch already in flight. Never
    /// fails: on error the last known location (or the configured default)
    /// is returned and broadcast, and [`last_error`](Self::last_error) is set.
    ///
    /// The device query runs on a spawned Tokio task, so it completes and
    /// publishes even if this future is dropped. Must be called from within
    /// a Tokio runtime.
    pub async fn refresh_location(&self, force: bool) -> LocationSnapshot {
        let fetch = {
            let mut state = self.inner.lock();

            if !force {
                if let Some(last) = state.last {
                    return last;
                }
            }

            match &state.in_flight {
                Some(in_flight) => {
                    tracing::debug!(force, "Joining in-flight location fetch");
                    in_flight.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let fetch = async move { inner.fetch_and_publish().await }
                        .boxed()
                        .shared();
                    state.in_flight = Some(fetch.clone());
                    // Driven on its own task so it settles even if every
                    // caller stops waiting.
                    tokio::spawn(fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Receive every snapshot published from now on.
    ///
    /// Dropping the receiver unsubscribes. Each receiver buffers up to 16
    /// unread snapshots; a receiver that falls further behind gets
    /// `RecvError::Lagged` with the number it missed, and its next `recv`
    /// resumes at the oldest snapshot still buffered.
    pub fn subscribe(&self) -> broadcast::Receiver<LocationSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Last successfully fetched location.
    pub fn current(&self) -> Option<LocationSnapshot> {
        self.inner.lock().last
    }

    /// Error from the most recent fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<LocationError> {
        self.inner.lock().last_error.clone()
    }

    /// Whether a device query is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.lock().in_flight.is_some()
    }

    pub fn default_location(&self) -> LocationSnapshot {
        self.inner.default_location
    }
}

impl Inner {
    // Nothing in the state can be left half-written, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn query_device(&self) -> Result<LocationSnapshot, LocationError> {
        if !self.provider.request_permission().await? {
            return Err(LocationError::PermissionDenied);
        }
        self.provider.current_position(self.timeout).await
    }

    async fn fetch_and_publish(self: Arc<Self>) -> LocationSnapshot {
        let result = self.query_device().await;

        let mut state = self.lock();
        state.in_flight = None;

        let snapshot = match result {
            Ok(snapshot) => {
                tracing::debug!(
                    latitude = snapshot.latitude,
                    longitude = snapshot.longitude,
                    "Location updated"
                );
                state.last = Some(snapshot);
                state.last_error = None;
                snapshot
            }
            Err(e) => {
                let fallback = state.last.unwrap_or(self.default_location);
                tracing::warn!(
                    error = %e,
                    latitude = fallback.latitude,
                    longitude = fallback.longitude,
                    "Location fetch failed, using fallback"
                );
                state.last_error = Some(e);
                fallback
            }
        };

        // Sent under the lock so concurrent fetches publish in order.
        // An error only means nobody is subscribed.
        let _ = self.updates.send(snapshot);
        snapshot
    }
}

impl fmt::Debug for LocationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("LocationCoordinator")
            .field("last", &state.last)
            .field("in_flight", &state.in_flight.is_some())
            .field("last_error", &state.last_error)
            .finish()
    }
}
