//! Nearby Sync - Connectivity, Location and Cached Search
//!
//! The layer screens talk to when they need business data:
//!
//! - [`ConnectivityMonitor`] and [`ConnectivityGate`] decide whether network
//!   work runs at all.
//! - [`LocationCoordinator`] keeps one device-location query in flight for
//!   the whole process.
//! - [`PlaceSearchService`] reads through the geo result cache and degrades
//!   to stale data when offline or when the origin fails.
//! - [`OfflineReplayer`] drains the offline mutation queue once the network
//!   is back.

pub mod connectivity;
pub mod gate;
pub mod location;
pub mod replay;
pub mod search;
pub mod telemetry;

pub use connectivity::{ConnectivityMonitor, NetworkState, NetworkStatusProvider};
pub use gate::{
    AlertChoice, AlertPresenter, ConnectivityGate, OfflineAlert, Protected, ProtectedOptions,
};
pub use location::{LocationCoordinator, LocationProvider};
pub use replay::{MutationSink, OfflineReplayer, ReplayReport};
pub use search::PlaceSearchService;
pub use telemetry::{init_tracing, TelemetryError};
