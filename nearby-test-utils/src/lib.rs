//! Nearby Test Utilities
//!
//! Shared test infrastructure for the Nearby workspace:
//! - Scriptable mock collaborators with call counters
//! - Proptest generators for the core data types
//! - Fixtures for common scenarios

pub use nearby_core::{
    Business, Clock, ConnectivityError, LocationError, LocationSnapshot, ManualClock, MutationId,
    MutationKind, NearbyConfig, NearbyError, NearbyQuery, NearbyResult, OfflineMutation,
    OriginError, Page, StorageError, Timestamp,
};
pub use nearby_storage::{DurableStore, MemoryStore};

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use nearby_storage::PlaceSearchOrigin;
use nearby_sync::{
    AlertChoice, AlertPresenter, LocationProvider, MutationSink, NetworkState,
    NetworkStatusProvider, OfflineAlert,
};
use tokio::sync::watch;

// Mock state is always written whole; recover from poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// NETWORK STATUS
// ============================================================================

/// Network provider with a switchable connection.
#[derive(Debug)]
pub struct MockNetworkStatus {
    online: AtomicBool,
    probe_error: Mutex<Option<ConnectivityError>>,
    probes: AtomicUsize,
    events: watch::Sender<NetworkState>,
}

impl MockNetworkStatus {
    pub fn new(online: bool) -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(online),
            probe_error: Mutex::new(None),
            probes: AtomicUsize::new(0),
            events: watch::channel(NetworkState::Unknown).0,
        })
    }

    pub fn online() -> Arc<Self> {
        Self::new(true)
    }

    pub fn offline() -> Arc<Self> {
        Self::new(false)
    }

    /// Change what probes report and push a change event.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        self.events
            .send_replace(NetworkState::from_reachable(Some(online)));
    }

    /// Make every probe fail until cleared with `None`.
    pub fn set_probe_error(&self, error: Option<ConnectivityError>) {
        *lock(&self.probe_error) = error;
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkStatusProvider for MockNetworkStatus {
    async fn probe(&self) -> Result<NetworkState, ConnectivityError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.probe_error).clone() {
            return Err(error);
        }
        Ok(NetworkState::from_reachable(Some(
            self.online.load(Ordering::SeqCst),
        )))
    }

    fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.events.subscribe()
    }
}

// ============================================================================
// DEVICE LOCATION
// ============================================================================

/// Device location with scripted answers and an artificial delay.
///
/// Queued results are returned first; afterwards every query answers with
/// the fallback result.
#[derive(Debug)]
pub struct MockLocationProvider {
    queued: Mutex<VecDeque<Result<LocationSnapshot, LocationError>>>,
    fallback: Mutex<Result<LocationSnapshot, LocationError>>,
    permission: AtomicBool,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    permission_requests: AtomicUsize,
}

impl MockLocationProvider {
    pub fn at(snapshot: LocationSnapshot) -> Arc<Self> {
        Self::answering(Ok(snapshot))
    }

    pub fn failing(error: LocationError) -> Arc<Self> {
        Self::answering(Err(error))
    }

    fn answering(fallback: Result<LocationSnapshot, LocationError>) -> Arc<Self> {
        Arc::new(Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            permission: AtomicBool::new(true),
            delay: Mutex::new(Duration::from_millis(10)),
            calls: AtomicUsize::new(0),
            permission_requests: AtomicUsize::new(0),
        })
    }

    /// Answer the next query with `result`.
    pub fn push(&self, result: Result<LocationSnapshot, LocationError>) {
        lock(&self.queued).push_back(result);
    }

    /// Answer every later query with `result`.
    pub fn set_fallback(&self, result: Result<LocationSnapshot, LocationError>) {
        *lock(&self.fallback) = result;
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = delay;
    }

    /// Number of position queries issued.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for MockLocationProvider {
    async fn request_permission(&self) -> Result<bool, LocationError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.permission.load(Ordering::SeqCst))
    }

    async fn current_position(&self, _timeout: Duration) -> Result<LocationSnapshot, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.delay);
        tokio::time::sleep(delay).await;

        let queued = lock(&self.queued).pop_front();
        queued.unwrap_or_else(|| lock(&self.fallback).clone())
    }
}

// ============================================================================
// PLACE SEARCH ORIGIN
// ============================================================================

/// Place-search origin with call counters and switchable failure.
#[derive(Debug, Default)]
pub struct MockPlaceSearchOrigin {
    results: Mutex<Vec<Business>>,
    failure: Mutex<Option<OriginError>>,
    nearby_calls: AtomicUsize,
    name_calls: AtomicUsize,
    last_query: Mutex<Option<NearbyQuery>>,
    last_name: Mutex<Option<(String, Option<LocationSnapshot>)>>,
}

impl MockPlaceSearchOrigin {
    pub fn returning(results: Vec<Business>) -> Arc<Self> {
        let origin = Self::default();
        *lock(&origin.results) = results;
        Arc::new(origin)
    }

    pub fn set_results(&self, results: Vec<Business>) {
        *lock(&self.results) = results;
    }

    /// Fail every call with `error` until [`recover`](Self::recover).
    pub fn fail_with(&self, error: OriginError) {
        *lock(&self.failure) = Some(error);
    }

    /// Fail every call with a generic unreachable error.
    pub fn go_down(&self) {
        self.fail_with(OriginError::Unreachable {
            reason: "connection reset".to_string(),
        });
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    pub fn nearby_calls(&self) -> usize {
        self.nearby_calls.load(Ordering::SeqCst)
    }

    pub fn name_calls(&self) -> usize {
        self.name_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.nearby_calls() + self.name_calls()
    }

    pub fn last_query(&self) -> Option<NearbyQuery> {
        lock(&self.last_query).clone()
    }

    /// Text and location bias of the last name search.
    pub fn last_name_search(&self) -> Option<(String, Option<LocationSnapshot>)> {
        lock(&self.last_name).clone()
    }

    fn respond(&self) -> Result<Vec<Business>, OriginError> {
        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }
        Ok(lock(&self.results).clone())
    }
}

#[async_trait]
impl PlaceSearchOrigin for MockPlaceSearchOrigin {
    async fn search_nearby(&self, query: &NearbyQuery) -> Result<Vec<Business>, OriginError> {
        self.nearby_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_query) = Some(query.clone());
        self.respond()
    }

    async fn search_by_name(
        &self,
        name: &str,
        near: Option<LocationSnapshot>,
        _page: Page,
    ) -> Result<Vec<Business>, OriginError> {
        self.name_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_name) = Some((name.to_string(), near));
        self.respond()
    }
}

// ============================================================================
// ALERTS
// ============================================================================

/// Alert presenter that records every prompt and answers from a script.
///
/// Once the script runs out every prompt is answered with Cancel. An attached
/// network can be brought back online after a given number of prompts,
/// simulating the user fixing their connection before tapping Retry.
#[derive(Debug, Default)]
pub struct RecordingAlertPresenter {
    script: Mutex<VecDeque<AlertChoice>>,
    alerts: Mutex<Vec<OfflineAlert>>,
    reconnect: Mutex<Option<(usize, Arc<MockNetworkStatus>)>>,
}

impl RecordingAlertPresenter {
    pub fn answering(choices: &[AlertChoice]) -> Arc<Self> {
        let presenter = Self::default();
        lock(&presenter.script).extend(choices.iter().copied());
        Arc::new(presenter)
    }

    /// Bring `network` online once `prompts` alerts have been shown.
    pub fn reconnect_after(&self, prompts: usize, network: Arc<MockNetworkStatus>) {
        *lock(&self.reconnect) = Some((prompts, network));
    }

    pub fn alerts(&self) -> Vec<OfflineAlert> {
        lock(&self.alerts).clone()
    }

    pub fn prompt_count(&self) -> usize {
        lock(&self.alerts).len()
    }
}

#[async_trait]
impl AlertPresenter for RecordingAlertPresenter {
    async fn present(&self, alert: &OfflineAlert) -> AlertChoice {
        let shown = {
            let mut alerts = lock(&self.alerts);
            alerts.push(alert.clone());
            alerts.len()
        };

        if let Some((after, network)) = lock(&self.reconnect).as_ref() {
            if shown >= *after {
                network.set_online(true);
            }
        }

        lock(&self.script)
            .pop_front()
            .unwrap_or(AlertChoice::Cancel)
    }
}

// ============================================================================
// MUTATION SINK
// ============================================================================

/// Backend stand-in that records applied mutations and rejects chosen ids.
#[derive(Debug, Default)]
pub struct MockMutationSink {
    applied: Mutex<Vec<MutationId>>,
    rejected: Mutex<HashSet<MutationId>>,
}

impl MockMutationSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reject `id` on every attempt.
    pub fn reject(&self, id: MutationId) {
        lock(&self.rejected).insert(id);
    }

    /// Ids applied so far, in order.
    pub fn applied(&self) -> Vec<MutationId> {
        lock(&self.applied).clone()
    }
}

#[async_trait]
impl MutationSink for MockMutationSink {
    async fn apply(&self, mutation: &OfflineMutation) -> Result<(), NearbyError> {
        if lock(&self.rejected).contains(&mutation.id) {
            return Err(OriginError::RequestFailed {
                status: 422,
                message: format!("{} rejected", mutation.kind.label()),
            }
            .into());
        }
        lock(&self.applied).push(mutation.id);
        Ok(())
    }
}

// ============================================================================
// STORAGE
// ============================================================================

/// Store whose reads work but whose writes fail, optionally reads too.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_reads: bool,
}

impl FailingStore {
    /// Reads succeed, writes and removals fail.
    pub fn read_only() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every operation fails.
    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            fail_reads: true,
            ..Self::default()
        })
    }

    /// Seed a value, bypassing the failure.
    pub async fn seed(&self, key: &str, value: &str) {
        let _ = self.inner.set(key, value).await;
    }
}

#[async_trait]
impl DurableStore for FailingStore {
    async fn get(&self, key: &str) -> NearbyResult<Option<String>> {
        if self.fail_reads {
            return Err(StorageError::ReadFailed {
                key: key.to_string(),
                reason: "storage unavailable".to_string(),
            }
            .into());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, _value: &str) -> NearbyResult<()> {
        Err(StorageError::WriteFailed {
            key: key.to_string(),
            reason: "disk full".to_string(),
        }
        .into())
    }

    async fn remove(&self, key: &str) -> NearbyResult<()> {
        Err(StorageError::RemoveFailed {
            key: key.to_string(),
            reason: "disk full".to_string(),
        }
        .into())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> NearbyResult<Vec<String>> {
        if self.fail_reads {
            return Err(StorageError::ReadFailed {
                key: prefix.to_string(),
                reason: "storage unavailable".to_string(),
            }
            .into());
        }
        self.inner.keys_with_prefix(prefix).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for the Nearby data types.

    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a valid coordinate.
    pub fn arb_location() -> impl Strategy<Value = LocationSnapshot> {
        (-90.0f64..=90.0, -180.0f64..=180.0)
            .prop_map(|(latitude, longitude)| LocationSnapshot::new(latitude, longitude))
    }

    /// Generate a Timestamp (2020-2030).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    pub fn arb_category() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("restaurants".to_string()),
            Just("cafes".to_string()),
            Just("bars".to_string()),
            Just("bakeries".to_string()),
            "[a-z]{3,12}",
        ]
    }

    pub fn arb_page() -> impl Strategy<Value = Page> {
        (0u32..200, 1u32..50).prop_map(|(offset, limit)| Page { offset, limit })
    }

    pub fn arb_business() -> impl Strategy<Value = Business> {
        (
            "[a-z0-9]{8}",
            "[A-Z][a-z]{2,10}( [A-Z][a-z]{2,10})?",
            arb_location(),
            prop::collection::vec(arb_category(), 0..4),
            prop::option::of(1.0f32..=5.0),
            0u32..5000,
        )
            .prop_map(|(id, name, at, categories, rating, reviews)| {
                let business = Business::new(id, name, at).with_categories(categories);
                match rating {
                    Some(rating) => business.with_rating(rating, reviews),
                    None => business,
                }
            })
    }

    pub fn arb_query() -> impl Strategy<Value = NearbyQuery> {
        (
            arb_location(),
            100u32..40_000,
            prop::collection::vec(arb_category(), 0..4),
            arb_page(),
        )
            .prop_map(|(center, radius, categories, page)| {
                NearbyQuery::new(center, radius)
                    .with_categories(categories)
                    .with_page(page)
            })
    }

    pub fn arb_mutation_kind() -> impl Strategy<Value = MutationKind> {
        prop_oneof![
            ("[a-z0-9]{8}", 1u8..=5, ".{0,80}").prop_map(|(business_id, rating, text)| {
                MutationKind::AddReview {
                    business_id,
                    rating,
                    text,
                }
            }),
            ("[a-z0-9]{8}", "[a-z0-9]{8}").prop_map(|(business_id, review_id)| {
                MutationKind::DeleteReview {
                    business_id,
                    review_id,
                }
            }),
            ("[a-z0-9]{8}", prop_oneof![Just(-1i32), Just(1i32)])
                .prop_map(|(review_id, delta)| MutationKind::HelpfulVoteDelta { review_id, delta }),
        ]
    }

    pub fn arb_mutation() -> impl Strategy<Value = OfflineMutation> {
        (any::<[u8; 16]>(), arb_timestamp(), arb_mutation_kind()).prop_map(
            |(bytes, created_at, kind)| {
                OfflineMutation::new(MutationId::from_uuid(Uuid::from_bytes(bytes)), created_at, kind)
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common scenarios.

    use super::*;
    use chrono::Utc;

    pub fn nyc() -> LocationSnapshot {
        LocationSnapshot::new(40.7128, -74.006)
    }

    pub fn business(id: &str) -> Business {
        Business::new(id, format!("Business {id}"), nyc())
            .with_categories(["restaurants"])
            .with_rating(4.5, 120)
    }

    pub fn businesses(count: usize) -> Vec<Business> {
        (0..count).map(|i| business(&format!("b-{i}"))).collect()
    }

    pub fn cafe_query() -> NearbyQuery {
        NearbyQuery::new(nyc(), 1500).with_categories(["cafes", "bakeries"])
    }

    pub fn vote(review_id: &str, delta: i32) -> OfflineMutation {
        OfflineMutation::with_fresh_id(
            Utc::now(),
            MutationKind::HelpfulVoteDelta {
                review_id: review_id.to_string(),
                delta,
            },
        )
    }

    pub fn review(business_id: &str, rating: u8) -> OfflineMutation {
        OfflineMutation::with_fresh_id(
            Utc::now(),
            MutationKind::AddReview {
                business_id: business_id.to_string(),
                rating,
                text: "Great spot".to_string(),
            },
        )
    }

    /// Default configuration with a short location timeout.
    pub fn test_config() -> NearbyConfig {
        NearbyConfig::default().with_location_timeout(Duration::from_secs(1))
    }
}
