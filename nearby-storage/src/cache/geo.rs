//! Two-tier cache for geo-bounded search results.
//!
//! Reads are routed through three layers:
//!
//! 1. The volatile tier, keyed by exact [`RequestSignature`]. A hit is
//!    returned unless the caller forces a refresh.
//! 2. The persisted tier, keyed by rounded [`CacheKey`]. An entry younger than
//!    the configured max age is returned without contacting the origin. An
//!    older entry is held aside and removed once a fresh fetch succeeds.
//! 3. The origin. A success updates the volatile tier first, then awaits a
//!    best-effort persisted write. A failure falls back to the last result for
//!    the same request (volatile first, then the expired persisted entry) and
//!    is labelled [`Freshness::Stale`] instead of surfacing as an error.
//!
//! Concurrent reads for the same key are not coalesced; two callers missing
//! at the same time both reach the origin.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nearby_core::{
    Business, Clock, LocationSnapshot, NearbyConfig, NearbyQuery, NearbyResult, OriginError,
    Page, SystemClock, Timestamp,
};

use super::freshness::{CacheEntry, CacheRead, FetchMode, Freshness};
use super::key::{CacheKey, RequestSignature};
use super::persisted::PersistedTier;
use super::stats::CacheStats;
use super::volatile::VolatileTier;
use crate::kv::DurableStore;

/// The remote place-search service.
///
/// Each call may fail with a transient network error. Implementations are
/// expected to enforce their own request timeout.
#[async_trait]
pub trait PlaceSearchOrigin: Send + Sync {
    /// Businesses inside the query circle.
    async fn search_nearby(&self, query: &NearbyQuery) -> Result<Vec<Business>, OriginError>;

    /// Businesses matching `name`, optionally biased towards `near`.
    async fn search_by_name(
        &self,
        name: &str,
        near: Option<LocationSnapshot>,
        page: Page,
    ) -> Result<Vec<Business>, OriginError>;
}

/// Configuration for the geo result cache.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCacheConfig {
    /// Persisted entries at least this old are refetched.
    pub max_age: Duration,
    /// Decimal places kept in persisted keys.
    pub coordinate_precision: u32,
    /// Prefix of persisted keys.
    pub key_prefix: String,
}

impl Default for GeoCacheConfig {
    fn default() -> Self {
        Self::from(&NearbyConfig::default())
    }
}

impl From<&NearbyConfig> for GeoCacheConfig {
    fn from(config: &NearbyConfig) -> Self {
        Self {
            max_age: config.cache_max_age,
            coordinate_precision: config.coordinate_precision,
            key_prefix: config.cache_key_prefix.clone(),
        }
    }
}

impl GeoCacheConfig {
    /// Set the persisted max age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

/// Volatile + persisted cache in front of a [`PlaceSearchOrigin`].
///
/// # Example
///
/// ```ignore
/// let cache = GeoResultCache::new(store, GeoCacheConfig::default());
///
/// let read = cache.fetch_nearby(&query, FetchMode::CacheFirst, &origin).await?;
/// if read.is_stale() {
///     tracing::info!("Showing last known results");
/// }
/// ```
pub struct GeoResultCache<S: DurableStore> {
    volatile: VolatileTier<Vec<Business>>,
    persisted: PersistedTier<S>,
    config: GeoCacheConfig,
    clock: Arc<dyn Clock>,
    stats: Mutex<CacheStats>,
}

impl<S: DurableStore> GeoResultCache<S> {
    /// Create a cache on the wall clock.
    pub fn new(store: Arc<S>, config: GeoCacheConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a cache on the given clock.
    pub fn with_clock(store: Arc<S>, config: GeoCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            volatile: VolatileTier::new(),
            persisted: PersistedTier::new(store, config.key_prefix.clone()),
            config,
            clock,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn config(&self) -> &GeoCacheConfig {
        &self.config
    }

    /// Persisted key for `query`.
    pub fn key_for(&self, query: &NearbyQuery) -> CacheKey {
        CacheKey::for_query(
            &self.config.key_prefix,
            query,
            self.config.coordinate_precision,
        )
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        update(&mut self.stats.lock().unwrap_or_else(|e| e.into_inner()));
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Businesses inside the query circle, cache first.
    ///
    /// Returns an error only when the origin fails and no earlier result for
    /// the same request exists in either tier.
    ///
    /// After a successful origin fetch the persisted write (and removal of an
    /// expired entry) is awaited before returning, so a slow store delays the
    /// result. Its failures are logged and never returned; once this returns
    /// `Ok` from the origin, a persisted read of the same key sees the new
    /// entry unless that write failed.
    pub async fn fetch_nearby<O>(
        &self,
        query: &NearbyQuery,
        mode: FetchMode,
        origin: &O,
    ) -> NearbyResult<CacheRead<Vec<Business>>>
    where
        O: PlaceSearchOrigin + ?Sized,
    {
        let signature = RequestSignature::for_query(query);

        if !mode.is_forced() {
            if let Some(entry) = self.volatile.get(&signature) {
                self.record(|s| s.memory_hits += 1);
                tracing::debug!(signature = %signature, "Volatile cache hit");
                return Ok(CacheRead::from_cache(
                    entry.payload,
                    entry.updated_at,
                    Freshness::Memory,
                ));
            }
        }

        let key = self.key_for(query);
        let mut expired = None;

        if !mode.is_forced() {
            if let Some(entry) = self.read_persisted(&key).await {
                if entry.is_younger_than(self.config.max_age, self.now()) {
                    self.record(|s| s.persisted_hits += 1);
                    tracing::debug!(key = %key, "Persisted cache hit");
                    return Ok(CacheRead::from_cache(
                        entry.payload,
                        entry.updated_at,
                        Freshness::Persisted,
                    ));
                }
                tracing::debug!(
                    key = %key,
                    age_secs = entry.age(self.now()).as_secs(),
                    "Persisted cache entry expired"
                );
                expired = Some(entry);
            }
        }

        match origin.search_nearby(query).await {
            Ok(businesses) => {
                let fetched_at = self.now();
                self.volatile
                    .insert(signature, businesses.clone(), fetched_at);
                self.record(|s| s.origin_fetches += 1);

                if expired.is_some() {
                    self.evict_expired(&key).await;
                }
                self.write_persisted(&key, &businesses, fetched_at).await;

                Ok(CacheRead::from_origin(businesses, fetched_at))
            }
            Err(e) => {
                self.record(|s| s.origin_failures += 1);

                let fallback = match self.volatile.get(&signature) {
                    Some(entry) => Some(entry),
                    None if mode.is_forced() => self.read_persisted(&key).await,
                    None => expired,
                };

                match fallback {
                    Some(entry) => {
                        self.record(|s| s.stale_served += 1);
                        tracing::warn!(
                            key = %key,
                            error = %e,
                            "Origin search failed, serving last known results"
                        );
                        Ok(CacheRead::stale(entry.payload, entry.updated_at))
                    }
                    None => {
                        tracing::warn!(key = %key, error = %e, "Origin search failed with nothing cached");
                        Err(e.into())
                    }
                }
            }
        }
    }

    /// Businesses matching `name`, served from the volatile tier when possible.
    ///
    /// Name searches are not persisted.
    pub async fn search_by_name<O>(
        &self,
        name: &str,
        near: Option<LocationSnapshot>,
        page: Page,
        mode: FetchMode,
        origin: &O,
    ) -> NearbyResult<CacheRead<Vec<Business>>>
    where
        O: PlaceSearchOrigin + ?Sized,
    {
        let signature = RequestSignature::for_name(name, page);

        if !mode.is_forced() {
            if let Some(entry) = self.volatile.get(&signature) {
                self.record(|s| s.memory_hits += 1);
                return Ok(CacheRead::from_cache(
                    entry.payload,
                    entry.updated_at,
                    Freshness::Memory,
                ));
            }
        }

        match origin.search_by_name(name, near, page).await {
            Ok(businesses) => {
                let fetched_at = self.now();
                self.volatile
                    .insert(signature, businesses.clone(), fetched_at);
                self.record(|s| s.origin_fetches += 1);
                Ok(CacheRead::from_origin(businesses, fetched_at))
            }
            Err(e) => {
                self.record(|s| s.origin_failures += 1);
                match self.volatile.get(&signature) {
                    Some(entry) => {
                        self.record(|s| s.stale_served += 1);
                        tracing::warn!(
                            signature = %signature,
                            error = %e,
                            "Name search failed, serving last known results"
                        );
                        Ok(CacheRead::stale(entry.payload, entry.updated_at))
                    }
                    None => Err(e.into()),
                }
            }
        }
    }

    /// Whatever the cache holds for `query`, without contacting the origin or
    /// evicting anything. Expired persisted entries come back as stale.
    pub async fn peek_nearby(&self, query: &NearbyQuery) -> Option<CacheRead<Vec<Business>>> {
        if let Some(entry) = self.volatile.get(&RequestSignature::for_query(query)) {
            return Some(CacheRead::from_cache(
                entry.payload,
                entry.updated_at,
                Freshness::Memory,
            ));
        }

        let entry = self.read_persisted(&self.key_for(query)).await?;
        let freshness = if entry.is_younger_than(self.config.max_age, self.now()) {
            Freshness::Persisted
        } else {
            Freshness::Stale
        };
        Some(CacheRead::from_cache(
            entry.payload,
            entry.updated_at,
            freshness,
        ))
    }

    /// The last name-search result for an identical request, if any.
    pub fn peek_name(&self, name: &str, page: Page) -> Option<CacheRead<Vec<Business>>> {
        self.volatile
            .get(&RequestSignature::for_name(name, page))
            .map(|entry| {
                CacheRead::from_cache(entry.payload, entry.updated_at, Freshness::Memory)
            })
    }

    /// Drop every volatile entry. Returns how many were removed.
    pub fn clear_memory(&self) -> usize {
        let removed = self.volatile.clear();
        tracing::info!(removed, "Cleared volatile geo cache");
        removed
    }

    /// Remove every persisted entry. Returns how many were removed.
    pub async fn invalidate_persisted(&self) -> NearbyResult<u64> {
        let removed = self.persisted.clear().await?;
        tracing::info!(removed, "Cleared persisted geo cache");
        Ok(removed)
    }

    /// Forget both tiers' entries for `query`.
    pub async fn invalidate(&self, query: &NearbyQuery) -> NearbyResult<()> {
        self.volatile.remove(&RequestSignature::for_query(query));
        self.persisted.remove(&self.key_for(query)).await
    }

    async fn read_persisted(&self, key: &CacheKey) -> Option<CacheEntry<Vec<Business>>> {
        match self.persisted.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring unreadable persisted cache entry");
                None
            }
        }
    }

    async fn evict_expired(&self, key: &CacheKey) {
        match self.persisted.remove(key).await {
            Ok(()) => self.record(|s| s.expired_evictions += 1),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to remove expired cache entry");
            }
        }
    }

    async fn write_persisted(&self, key: &CacheKey, businesses: &[Business], at: Timestamp) {
        if let Err(e) = self.persisted.put(key, businesses, at).await {
            tracing::warn!(key = %key, error = %e, "Failed to persist search results");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use nearby_core::{ManualClock, NearbyError, StorageError};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    // Mock origin for testing
    #[derive(Default)]
    struct MockOrigin {
        calls: AtomicUsize,
        failing: AtomicBool,
        results: Mutex<Vec<Business>>,
    }

    impl MockOrigin {
        fn returning(results: Vec<Business>) -> Self {
            Self {
                results: Mutex::new(results),
                ..Default::default()
            }
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn set_results(&self, results: Vec<Business>) {
            *self.results.lock().unwrap() = results;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn respond(&self) -> Result<Vec<Business>, OriginError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(OriginError::Unreachable {
                    reason: "offline".to_string(),
                })
            } else {
                Ok(self.results.lock().unwrap().clone())
            }
        }
    }

    #[async_trait]
    impl PlaceSearchOrigin for MockOrigin {
        async fn search_nearby(&self, _query: &NearbyQuery) -> Result<Vec<Business>, OriginError> {
            self.respond()
        }

        async fn search_by_name(
            &self,
            _name: &str,
            _near: Option<LocationSnapshot>,
            _page: Page,
        ) -> Result<Vec<Business>, OriginError> {
            self.respond()
        }
    }

    // Store whose writes always fail
    #[derive(Default)]
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl DurableStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> NearbyResult<Option<String>> {
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
            self.inner.remove(key).await
        }

        async fn keys_with_prefix(&self, prefix: &str) -> NearbyResult<Vec<String>> {
            self.inner.keys_with_prefix(prefix).await
        }
    }

    const HOUR: Duration = Duration::from_secs(3600);

    fn business(id: &str) -> Business {
        Business::new(id, format!("Business {id}"), LocationSnapshot::new(40.0, -73.0))
    }

    fn query() -> NearbyQuery {
        NearbyQuery::new(LocationSnapshot::new(40.7128, -74.006), 1000).with_categories(["cafe"])
    }

    struct Fixture {
        cache: GeoResultCache<MemoryStore>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let cache =
            GeoResultCache::with_clock(Arc::clone(&store), GeoCacheConfig::default(), clock.clone());
        Fixture {
            cache,
            store,
            clock,
        }
    }

    async fn seed_persisted(fx: &Fixture, businesses: &[Business], age: Duration) {
        let key = fx.cache.key_for(&query());
        let updated_at = fx.clock.now() - chrono::Duration::from_std(age).expect("age fits");
        PersistedTier::new(Arc::clone(&fx.store), "nearbyBusinesses_v1")
            .put(&key, businesses, updated_at)
            .await
            .expect("seed should succeed");
    }

    #[tokio::test]
    async fn test_miss_fetches_from_origin_and_fills_both_tiers() {
        let fx = fixture();
        let origin = MockOrigin::returning(vec![business("a")]);

        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");

        assert!(read.is_fresh());
        assert_eq!(read.value(), &vec![business("a")]);
        assert_eq!(origin.calls(), 1);

        let key = fx.cache.key_for(&query());
        assert!(fx
            .store
            .get(key.as_str())
            .await
            .expect("get should succeed")
            .is_some());
    }

    #[tokio::test]
    async fn test_volatile_hit_skips_origin() {
        let fx = fixture();
        let origin = MockOrigin::returning(vec![business("a")]);

        fx.cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("first fetch should succeed");
        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("second fetch should succeed");

        assert_eq!(read.freshness(), Freshness::Memory);
        assert_eq!(origin.calls(), 1);
    }

    #[tokio::test]
    async fn test_volatile_tier_never_expires_by_age() {
        let fx = fixture();
        let origin = MockOrigin::returning(vec![business("a")]);
        fx.cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");

        fx.clock.advance(48 * HOUR);
        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");
        assert_eq!(read.freshness(), Freshness::Memory);
        assert_eq!(origin.calls(), 1);
    }

    #[tokio::test]
    async fn test_young_persisted_entry_skips_origin() {
        let fx = fixture();
        seed_persisted(&fx, &[business("cached")], 5 * HOUR).await;
        let origin = MockOrigin::returning(vec![business("fresh")]);

        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");

        assert_eq!(read.freshness(), Freshness::Persisted);
        assert_eq!(read.value(), &vec![business("cached")]);
        assert_eq!(origin.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_persisted_entry_is_refetched_and_replaced() {
        let fx = fixture();
        seed_persisted(&fx, &[business("old")], 7 * HOUR).await;
        let origin = MockOrigin::returning(vec![business("new")]);

        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");

        assert!(read.is_fresh());
        assert_eq!(origin.calls(), 1);
        assert_eq!(fx.cache.stats().expired_evictions, 1);

        let entry = PersistedTier::new(Arc::clone(&fx.store), "nearbyBusinesses_v1")
            .get(&fx.cache.key_for(&query()))
            .await
            .expect("get should succeed")
            .expect("fresh entry should be written");
        assert_eq!(entry.payload, vec![business("new")]);
        assert_eq!(
            entry.updated_at.timestamp_millis(),
            fx.clock.now().timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_both_tiers() {
        let fx = fixture();
        seed_persisted(&fx, &[business("cached")], HOUR).await;
        let origin = MockOrigin::returning(vec![business("fresh")]);

        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::ForceRefresh, &origin)
            .await
            .expect("fetch should succeed");
        assert!(read.is_fresh());
        assert_eq!(read.value(), &vec![business("fresh")]);

        let again = fx
            .cache
            .fetch_nearby(&query(), FetchMode::ForceRefresh, &origin)
            .await
            .expect("fetch should succeed");
        assert!(again.is_fresh());
        assert_eq!(origin.calls(), 2);
    }

    #[tokio::test]
    async fn test_origin_failure_serves_volatile_result_as_stale() {
        let fx = fixture();
        let origin = MockOrigin::returning(vec![business("a")]);
        fx.cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");

        origin.set_failing(true);
        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::ForceRefresh, &origin)
            .await
            .expect("stale fallback should not error");

        assert!(read.is_stale());
        assert_eq!(read.value(), &vec![business("a")]);
        assert_eq!(fx.cache.stats().stale_served, 1);
    }

    #[tokio::test]
    async fn test_origin_failure_keeps_expired_entry_and_serves_it() {
        let fx = fixture();
        seed_persisted(&fx, &[business("old")], 7 * HOUR).await;
        let origin = MockOrigin::returning(vec![]);
        origin.set_failing(true);

        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("stale fallback should not error");

        assert!(read.is_stale());
        assert_eq!(read.value(), &vec![business("old")]);
        assert!(fx
            .store
            .get(fx.cache.key_for(&query()).as_str())
            .await
            .expect("get should succeed")
            .is_some());
    }

    #[tokio::test]
    async fn test_origin_failure_with_nothing_cached_is_an_error() {
        let fx = fixture();
        let origin = MockOrigin::default();
        origin.set_failing(true);

        let err = fx
            .cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect_err("nothing to fall back to");
        assert!(err.is_origin());
        assert_eq!(fx.cache.stats().origin_failures, 1);
    }

    #[tokio::test]
    async fn test_corrupt_persisted_entry_is_treated_as_absent() {
        let fx = fixture();
        fx.store
            .set(fx.cache.key_for(&query()).as_str(), "garbage")
            .await
            .expect("set should succeed");
        let origin = MockOrigin::returning(vec![business("a")]);

        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");
        assert!(read.is_fresh());
        assert_eq!(origin.calls(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_is_swallowed() {
        let store = Arc::new(ReadOnlyStore::default());
        let cache = GeoResultCache::new(store, GeoCacheConfig::default());
        let origin = MockOrigin::returning(vec![business("a")]);

        let read = cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("write failure must not reach the caller");
        assert!(read.is_fresh());

        // Volatile tier was still updated
        let again = cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");
        assert_eq!(again.freshness(), Freshness::Memory);
    }

    #[tokio::test]
    async fn test_name_search_stale_on_error() {
        let fx = fixture();
        let origin = MockOrigin::returning(vec![business("n")]);
        fx.cache
            .search_by_name("Noodle", None, Page::default(), FetchMode::CacheFirst, &origin)
            .await
            .expect("search should succeed");

        origin.set_failing(true);
        let read = fx
            .cache
            .search_by_name("noodle", None, Page::default(), FetchMode::ForceRefresh, &origin)
            .await
            .expect("stale fallback should not error");
        assert!(read.is_stale());
        assert_eq!(read.value(), &vec![business("n")]);
    }

    #[tokio::test]
    async fn test_name_search_failure_without_history_errors() {
        let fx = fixture();
        let origin = MockOrigin::default();
        origin.set_failing(true);
        let err = fx
            .cache
            .search_by_name("ramen", None, Page::default(), FetchMode::CacheFirst, &origin)
            .await
            .expect_err("nothing cached");
        assert!(matches!(err, NearbyError::Origin(_)));
    }

    #[tokio::test]
    async fn test_peek_labels_expired_entries_stale_without_evicting() {
        let fx = fixture();
        seed_persisted(&fx, &[business("old")], 9 * HOUR).await;

        let read = fx.cache.peek_nearby(&query()).await.expect("entry exists");
        assert!(read.is_stale());
        assert!(fx
            .store
            .get(fx.cache.key_for(&query()).as_str())
            .await
            .expect("get should succeed")
            .is_some());
    }

    #[tokio::test]
    async fn test_clear_memory_and_invalidate() {
        let fx = fixture();
        let origin = MockOrigin::returning(vec![business("a")]);
        fx.cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");

        assert_eq!(fx.cache.clear_memory(), 1);
        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");
        assert_eq!(read.freshness(), Freshness::Persisted);

        origin.set_results(vec![business("b")]);
        fx.cache
            .invalidate(&query())
            .await
            .expect("invalidate should succeed");
        let read = fx
            .cache
            .fetch_nearby(&query(), FetchMode::CacheFirst, &origin)
            .await
            .expect("fetch should succeed");
        assert!(read.is_fresh());
        assert_eq!(read.value(), &vec![business("b")]);

        assert_eq!(
            fx.cache
                .invalidate_persisted()
                .await
                .expect("invalidate should succeed"),
            1
        );
    }
}
