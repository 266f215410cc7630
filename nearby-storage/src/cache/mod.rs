//! Two-tier cache for nearby and name search results.
//!
//! A volatile in-memory tier answers identical repeat requests within one
//! session. A persisted tier on a [`DurableStore`](crate::kv::DurableStore)
//! survives restarts and is refreshed once an entry reaches its max age.
//!
//! Reads never hide where their data came from: every read returns a
//! [`CacheRead<T>`] labelled with a [`Freshness`]. When the origin fails, the
//! last result for the same request is served with [`Freshness::Stale`]
//! rather than an error.
//!
//! # Example
//!
//! ```ignore
//! let cache = GeoResultCache::new(store, GeoCacheConfig::from(&config));
//!
//! // Cache first
//! let read = cache.fetch_nearby(&query, FetchMode::CacheFirst, &origin).await?;
//!
//! // Pull-to-refresh
//! let read = cache.fetch_nearby(&query, FetchMode::ForceRefresh, &origin).await?;
//!
//! if read.is_stale() {
//!     tracing::warn!(age = ?read.staleness(Utc::now()), "Showing cached results");
//! }
//! ```

pub mod freshness;
pub mod geo;
pub mod key;
pub mod persisted;
pub mod stats;
pub mod volatile;

pub use freshness::{CacheEntry, CacheRead, FetchMode, Freshness};
pub use geo::{GeoCacheConfig, GeoResultCache, PlaceSearchOrigin};
pub use key::{CacheKey, RequestSignature};
pub use persisted::PersistedTier;
pub use stats::CacheStats;
pub use volatile::VolatileTier;
