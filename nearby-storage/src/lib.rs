//! Nearby Storage - Durable Stores, Geo Result Cache and Offline Queue
//!
//! Everything in this crate sits on the [`DurableStore`] seam: the persisted
//! tier of the [`GeoResultCache`] and the [`OfflineMutationQueue`] both keep
//! their data as JSON strings under fixed keys.

pub mod cache;
pub mod kv;
pub mod lmdb_store;
pub mod queue;

pub use cache::{
    CacheEntry, CacheKey, CacheRead, CacheStats, FetchMode, Freshness, GeoCacheConfig,
    GeoResultCache, PlaceSearchOrigin, RequestSignature,
};
pub use kv::{DurableStore, MemoryStore};
pub use lmdb_store::{LmdbStore, LmdbStoreError};
pub use queue::OfflineMutationQueue;
