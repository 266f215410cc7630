//! Freshness labels for cache reads.
//!
//! Every read out of the geo result cache says where the data came from, so
//! callers can tell a fresh origin result from a stale fallback without the
//! fallback ever surfacing as an error.

use std::time::Duration;

use nearby_core::clock::elapsed_between;
use nearby_core::Timestamp;

/// Where a cached read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Freshness {
    /// Fetched from the origin during this call.
    Origin,
    /// Served from the in-memory tier for an identical request.
    Memory,
    /// Served from the persisted tier, younger than the max age.
    Persisted,
    /// The origin failed (or was unreachable) and an older result was served.
    Stale,
}

impl Freshness {
    /// Returns true if no origin call was needed.
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Self::Memory | Self::Persisted)
    }

    /// Returns true if this is a degraded, stale-on-error read.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}

/// How a fetch treats cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Serve from the volatile or persisted tier when possible.
    #[default]
    CacheFirst,
    /// Bypass both tiers and go to the origin.
    ForceRefresh,
}

impl FetchMode {
    /// Build from a "force refresh" flag.
    pub fn from_force(force: bool) -> Self {
        if force {
            Self::ForceRefresh
        } else {
            Self::CacheFirst
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, Self::ForceRefresh)
    }
}

/// A whole cache entry. Writes always replace the entry; the payload is never
/// modified in place.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    pub updated_at: Timestamp,
}

impl<T> CacheEntry<T> {
    pub fn new(key: impl Into<String>, payload: T, updated_at: Timestamp) -> Self {
        Self {
            key: key.into(),
            payload,
            updated_at,
        }
    }

    /// Age of the entry as of `now`.
    pub fn age(&self, now: Timestamp) -> Duration {
        elapsed_between(self.updated_at, now)
    }

    /// Whether the entry is younger than `max_age` as of `now`.
    pub fn is_younger_than(&self, max_age: Duration, now: Timestamp) -> bool {
        self.age(now) < max_age
    }
}

/// Result of a cache-backed read, carrying its freshness label.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    updated_at: Timestamp,
    freshness: Freshness,
}

impl<T> CacheRead<T> {
    /// A read that did not need the origin.
    pub fn from_cache(value: T, updated_at: Timestamp, freshness: Freshness) -> Self {
        Self {
            value,
            updated_at,
            freshness,
        }
    }

    /// A read fetched from the origin at `fetched_at`.
    pub fn from_origin(value: T, fetched_at: Timestamp) -> Self {
        Self {
            value,
            updated_at: fetched_at,
            freshness: Freshness::Origin,
        }
    }

    /// A stale fallback served after an origin failure.
    pub fn stale(value: T, updated_at: Timestamp) -> Self {
        Self {
            value,
            updated_at,
            freshness: Freshness::Stale,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    /// When the underlying data was last fetched from the origin.
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns true if the data was fetched from the origin during this call.
    pub fn is_fresh(&self) -> bool {
        self.freshness == Freshness::Origin
    }

    pub fn is_stale(&self) -> bool {
        self.freshness.is_stale()
    }

    /// How old the data is as of `now`.
    pub fn staleness(&self, now: Timestamp) -> Duration {
        elapsed_between(self.updated_at, now)
    }

    /// Relabel this read as stale.
    pub fn into_stale(self) -> Self {
        Self {
            freshness: Freshness::Stale,
            ..self
        }
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            updated_at: self.updated_at,
            freshness: self.freshness,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
