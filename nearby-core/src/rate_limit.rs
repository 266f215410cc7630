//! Sliding-window attempt limiter.
//!
//! Tracks how many attempts a key has made inside its current window. Windows
//! open on the first attempt and reset lazily: a record whose reset time has
//! passed is replaced on the next access for that key, or by an explicit
//! [`RateLimiter::purge_expired`] sweep.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::clock::{add_duration, elapsed_between, Clock, SystemClock};
use crate::Timestamp;

/// Attempt count for one key inside its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    /// Attempts allowed so far in this window.
    pub count: u32,
    /// When the window closes.
    pub window_reset_at: Timestamp,
}

impl RateLimitRecord {
    fn is_expired(&self, now: Timestamp) -> bool {
        now > self.window_reset_at
    }
}

static GLOBAL: Lazy<RateLimiter> = Lazy::new(RateLimiter::new);

/// Per-key sliding-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    /// Per-key records; the entry API makes check-and-increment atomic per key.
    records: DashMap<String, RateLimitRecord>,
    clock: Arc<dyn Clock>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Create a limiter on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a limiter on the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            clock,
        }
    }

    /// Process-wide limiter shared by every call site.
    pub fn global() -> &'static RateLimiter {
        &GLOBAL
    }

    /// Record an attempt for `key` and report whether it is allowed.
    ///
    /// The first attempt for a key, or the first after its window elapsed,
    /// opens a new window of length `window` and is always allowed. Later
    /// attempts are allowed while the count is below `max_attempts`; a
    /// rejected attempt leaves the record untouched.
    pub fn is_allowed(&self, key: &str, max_attempts: u32, window: Duration) -> bool {
        let now = self.clock.now();

        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                let record = occupied.get_mut();
                if record.count < max_attempts {
                    record.count += 1;
                    true
                } else {
                    false
                }
            }
            entry => {
                entry.insert(RateLimitRecord {
                    count: 1,
                    window_reset_at: add_duration(now, window),
                });
                true
            }
        }
    }

    /// Time until the window for `key` resets, zero if there is no record.
    pub fn remaining_time(&self, key: &str) -> Duration {
        let now = self.clock.now();
        self.records
            .get(key)
            .map(|record| elapsed_between(now, record.window_reset_at))
            .unwrap_or(Duration::ZERO)
    }

    /// Forget everything about `key`.
    pub fn reset(&self, key: &str) {
        self.records.remove(key);
    }

    /// Current record for `key`, if any.
    pub fn record(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.get(key).map(|record| *record)
    }

    /// Drop every record whose window has elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        before.saturating_sub(self.records.len())
    }

    /// Number of keys currently holding a record.
    pub fn tracked_keys(&self) -> usize {
        self.records.len()
    }
}
