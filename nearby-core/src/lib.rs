//! Nearby Core - Shared Types
//!
//! Data types, errors, configuration and the rate limiter used by every other
//! crate. Nothing in here performs I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod clock;
pub mod config;
pub mod error;
pub mod mutation;
pub mod rate_limit;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LogFormat, NearbyConfig, DEFAULT_CACHE_MAX_AGE, DEFAULT_QUEUE_CAPACITY};
pub use error::{
    ConfigError, ConnectivityError, LocationError, NearbyError, NearbyResult, OriginError,
    StorageError,
};
pub use mutation::{MutationId, MutationKind, OfflineMutation};
pub use rate_limit::{RateLimitRecord, RateLimiter};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// LOCATION
// ============================================================================

/// A geographic coordinate.
///
/// Consumers always receive copies; the location coordinator owns the
/// authoritative value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationSnapshot {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

// ============================================================================
// PLACES
// ============================================================================

/// A business record as returned by the place-search origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Business {
    pub fn new(id: impl Into<String>, name: impl Into<String>, at: LocationSnapshot) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude: at.latitude,
            longitude: at.longitude,
            categories: Vec::new(),
            rating: None,
            review_count: 0,
            address: None,
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rating(mut self, rating: f32, review_count: u32) -> Self {
        self.rating = Some(rating);
        self.review_count = review_count;
        self
    }
}

/// Result page requested from the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

/// A "businesses within a circle" search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyQuery {
    pub center: LocationSnapshot,
    /// Search radius in meters.
    pub radius_m: u32,
    pub categories: Vec<String>,
    pub page: Page,
}

impl NearbyQuery {
    pub fn new(center: LocationSnapshot, radius_m: u32) -> Self {
        Self {
            center,
            radius_m,
            categories: Vec::new(),
            page: Page::default(),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}
