//! Cache key fingerprints.
//!
//! Two kinds of keys address cached results:
//!
//! - [`CacheKey`] addresses the persisted tier. Coordinates are rounded to a
//!   fixed precision and categories are normalised into a sorted set, so the
//!   same logical query always maps to the same key regardless of category
//!   order or floating point noise below the precision.
//! - [`RequestSignature`] addresses the volatile tier. It keeps full
//!   coordinate precision and includes pagination, so only an identical
//!   request hits.

use std::collections::BTreeSet;
use std::fmt;

use nearby_core::{NearbyQuery, Page};

/// Persisted-tier key: `<prefix>:<lat>:<lon>:<radius>:<sorted,categories>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Fingerprint `query` under `prefix`, rounding coordinates to `precision`
    /// decimal places. Pagination is not part of the key.
    pub fn for_query(prefix: &str, query: &NearbyQuery, precision: u32) -> Self {
        Self(format!(
            "{}:{}:{}:{}:{}",
            prefix,
            format_coordinate(query.center.latitude, precision),
            format_coordinate(query.center.longitude, precision),
            query.radius_m,
            category_csv(&query.categories),
        ))
    }

    /// The encoded key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Volatile-tier key for one exact request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestSignature(String);

impl RequestSignature {
    /// Signature of a circle search, including pagination.
    pub fn for_query(query: &NearbyQuery) -> Self {
        Self(format!(
            "nearby|{}|{}|{}|{}|{}",
            query.center.latitude,
            query.center.longitude,
            query.radius_m,
            category_csv(&query.categories),
            page_part(query.page),
        ))
    }

    /// Signature of a name search. Text is trimmed and lowercased.
    pub fn for_name(name: &str, page: Page) -> Self {
        Self(format!(
            "name|{}|{}",
            name.trim().to_lowercase(),
            page_part(page),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Round to `precision` places and format with exactly that many places.
///
/// Negative zero is folded into zero so `-0.00001` and `0.0` agree.
pub fn format_coordinate(value: f64, precision: u32) -> String {
    let scale = 10f64.powi(precision as i32);
    let mut rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{:.*}", precision as usize, rounded)
}

/// Categories as a trimmed, lowercased, deduplicated, sorted CSV.
pub fn category_csv(categories: &[String]) -> String {
    categories
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(",")
}

fn page_part(page: Page) -> String {
    format!("{}+{}", page.offset, page.limit)
}
