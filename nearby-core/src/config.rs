//! Client configuration.
//!
//! Policy values live here so the cache, queue and location layers agree on
//! them. Configuration is loaded from environment variables with defaults
//! matching the production policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::LocationSnapshot;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable single line.
    #[default]
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "compact" | "text" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Configuration for the synchronization layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyConfig {
    // ========================================================================
    // Geo result cache
    // ========================================================================
    /// Maximum age of a persisted cache entry before it is refetched.
    pub cache_max_age: Duration,

    /// Decimal places kept when fingerprinting coordinates.
    pub coordinate_precision: u32,

    /// Prefix of persisted cache keys.
    pub cache_key_prefix: String,

    // ========================================================================
    // Offline mutation queue
    // ========================================================================
    /// Durable storage key holding the queue.
    pub queue_key: String,

    /// Maximum number of pending mutations kept.
    pub queue_capacity: usize,

    // ========================================================================
    // Location
    // ========================================================================
    /// Coordinate broadcast when no location has ever been obtained.
    pub default_location: LocationSnapshot,

    /// Timeout handed to the device-location provider.
    pub location_timeout: Duration,

    // ========================================================================
    // Logging
    // ========================================================================
    pub log_format: LogFormat,
}

/// Persisted entries older than this are refetched.
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(6 * 60 * 60);

/// Hard cap on pending offline mutations.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            coordinate_precision: 4,
            cache_key_prefix: "nearbyBusinesses_v1".to_string(),
            queue_key: "offlineMutations_v1".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            default_location: LocationSnapshot::new(37.7749, -122.4194),
            location_timeout: Duration::from_secs(15),
            log_format: LogFormat::Compact,
        }
    }
}

impl NearbyConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create NearbyConfig from environment variables.
    ///
    /// Environment variables:
    /// - `NEARBY_CACHE_MAX_AGE_SECS`: Persisted cache max age (default: 21600)
    /// - `NEARBY_QUEUE_CAPACITY`: Offline queue capacity (default: 50)
    /// - `NEARBY_DEFAULT_LATITUDE` / `NEARBY_DEFAULT_LONGITUDE`: Fallback coordinate
    /// - `NEARBY_LOCATION_TIMEOUT_MS`: Device location timeout (default: 15000)
    /// - `NEARBY_LOG_FORMAT`: "json" or "compact" (default: compact)
    ///
    /// Absent or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache_max_age = env_parse::<u64>("NEARBY_CACHE_MAX_AGE_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_max_age);

        let queue_capacity =
            env_parse::<usize>("NEARBY_QUEUE_CAPACITY").unwrap_or(defaults.queue_capacity);

        let latitude = env_parse::<f64>("NEARBY_DEFAULT_LATITUDE")
            .unwrap_or(defaults.default_location.latitude);
        let longitude = env_parse::<f64>("NEARBY_DEFAULT_LONGITUDE")
            .unwrap_or(defaults.default_location.longitude);

        let location_timeout = env_parse::<u64>("NEARBY_LOCATION_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.location_timeout);

        let log_format = std::env::var("NEARBY_LOG_FORMAT")
            .ok()
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or(defaults.log_format);

        Self {
            cache_max_age,
            queue_capacity,
            default_location: LocationSnapshot::new(latitude, longitude),
            location_timeout,
            log_format,
            ..defaults
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_max_age.is_zero() {
            return Err(invalid("cache_max_age", "0", "must be > 0"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "0", "must be > 0"));
        }
        if self.coordinate_precision > 10 {
            return Err(invalid(
                "coordinate_precision",
                &self.coordinate_precision.to_string(),
                "must be <= 10",
            ));
        }
        if self.cache_key_prefix.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "cache_key_prefix".to_string(),
            });
        }
        if self.queue_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "queue_key".to_string(),
            });
        }
        if !self.default_location.is_valid() {
            return Err(invalid(
                "default_location",
                &format!(
                    "{},{}",
                    self.default_location.latitude, self.default_location.longitude
                ),
                "latitude must be within [-90, 90] and longitude within [-180, 180]",
            ));
        }
        if self.location_timeout.is_zero() {
            return Err(invalid("location_timeout", "0", "must be > 0"));
        }
        Ok(())
    }

    /// Set the persisted cache max age.
    pub fn with_cache_max_age(mut self, max_age: Duration) -> Self {
        self.cache_max_age = max_age;
        self
    }

    /// Set the offline queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the fallback coordinate.
    pub fn with_default_location(mut self, location: LocationSnapshot) -> Self {
        self.default_location = location;
        self
    }

    /// Set the device location timeout.
    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout = timeout;
        self
    }

    /// Set the log output format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy() {
        let config = NearbyConfig::default();
        assert_eq!(config.cache_max_age, Duration::from_secs(21_600));
        assert_eq!(config.queue_capacity, 50);
        assert_eq!(config.coordinate_precision, 4);
        assert_eq!(config.cache_key_prefix, "nearbyBusinesses_v1");
        assert_eq!(config.queue_key, "offlineMutations_v1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = NearbyConfig::new()
            .with_cache_max_age(Duration::from_secs(60))
            .with_queue_capacity(5)
            .with_default_location(LocationSnapshot::new(51.5074, -0.1278))
            .with_location_timeout(Duration::from_secs(3))
            .with_log_format(LogFormat::Json);

        assert_eq!(config.cache_max_age, Duration::from_secs(60));
        assert_eq!(config.queue_capacity, 5);
        assert_eq!(config.default_location.latitude, 51.5074);
        assert_eq!(config.location_timeout, Duration::from_secs(3));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = NearbyConfig::new().with_queue_capacity(0);
        let err = config.validate().expect_err("zero capacity must be rejected");
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "queue_capacity"));
    }

    #[test]
    fn test_validate_rejects_zero_max_age() {
        let config = NearbyConfig::new().with_cache_max_age(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_default_location() {
        let config = NearbyConfig::new().with_default_location(LocationSnapshot::new(95.0, 0.0));
        let err = config.validate().expect_err("latitude 95 must be rejected");
        assert!(err.to_string().contains("default_location"));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" compact "), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
