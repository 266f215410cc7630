//! Error types for Nearby operations

use std::time::Duration;
use thiserror::Error;

/// Durable storage errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Read failed for key {key}: {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("Write failed for key {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Remove failed for key {key}: {reason}")]
    RemoveFailed { key: String, reason: String },

    #[error("Serialization failed for key {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Corrupted data under key {key}: {reason}")]
    Corrupted { key: String, reason: String },

    #[error("Storage backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Place-search origin errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OriginError {
    #[error("Origin unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Origin request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Malformed origin payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("Origin timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
}

/// Device location errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Location provider unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Network-status probe errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectivityError {
    #[error("Connectivity probe failed: {reason}")]
    ProbeFailed { reason: String },

    #[error("{action} needs a network connection and nothing is cached")]
    Offline { action: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Nearby errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NearbyError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Origin error: {0}")]
    Origin(#[from] OriginError),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl NearbyError {
    /// Whether the failure came from the place-search origin.
    pub fn is_origin(&self) -> bool {
        matches!(self, Self::Origin(_))
    }

    /// Whether the device was offline and no cached data could stand in.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Connectivity(ConnectivityError::Offline { .. }))
    }
}

/// Result type alias for Nearby operations.
pub type NearbyResult<T> = Result<T, NearbyError>;

// =============================================================================
// TESTS
// =============================================================================
