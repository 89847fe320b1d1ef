//! Core error types for studyroom-core.
//!
//! Expected session control flow (period end, energy depletion, a session
//! running out of periods) never goes through these types. They cover the
//! collaborator boundary: storage, configuration, identity and input
//! validation.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studyroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Record store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No user id is available; the caller has to send the user through login.
    #[error("No user identity available; log in before starting a session")]
    MissingIdentity,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Store is locked")]
    Locked,

    /// Stored document could not be encoded or decoded
    #[error("Malformed record: {0}")]
    Serialization(String),

    /// The store refused the write
    #[error("Store rejected the write: {0}")]
    Rejected(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Requested duration does not cover a single work period
    #[error("Session of {minutes} minutes is shorter than one {period_minutes}-minute period")]
    DurationTooShort { minutes: u32, period_minutes: u32 },

    /// Score cannot cover a redemption
    #[error("Not enough points: need {cost}, have {available}")]
    InsufficientPoints { cost: u32, available: u32 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_into_core_error() {
        let err: CoreError = StoreError::Locked.into();
        assert!(matches!(err, CoreError::Store(StoreError::Locked)));
        assert_eq!(err.to_string(), "Store error: Store is locked");
    }

    #[test]
    fn insufficient_points_message() {
        let err = ValidationError::InsufficientPoints { cost: 40, available: 12 };
        assert_eq!(err.to_string(), "Not enough points: need 40, have 12");
    }

    #[test]
    fn json_errors_map_to_serialization() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = bad.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
