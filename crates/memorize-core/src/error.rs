//! Core error types for memorize-core.
//!
//! The three domain errors (`InvalidPreference`, `InvalidOutcome`,
//! `CorruptState`) are data-integrity failures: they are surfaced to the
//! caller as-is and never defaulted away inside the library.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for memorize-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Frequency preference was zero, negative or not a number
    #[error("Invalid frequency preference {0}: must be a positive number")]
    InvalidPreference(f64),

    /// Acknowledgment was neither remembered nor forgotten
    #[error("Unexpected acknowledgment outcome: '{0}'")]
    InvalidOutcome(String),

    /// A stored task field holds a value of the wrong shape
    #[error("Corrupt task state for '{key}': unexpected value {found}")]
    CorruptState { key: String, found: String },

    /// Decay exponent was zero, negative, infinite or not a number
    #[error("Invalid decay exponent {0}: must be a finite positive number")]
    InvalidExponent(f64),

    /// The computed due date does not fit in the supported date range
    #[error("Next interval of {delay_days} days is out of range")]
    IntervalOutOfRange { delay_days: f64 },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task store errors
    #[error("Task store error: {0}")]
    Store(#[from] StoreError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    /// Key does not exist in the configuration
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Home/config directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Task store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store refused a write
    #[error("Failed to write '{key}': {message}")]
    WriteRejected { key: String, message: String },

    /// Task record could not be found
    #[error("Task not found at {0}")]
    NotFound(PathBuf),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
