//! Core error types for cartwatch-core.
//!
//! This module defines the error hierarchy using thiserror. The taxonomy
//! follows how callers recover: transient source failures are retried or
//! failed open, validation failures are rejected synchronously with the
//! previous state retained, and logical no-ops are not errors at all.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for cartwatch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Remote collaborator errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// An add request arrived while another one is mid-check or awaiting
    /// the user's confirm/cancel decision.
    #[error("Repurchase guard is busy with a pending add")]
    GuardBusy,

    /// Confirm/cancel called with no warning pending.
    #[error("No pending repurchase warning to resolve")]
    NoPendingWarning,

    /// The local mutation was applied but the remote write-through kept
    /// failing past the retry budget. Local state is intact.
    #[error("'{operation}' not acknowledged by the server after {attempts} attempts: {source}")]
    RemoteOutOfSync {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: SourceError,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures talking to a remote collaborator.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Connection-level failure (DNS, refused, TLS, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("Server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// A 200 response whose envelope reports failure
    #[error("Server reported failure: {0}")]
    Server(String),

    /// Bounded wait elapsed
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Response body did not match the expected shape
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The resource does not exist (e.g. an item with no purchase history)
    #[error("Not found")]
    NotFound,
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Transport(err.to_string())
    }
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

    /// Data directory could not be prepared
    #[error("Cannot prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },

    /// Unknown dot-separated config key
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Numeric value outside its allowed range
    #[error("Value for '{field}' out of range: {value} (allowed 0..={max})")]
    OutOfRange {
        field: String,
        value: i64,
        max: i64,
    },

    /// Time-of-day string that is not HH:MM
    #[error("Invalid time of day '{0}': expected HH:MM")]
    InvalidTimeOfDay(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
