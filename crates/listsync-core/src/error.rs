//! Error types for the container sync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for container sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the container sync system
#[derive(Error, Debug)]
pub enum Error {
    /// The remote container service could not be reached (connectivity,
    /// timeout, or transport-level failure). Never retried by the core.
    #[error("remote service unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote container service executed the request but reported
    /// domain-level errors (permission, not-found, validation, duplicate).
    /// The structured error payload from the remote side is preserved.
    #[error("remote service rejected request: {summary}")]
    RemoteRejected {
        /// Human-readable summary of the rejection
        summary: String,
        /// Structured error payload as reported by the remote side
        errors: serde_json::Value,
    },

    /// The durable cache store could not be opened or a read/write failed
    #[error("cache store error: {0}")]
    Store(String),

    /// A cache-only operation was invoked on an engine configured without
    /// a cache store
    #[error("cache is disabled; configure a cache store to use this operation")]
    CacheDisabled,

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a remote-unavailable error
    pub fn remote_unavailable(msg: impl Into<String>) -> Self {
        Self::RemoteUnavailable(msg.into())
    }

    /// Create a remote-rejected error from the remote error payload
    pub fn remote_rejected(summary: impl Into<String>, errors: serde_json::Value) -> Self {
        Self::RemoteRejected {
            summary: summary.into(),
            errors,
        }
    }

    /// Create a cache store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}
