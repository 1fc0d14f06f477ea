//! Error types for the picker core.
//!
//! Provides standardized error handling across the crate.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers of the picker core.
#[derive(Debug, Error)]
pub enum PickerError {
    /// The data source failed and retries were exhausted
    #[error("Network error after {attempts} attempt(s): {source}")]
    Network {
        attempts: u32,
        #[source]
        source: FetchError,
    },

    /// The persisted key-value store could not be used
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for picker operations
pub type PickerResult<T> = Result<T, PickerError>;

/// Failure reported by a [`DataSource`](crate::core::DataSource).
///
/// Cloneable so one failure can be handed to every caller sharing an
/// in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("server responded with status {code}: {message}")]
    Status { code: u16, message: String },
}

impl FetchError {
    pub fn transport(message: impl Into<String>) -> Self {
        FetchError::Transport(message.into())
    }
}

/// Failure reported by a [`PersistedStore`](crate::services::storage::PersistedStore).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
