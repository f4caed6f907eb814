//! Error types for lapsetrack.
//!
//! Malformed persisted data never shows up here: the reconciler degrades it to
//! defaults. These errors cover storage I/O, input validation and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`crate::storage::TaskStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a JSON array.
    #[error("cannot decode task store {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Tasks could not be serialized.
    #[error("cannot encode tasks: {0}")]
    Encode(#[from] serde_json::Error),

    /// The store changed between load and save; the save was refused.
    #[error("task store {location} was modified by another writer; reload and try again")]
    Conflict { location: String },
}

/// Errors raised when admitting a new task.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("duration must be at least 1 day, got {0}")]
    InvalidDuration(u32),
}

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment extraction or merge error.
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// A setting has an out-of-range value.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Top-level error for a single command or UI cycle.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Terminal setup or event handling failed.
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}
