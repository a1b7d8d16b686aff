//! Error types for the signal-history-rust library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the extraction pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while extracting and normalizing a Signal profile.
#[derive(Error, Debug)]
pub enum SignalHistoryError {
    /// The companion configuration document is absent or unreadable
    #[error("Configuration missing: cannot read key from {path}: {reason}")]
    ConfigurationMissing { path: PathBuf, reason: String },

    /// The supplied key does not decrypt the store
    #[error("Authentication failed: the supplied key does not decrypt {path}")]
    AuthenticationFailed { path: PathBuf },

    /// The encrypted store is missing or cannot be opened
    #[error("Store unavailable: {path}: {reason}")]
    StoreUnavailable { path: PathBuf, reason: String },

    /// A message references a conversation id with no matching contact
    #[error("Unresolved contact: message references unknown conversation id {0}")]
    UnresolvedContact(String),

    /// A well-known device metadata key is absent from the source
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// A log file contains a line that is not valid JSON
    #[error("Malformed log line: {file}:{line}: {reason}")]
    MalformedLogLine {
        file: String,
        line: usize,
        reason: String,
    },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience type alias for Result with SignalHistoryError
pub type Result<T> = std::result::Result<T, SignalHistoryError>;
