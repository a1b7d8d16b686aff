//! Signal History - Desktop Profile Extraction and Normalization
//!
//! A Rust library for decrypting a Signal Desktop client's local SQLCipher
//! store and normalizing its contents into a cross-referenced JSON artifact
//! set for offline review.
//!
//! # Features
//!
//! - SQLCipher store decryption using the profile's own `config.json` key
//! - Contact directory construction with self-account detection
//! - Message normalization with attachment and call-history decoding
//! - Device metadata extraction with deterministic timestamp formatting
//! - Rotated log merging for the `app` and `main` categories

/// Configuration management
pub mod config;
/// Contact and avatar normalization
pub mod contacts;
/// Decrypting extractor for the encrypted store
pub mod db;
/// Error types
pub mod error;
/// Artifact persistence
pub mod file_writer;
/// Device metadata normalization
pub mod items;
/// Logging setup and utilities
pub mod logging;
/// Rotated log merging
pub mod logs;
/// Message and attachment normalization
pub mod messages;
/// Encrypted store schema definitions
pub mod schema;
/// Pipeline orchestration
pub mod service;
/// Shared timestamp and path helpers
pub mod utils;
/// Input validation and preflight checks
pub mod validation;

// Re-export key components for easier access
pub use contacts::{ContactDirectory, ContactEntry};
pub use error::{Result, SignalHistoryError};
pub use service::{run_extraction, ExtractionContext};
