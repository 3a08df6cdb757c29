//! # Store Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Store Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Snapshots     │  │     Runtime             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Encode/Decode  │  │  NoRuntime              │ │
//! │  │  InvalidUrl     │  │  Unsupported    │  │  Storage                │ │
//! │  │  Load/Save      │  │  Version        │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Request failures are NOT here: they are RequestError values stored    │
//! │  in the owning slice.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Snapshot Errors
    // =========================================================================
    #[error("Snapshot encoding failed: {0}")]
    SnapshotEncode(String),

    #[error("Snapshot under '{key}' could not be decoded: {message}")]
    SnapshotDecode { key: String, message: String },

    /// Written by a newer build, or by a version with no migration path.
    #[error("Snapshot under '{key}' has unsupported version {version}")]
    UnsupportedVersion { key: String, version: u32 },

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("The store must be created inside a Tokio runtime")]
    NoRuntime,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<tote_db::DbError> for StoreError {
    fn from(err: tote_db::DbError) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<tote_api::ApiError> for StoreError {
    fn from(err: tote_api::ApiError) -> Self {
        StoreError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(err: toml::ser::Error) -> Self {
        StoreError::ConfigSaveFailed(err.to_string())
    }
}
