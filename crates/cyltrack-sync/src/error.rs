//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Remote      │  │      Session            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Remote(...)    │  │  InvalidSessionState    │ │
//! │  │  ConfigLoad     │  │  (unavailable / │  │  Core(...)              │ │
//! │  │  ConfigSave     │  │   rejected)     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │    Database     │  │  NOTE: per-operation sync failures are NOT  │  │
//! │  │                 │  │  errors - they are collected into the       │  │
//! │  │  Database(...)  │  │  SyncReport. Nothing throws past sync_all.  │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering configuration, storage and session failures.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Errors are categorized for different handling strategies
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scanner configuration.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Local database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Failed to serialize/deserialize a payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// A remote call failed outside the per-operation collection path
    /// (catalog lookup, order retag).
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// Operation not valid in the current session state.
    #[error("Invalid session state: expected {expected}, got {actual}")]
    InvalidSessionState { expected: String, actual: String },

    /// Scan-pipeline invariant violation from the core crate.
    #[error("Core error: {0}")]
    Core(#[from] cyltrack_core::CoreError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal sync error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<cyltrack_db::DbError> for SyncError {
    fn from(err: cyltrack_db::DbError) -> Self {
        SyncError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the operation can be retried as-is.
    ///
    /// ## Retryable Errors
    /// - Remote unavailability (network issues)
    /// - Local database contention
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Remote rejections (the request itself is bad)
    /// - Session state violations
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(remote) => remote.is_retryable(),
            SyncError::Database(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::Remote(RemoteError::Unavailable("timeout".into())).is_retryable());
        assert!(SyncError::Database("locked".into()).is_retryable());

        assert!(!SyncError::Remote(RemoteError::Rejected("bad row".into())).is_retryable());
        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
        assert!(!SyncError::InvalidSessionState {
            expected: "scanning".into(),
            actual: "idle".into(),
        }
        .is_retryable());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(SyncError::ConfigLoadFailed("missing".into()).is_config_error());
        assert!(!SyncError::Database("oops".into()).is_config_error());
    }
}
