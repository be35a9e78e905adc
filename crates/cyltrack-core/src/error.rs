//! # Error Types
//!
//! Domain-specific error types for cyltrack-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cyltrack-core errors (this file)                                      │
//! │  ├── CoreError      - General domain errors                            │
//! │  └── BarcodeError   - Barcode validation failures                      │
//! │                                                                         │
//! │  cyltrack-db errors (separate crate)                                   │
//! │  └── DbError        - Database operation failures                      │
//! │                                                                         │
//! │  cyltrack-sync errors (separate crate)                                 │
//! │  └── SyncError      - Remote/queue reconciliation failures             │
//! │                                                                         │
//! │  Flow: BarcodeError → CoreError → SyncError → scanner UI feedback      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (barcode, lengths, patterns)
//! 3. Errors are enum variants, never String
//! 4. Validation outcomes are resolved locally and shown to the user -
//!    they never cross the sync boundary as exceptions

use thiserror::Error;

// =============================================================================
// Barcode Validation Error
// =============================================================================

/// Barcode validation failures.
///
/// Each variant is a distinct, user-presentable rejection reason. A rejected
/// barcode is never queued and never reaches the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarcodeError {
    /// Input was empty or whitespace-only.
    #[error("barcode is empty")]
    Empty,

    /// Input contains internal whitespace.
    ///
    /// ## When This Occurs
    /// - Two adjacent labels read as one frame
    /// - Manual entry with a stray space
    #[error("barcode contains whitespace: '{raw}'")]
    Malformed { raw: String },

    /// Trimmed length is outside the accepted range.
    #[error("barcode length {len} out of range ({min}-{max})")]
    LengthOutOfRange { len: usize, min: usize, max: usize },

    /// A `%`-prefixed code did not match the receipt format.
    #[error("invalid receipt barcode '{raw}': expected %XXXXXXXX-NNNNNNNNNN with optional trailing letter")]
    InvalidReceipt { raw: String },

    /// Code matched neither the receipt format nor the serial pattern.
    #[error("barcode '{raw}' does not match serial pattern {pattern}")]
    PatternMismatch { raw: String, pattern: String },

    /// Known placeholder serials are rejected outright.
    #[error("barcode '{raw}' is a placeholder value")]
    Placeholder { raw: String },

    /// The caller-supplied serial pattern failed to compile.
    #[error("invalid serial pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

// =============================================================================
// Core Error
// =============================================================================

/// Core scan-pipeline errors.
///
/// These represent pipeline rule violations rather than infrastructure
/// failures. They should be caught and translated to user-facing feedback.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No ScanRecord exists for the given barcode in this session.
    ///
    /// ## When This Occurs
    /// - Removing a barcode that was never committed
    /// - Committing against a reservation that was already released
    #[error("No scan record for barcode: {0}")]
    RecordNotFound(String),

    /// A record commit arrived without a prior key reservation.
    ///
    /// The dedup key must be reserved synchronously before any await point;
    /// a commit without one indicates the caller skipped `admit`.
    #[error("Barcode {barcode} was committed without a reservation for {action}")]
    NotReserved { barcode: String, action: String },

    /// Validation error (wraps BarcodeError).
    #[error("Validation error: {0}")]
    Validation(#[from] BarcodeError),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barcode_error_messages() {
        let err = BarcodeError::LengthOutOfRange {
            len: 2,
            min: 4,
            max: 50,
        };
        assert_eq!(err.to_string(), "barcode length 2 out of range (4-50)");

        let err = BarcodeError::Empty;
        assert_eq!(err.to_string(), "barcode is empty");
    }

    #[test]
    fn test_barcode_converts_to_core_error() {
        let core_err: CoreError = BarcodeError::Empty.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_core_error_messages() {
        let err = CoreError::RecordNotFound("123456789".to_string());
        assert_eq!(err.to_string(), "No scan record for barcode: 123456789");
    }
}
