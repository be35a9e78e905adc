//! # Validation Module
//!
//! Barcode format validation for the CylTrack scan pipeline.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Scanner app (TypeScript)                                     │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (Rust)                                           │
//! │  ├── Authoritative format classification (receipt vs serial)           │
//! │  └── Runs on every camera detection and manual entry                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Remote store                                                 │
//! │  └── Catalog existence check (async, outside this crate)               │
//! │                                                                         │
//! │  Defense in depth: a barcode that fails here is never queued           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Accepted Formats
//! - **Receipt**: `%XXXXXXXX-NNNNNNNNNN` + optional trailing letter, where
//!   `X` is a hex digit. The leading `%` may be dropped by some scanners,
//!   so the bare variant is accepted too.
//! - **Serial**: organization-configurable pattern, default exactly nine
//!   digits (`^[0-9]{9}$`).
//!
//! Validation is pure and total: every input maps to a result value, no
//! panics, no I/O.

use regex::Regex;

use crate::error::BarcodeError;
use crate::{DEFAULT_SERIAL_PATTERN, MAX_BARCODE_LEN, MIN_BARCODE_LEN};

/// Serials the label printer emits on blank stock; never real cylinders.
const PLACEHOLDER_SERIALS: &[&str] = &["000000000"];

// =============================================================================
// Barcode Format
// =============================================================================

/// Classification of a valid barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeFormat {
    /// `%`-prefixed receipt code (or its bare variant).
    Receipt,
    /// Cylinder serial number matching the configured pattern.
    Serial,
}

// =============================================================================
// Barcode Validator
// =============================================================================

/// Classifies and validates raw scanned strings.
///
/// Holds the compiled serial pattern so per-scan validation allocates
/// nothing and touches no I/O.
///
/// ## Example
/// ```rust
/// use cyltrack_core::validation::{BarcodeFormat, BarcodeValidator};
///
/// let validator = BarcodeValidator::default();
/// assert_eq!(validator.validate("123456789").unwrap(), BarcodeFormat::Serial);
/// assert_eq!(
///     validator.validate("%800006B3-1611180703A").unwrap(),
///     BarcodeFormat::Receipt
/// );
/// assert!(validator.validate("12 34").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct BarcodeValidator {
    serial_pattern: Regex,
}

impl BarcodeValidator {
    /// Creates a validator with a caller-supplied serial pattern.
    ///
    /// ## Errors
    /// `BarcodeError::InvalidPattern` when the pattern does not compile.
    /// Organizations edit these patterns in the dashboard, so a broken one
    /// must surface as a value, not a panic.
    pub fn new(serial_pattern: &str) -> Result<Self, BarcodeError> {
        let compiled = Regex::new(serial_pattern).map_err(|e| BarcodeError::InvalidPattern {
            pattern: serial_pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(BarcodeValidator {
            serial_pattern: compiled,
        })
    }

    /// The pattern serials are matched against.
    pub fn serial_pattern(&self) -> &str {
        self.serial_pattern.as_str()
    }

    /// Validates a raw scanned string.
    ///
    /// ## Rules (in order)
    /// 1. Empty/whitespace-only → `Empty`
    /// 2. Internal whitespace → `Malformed`
    /// 3. Trimmed length outside 4..=50 → `LengthOutOfRange`
    /// 4. `%`-prefixed → must be a receipt code (bare variant also accepted)
    /// 5. Otherwise → must match the serial pattern
    pub fn validate(&self, raw: &str) -> Result<BarcodeFormat, BarcodeError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(BarcodeError::Empty);
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(BarcodeError::Malformed {
                raw: trimmed.to_string(),
            });
        }

        let len = trimmed.chars().count();
        if !(MIN_BARCODE_LEN..=MAX_BARCODE_LEN).contains(&len) {
            return Err(BarcodeError::LengthOutOfRange {
                len,
                min: MIN_BARCODE_LEN,
                max: MAX_BARCODE_LEN,
            });
        }

        if let Some(body) = trimmed.strip_prefix('%') {
            if is_receipt_body(body) {
                return Ok(BarcodeFormat::Receipt);
            }
            return Err(BarcodeError::InvalidReceipt {
                raw: trimmed.to_string(),
            });
        }

        // Some scanner firmwares strip the % prefix from receipt codes
        if is_receipt_body(trimmed) {
            return Ok(BarcodeFormat::Receipt);
        }

        if PLACEHOLDER_SERIALS.contains(&trimmed) {
            return Err(BarcodeError::Placeholder {
                raw: trimmed.to_string(),
            });
        }

        if self.serial_pattern.is_match(trimmed) {
            return Ok(BarcodeFormat::Serial);
        }

        Err(BarcodeError::PatternMismatch {
            raw: trimmed.to_string(),
            pattern: self.serial_pattern.as_str().to_string(),
        })
    }
}

impl Default for BarcodeValidator {
    fn default() -> Self {
        BarcodeValidator::new(DEFAULT_SERIAL_PATTERN)
            .expect("default serial pattern must compile")
    }
}

// =============================================================================
// Format Helpers
// =============================================================================

/// Receipt code body: 8 hex chars, hyphen, 10 digits, optional letter.
fn is_receipt_body(s: &str) -> bool {
    if !s.is_ascii() {
        return false;
    }

    let b = s.as_bytes();
    if b.len() != 19 && b.len() != 20 {
        return false;
    }

    b[..8].iter().all(u8::is_ascii_hexdigit)
        && b[8] == b'-'
        && b[9..19].iter().all(u8::is_ascii_digit)
        && (b.len() == 19 || b[19].is_ascii_alphabetic())
}

/// True for exactly nine ASCII digits.
///
/// The unassigned-asset policy (catalog-miss commits) is gated on this fixed
/// form, independent of whatever serial pattern the organization configured.
pub fn is_nine_digit_serial(s: &str) -> bool {
    s.len() == 9 && s.bytes().all(|b| b.is_ascii_digit())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_have_distinct_reasons() {
        let v = BarcodeValidator::default();

        assert_eq!(v.validate(""), Err(BarcodeError::Empty));
        assert_eq!(v.validate("   "), Err(BarcodeError::Empty));
        assert!(matches!(
            v.validate("12 34"),
            Err(BarcodeError::Malformed { .. })
        ));
        assert!(matches!(
            v.validate("12"),
            Err(BarcodeError::LengthOutOfRange { len: 2, .. })
        ));

        let too_long = "1".repeat(51);
        assert!(matches!(
            v.validate(&too_long),
            Err(BarcodeError::LengthOutOfRange { len: 51, .. })
        ));
    }

    #[test]
    fn test_valid_serial() {
        let v = BarcodeValidator::default();
        assert_eq!(v.validate("123456789").unwrap(), BarcodeFormat::Serial);
        assert_eq!(v.validate("  987654321  ").unwrap(), BarcodeFormat::Serial);
    }

    #[test]
    fn test_valid_receipt_formats() {
        let v = BarcodeValidator::default();

        // Canonical, with trailing letter
        assert_eq!(
            v.validate("%800006B3-1611180703A").unwrap(),
            BarcodeFormat::Receipt
        );
        // Lowercase hex, no trailing letter
        assert_eq!(
            v.validate("%800005ca-1579809606").unwrap(),
            BarcodeFormat::Receipt
        );
        // Prefix stripped by scanner firmware
        assert_eq!(
            v.validate("800006B3-1611180703A").unwrap(),
            BarcodeFormat::Receipt
        );
    }

    #[test]
    fn test_invalid_receipt() {
        let v = BarcodeValidator::default();

        // % prefix forces the receipt format - no serial fallback
        assert!(matches!(
            v.validate("%123456789"),
            Err(BarcodeError::InvalidReceipt { .. })
        ));
        // Non-hex prefix block
        assert!(matches!(
            v.validate("%ZZ0006B3-1611180703A"),
            Err(BarcodeError::InvalidReceipt { .. })
        ));
        // Too few digits after the hyphen
        assert!(matches!(
            v.validate("%800006B3-16111807A"),
            Err(BarcodeError::InvalidReceipt { .. })
        ));
    }

    #[test]
    fn test_pattern_mismatch() {
        let v = BarcodeValidator::default();
        assert!(matches!(
            v.validate("12345678"), // 8 digits, not 9
            Err(BarcodeError::PatternMismatch { .. })
        ));
        assert!(matches!(
            v.validate("12345678X"),
            Err(BarcodeError::PatternMismatch { .. })
        ));
    }

    #[test]
    fn test_placeholder_serial_rejected() {
        let v = BarcodeValidator::default();
        assert!(matches!(
            v.validate("000000000"),
            Err(BarcodeError::Placeholder { .. })
        ));
    }

    #[test]
    fn test_custom_serial_pattern() {
        let v = BarcodeValidator::new("^CYL-[0-9]{6}$").unwrap();
        assert_eq!(v.validate("CYL-001234").unwrap(), BarcodeFormat::Serial);
        assert!(v.validate("123456789").is_err());

        // Receipt codes stay valid under any serial pattern
        assert_eq!(
            v.validate("%800006B3-1611180703A").unwrap(),
            BarcodeFormat::Receipt
        );
    }

    #[test]
    fn test_invalid_pattern_is_an_error_not_a_panic() {
        assert!(matches!(
            BarcodeValidator::new("^[0-9{9}$"),
            Err(BarcodeError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_nine_digit_gate() {
        assert!(is_nine_digit_serial("123456789"));
        assert!(!is_nine_digit_serial("12345678"));
        assert!(!is_nine_digit_serial("1234567890"));
        assert!(!is_nine_digit_serial("12345678X"));
    }
}
