//! # cyltrack-core: Pure Scan-Pipeline Logic for CylTrack
//!
//! This crate is the **heart** of the CylTrack scan pipeline. Every decision
//! a scanning session makes before touching storage or the network lives
//! here, as pure functions and state machines with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CylTrack Scan Pipeline                           │
//! │                                                                         │
//! │  Camera / manual entry (scanner app, external)                         │
//! │       │ raw barcode string                                              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ cyltrack-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ validation│  │ debounce  │  │   dedup   │  │   │
//! │  │   │ ScanRecord│  │  formats  │  │  window + │  │  session  │  │   │
//! │  │   │ Operation │  │  serial   │  │   hold    │  │  ledger   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO CLOCKS                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cyltrack-db (durable operation queue)  →  cyltrack-sync (remote)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (ScanRecord, QueuedOperation, SyncReport, ...)
//! - [`error`] - Domain error types
//! - [`validation`] - Barcode format validation
//! - [`debounce`] - Camera-noise suppression state machine
//! - [`dedup`] - Per-session duplicate/action-switch ledger
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic - same input =
//!    same output. Time enters as an epoch-milliseconds argument.
//! 2. **No I/O**: database, network, camera and clock access are FORBIDDEN
//!    here. The session controller in `cyltrack-sync` drives the timers.
//! 3. **Explicit Outcomes**: rejected scans, duplicates and action switches
//!    are values, never exceptions.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod debounce;
pub mod dedup;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use cyltrack_core::ScanRecord` instead of
// `use cyltrack_core::types::ScanRecord`

pub use debounce::{DebounceConfig, DebounceDecision, ScanDebouncer};
pub use dedup::{Admission, DedupKey, SessionLedger};
pub use error::{BarcodeError, CoreError, CoreResult};
pub use types::*;
pub use validation::{is_nine_digit_serial, BarcodeFormat, BarcodeValidator};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum accepted barcode length (after trimming).
pub const MIN_BARCODE_LEN: usize = 4;

/// Maximum accepted barcode length (after trimming).
///
/// ## Business Reason
/// Longest symbology the fleet scanners emit is well under this; anything
/// longer is a misread of adjacent labels.
pub const MAX_BARCODE_LEN: usize = 50;

/// Default debounce window in milliseconds.
///
/// Repeated camera detections of the same barcode inside this window are
/// collapsed into one event.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 2000;

/// Default stability hold in milliseconds.
///
/// A code must be seen continuously for this long before it is committed,
/// which filters single-frame misreads.
pub const DEFAULT_STABILITY_HOLD_MS: u64 = 300;

/// Default serial-number pattern: exactly nine digits.
///
/// Organizations can override this via scanner configuration; the
/// unassigned-asset policy always uses the nine-digit form regardless.
pub const DEFAULT_SERIAL_PATTERN: &str = "^[0-9]{9}$";
