//! # Remote Store Contracts
//!
//! Traits and types describing what the scan pipeline needs from the remote
//! relational store. The store itself (schema, business rules, transport)
//! is an external collaborator: the application layer provides the
//! implementation, tests provide scripted fakes.
//!
//! ## Write Idempotency Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Idempotent Scan Insert                                 │
//! │                                                                         │
//! │  The queue delivers at-least-once, so every remote write must be       │
//! │  safe to repeat:                                                        │
//! │                                                                         │
//! │  exists_scan(org, order_ref, barcode, mode)?                           │
//! │       │                                                                 │
//! │       ├── true  → skip insert (a previous attempt already landed)      │
//! │       │                                                                 │
//! │       └── false → insert_scan(row)                                     │
//! │                                                                         │
//! │  Updates (cylinder/customer/rental) are upserts and inherently safe.   │
//! │  The order retag is scoped to rows still carrying the provisional      │
//! │  identifier, so repeating it is a no-op.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cyltrack_core::{CustomerUpdate, CylinderUpdate, ItemDetails, RentalUpdate};

// =============================================================================
// Remote Error
// =============================================================================

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Transport-level failure: network down, timeout, server unreachable.
    /// The operation stays pending and is retried on the next sync pass.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The store accepted the connection but refused the request
    /// (constraint violation, permission, malformed row).
    #[error("remote rejected request: {0}")]
    Rejected(String),
}

impl RemoteError {
    /// True when retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_))
    }
}

// =============================================================================
// Catalog Lookup
// =============================================================================

/// Result of looking a barcode up in the authoritative catalog.
///
/// `NotFound` is a domain decision point, not an error: depending on format
/// and flow the scan may still commit as an unassigned asset.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogHit {
    Found(ItemDetails),
    NotFound,
}

// =============================================================================
// Scan Row
// =============================================================================

/// One remote scan row, assembled from a queued scan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRow {
    pub organization_id: String,
    pub barcode: String,
    /// Wire mode (SHIP/RETURN/LOCATE/FILL), see `ScanAction::wire_mode`.
    pub mode: String,
    /// Provisional session id until submit retags it to the order number.
    pub order_ref: String,
    pub location: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub user_id: String,
    pub timestamp_ms: i64,
    pub unassigned_asset: bool,
}

// =============================================================================
// Remote Store Trait
// =============================================================================

/// The remote store as the scan pipeline sees it: an opaque
/// idempotent-write service plus a catalog lookup.
///
/// All methods are object-safe so application code can hand the pipeline a
/// `dyn RemoteStore` behind an `Arc`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Looks a barcode up in the organization's catalog.
    async fn find_by_barcode(
        &self,
        organization_id: &str,
        barcode: &str,
    ) -> Result<CatalogHit, RemoteError>;

    /// Inserts one scan row.
    async fn insert_scan(&self, row: &ScanRow) -> Result<(), RemoteError>;

    /// True if a scan row with this dedup tuple already exists.
    async fn exists_scan(
        &self,
        organization_id: &str,
        order_ref: &str,
        barcode: &str,
        mode: &str,
    ) -> Result<bool, RemoteError>;

    /// Upserts a cylinder row.
    async fn update_cylinder(
        &self,
        organization_id: &str,
        update: &CylinderUpdate,
    ) -> Result<(), RemoteError>;

    /// Upserts a customer row.
    async fn update_customer(
        &self,
        organization_id: &str,
        update: &CustomerUpdate,
    ) -> Result<(), RemoteError>;

    /// Upserts a rental row.
    async fn update_rental(
        &self,
        organization_id: &str,
        update: &RentalUpdate,
    ) -> Result<(), RemoteError>;

    /// Sets a cylinder's status (e.g. returned bottles become `empty`).
    /// Best-effort side channel of custody scans.
    async fn set_cylinder_status(
        &self,
        organization_id: &str,
        barcode: &str,
        status: &str,
    ) -> Result<(), RemoteError>;

    /// Retags scan rows from a provisional identifier to the final order
    /// number.
    ///
    /// MUST be restricted to rows still carrying `from_ref` (never a
    /// broader `IS NULL`-style match), so historical rows sharing a barcode
    /// are left untouched. Returns the number of rows retagged.
    async fn update_order_number(
        &self,
        organization_id: &str,
        barcodes: &[String],
        from_ref: &str,
        to_ref: &str,
    ) -> Result<u64, RemoteError>;
}
