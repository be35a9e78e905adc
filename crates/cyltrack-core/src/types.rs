//! # Domain Types
//!
//! Core domain types used throughout the CylTrack scan pipeline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ScanRecord    │   │ QueuedOperation │   │   SyncReport    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  attempted      │       │
//! │  │  barcode        │   │  payload (enum) │   │  synced/failed  │       │
//! │  │  action         │   │  org + user     │   │  failures[]     │       │
//! │  │  order_ref      │   │  synced (bool)  │   │  offline (bool) │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────────────────────────┐     │
//! │  │   ScanAction    │   │        OperationPayload                 │     │
//! │  │  ─────────────  │   │  ───────────────────────────────────    │     │
//! │  │  In             │   │  Scan(ScanOperation)                    │     │
//! │  │  Out            │   │  CylinderUpdate(CylinderUpdate)         │     │
//! │  │  Locate         │   │  CustomerUpdate(CustomerUpdate)         │     │
//! │  │  Fill           │   │  RentalUpdate(RentalUpdate)             │     │
//! │  └─────────────────┘   └─────────────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity Pattern
//! Records and operations carry a UUID v4 `id` generated locally - globally
//! unique without coordination, which is what makes offline creation safe.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

// =============================================================================
// Scan Action
// =============================================================================

/// What a scan means for the cylinder being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ScanAction {
    /// Cylinder returned to the warehouse (check in).
    In,
    /// Cylinder shipped to a customer (check out).
    Out,
    /// Location audit only - no custody change.
    Locate,
    /// Cylinder refilled.
    Fill,
}

impl ScanAction {
    /// The mode string the remote scan rows use.
    ///
    /// The remote store predates this pipeline and speaks SHIP/RETURN for
    /// the custody actions; the remaining actions pass through uppercased.
    pub fn wire_mode(&self) -> &'static str {
        match self {
            ScanAction::Out => "SHIP",
            ScanAction::In => "RETURN",
            ScanAction::Locate => "LOCATE",
            ScanAction::Fill => "FILL",
        }
    }

    /// True if this action changes cylinder custody/contents and should
    /// drive a cylinder status update after the scan row lands.
    pub fn updates_cylinder_status(&self) -> bool {
        matches!(self, ScanAction::In | ScanAction::Out)
    }

    /// Cylinder status implied by this action, if any.
    pub fn implied_status(&self) -> Option<&'static str> {
        match self {
            ScanAction::In => Some("empty"),
            ScanAction::Out => Some("rented"),
            ScanAction::Locate | ScanAction::Fill => None,
        }
    }
}

impl std::fmt::Display for ScanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanAction::In => write!(f, "in"),
            ScanAction::Out => write!(f, "out"),
            ScanAction::Locate => write!(f, "locate"),
            ScanAction::Fill => write!(f, "fill"),
        }
    }
}

impl std::str::FromStr for ScanAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" | "return" => Ok(ScanAction::In),
            "out" | "ship" => Ok(ScanAction::Out),
            "locate" => Ok(ScanAction::Locate),
            "fill" => Ok(ScanAction::Fill),
            other => Err(format!("unknown scan action: '{other}'")),
        }
    }
}

// =============================================================================
// Scan Record
// =============================================================================

/// One user-observed scan event, held locally for the life of a session.
///
/// ## Invariant
/// Within one session at most one *live* ScanRecord exists per
/// `(barcode, action)` pair; scanning the same barcode under a different
/// action mutates the existing record in place instead of duplicating it.
/// The [`crate::dedup::SessionLedger`] enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScanRecord {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Trimmed barcode as validated.
    pub barcode: String,

    /// Action in effect for this record (mutable via action switch).
    pub action: ScanAction,

    /// Detection time, epoch milliseconds.
    pub timestamp_ms: i64,

    /// Free-text location, if captured.
    pub location: Option<String>,

    /// Customer display name, if the session has one attached.
    pub customer_name: Option<String>,

    /// Operator notes.
    pub notes: Option<String>,

    /// Provisional session id until submit, then the final order number.
    pub order_ref: String,

    /// True once the matching queue operation was acknowledged remotely.
    pub synced: bool,

    /// True if the record was committed while offline (or after a failed
    /// immediate sync attempt).
    pub offline: bool,

    /// True if the barcode was absent from the catalog and admitted under
    /// the unassigned-asset policy.
    pub unassigned_asset: bool,
}

impl ScanRecord {
    /// Creates a new record with a generated id and default flags.
    pub fn new(
        barcode: impl Into<String>,
        action: ScanAction,
        order_ref: impl Into<String>,
        timestamp_ms: i64,
    ) -> Self {
        ScanRecord {
            id: Uuid::new_v4().to_string(),
            barcode: barcode.into(),
            action,
            timestamp_ms,
            location: None,
            customer_name: None,
            notes: None,
            order_ref: order_ref.into(),
            synced: false,
            offline: false,
            unassigned_asset: false,
        }
    }
}

// =============================================================================
// Operation Type
// =============================================================================

/// Discriminant of a queued operation, used for storage and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Scan,
    CylinderUpdate,
    CustomerUpdate,
    RentalUpdate,
}

impl OperationType {
    /// Stable storage string for the `op_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Scan => "scan",
            OperationType::CylinderUpdate => "cylinder_update",
            OperationType::CustomerUpdate => "customer_update",
            OperationType::RentalUpdate => "rental_update",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scan" => Ok(OperationType::Scan),
            "cylinder_update" => Ok(OperationType::CylinderUpdate),
            "customer_update" => Ok(OperationType::CustomerUpdate),
            "rental_update" => Ok(OperationType::RentalUpdate),
            other => Err(format!("unknown operation type: '{other}'")),
        }
    }
}

// =============================================================================
// Operation Payloads
// =============================================================================

/// Payload of a queued `scan` operation - one remote scan row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScanOperation {
    pub barcode: String,
    pub action: ScanAction,
    /// Provisional session id (or final order number after submit).
    pub order_ref: String,
    pub location: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    /// Committed under the unassigned-asset policy (catalog miss).
    #[serde(default)]
    pub unassigned_asset: bool,
}

/// Payload of a queued `cylinder_update` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CylinderUpdate {
    pub barcode: String,
    pub status: Option<String>,
    pub location: Option<String>,
    pub assigned_customer: Option<String>,
}

/// Payload of a queued `customer_update` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerUpdate {
    pub customer_id: String,
    pub name: Option<String>,
    pub contact_details: Option<String>,
    pub barcode: Option<String>,
}

/// Payload of a queued `rental_update` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RentalUpdate {
    pub rental_id: String,
    pub customer_id: String,
    pub barcode: String,
    pub status: Option<String>,
}

/// Tagged payload union for queued operations.
///
/// ## Why a tagged union?
/// The queue stores payloads as JSON; the tag keeps the stored form
/// self-describing while dispatch in the sync engine stays an exhaustive
/// `match` instead of ad hoc field access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationPayload {
    Scan(ScanOperation),
    CylinderUpdate(CylinderUpdate),
    CustomerUpdate(CustomerUpdate),
    RentalUpdate(RentalUpdate),
}

impl OperationPayload {
    /// The operation discriminant for storage and stats.
    pub fn kind(&self) -> OperationType {
        match self {
            OperationPayload::Scan(_) => OperationType::Scan,
            OperationPayload::CylinderUpdate(_) => OperationType::CylinderUpdate,
            OperationPayload::CustomerUpdate(_) => OperationType::CustomerUpdate,
            OperationPayload::RentalUpdate(_) => OperationType::RentalUpdate,
        }
    }

    /// Ordering lane for sync.
    ///
    /// Operations sharing a lane must be delivered in enqueue order;
    /// operations in different lanes may sync concurrently. Scans and
    /// cylinder updates are keyed by barcode, the rest by entity id.
    pub fn lane(&self) -> &str {
        match self {
            OperationPayload::Scan(op) => &op.barcode,
            OperationPayload::CylinderUpdate(op) => &op.barcode,
            OperationPayload::CustomerUpdate(op) => &op.customer_id,
            OperationPayload::RentalUpdate(op) => &op.rental_id,
        }
    }
}

// =============================================================================
// Queued Operation
// =============================================================================

/// A durable, at-least-once-delivered unit of remote work.
///
/// ## Invariant
/// Operations with `synced = false` are never silently dropped; they persist
/// across process restarts until acknowledged or explicitly cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QueuedOperation {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Typed payload (also determines `kind`).
    pub payload: OperationPayload,

    /// Organization scope for every remote write.
    pub organization_id: String,

    /// Operator that produced the operation.
    pub user_id: String,

    /// Creation time, epoch milliseconds.
    pub timestamp_ms: i64,

    /// Flipped to true on remote acknowledgment.
    pub synced: bool,
}

impl QueuedOperation {
    /// Creates a new unsynced operation with a generated id.
    pub fn new(
        payload: OperationPayload,
        organization_id: impl Into<String>,
        user_id: impl Into<String>,
        timestamp_ms: i64,
    ) -> Self {
        QueuedOperation {
            id: Uuid::new_v4().to_string(),
            payload,
            organization_id: organization_id.into(),
            user_id: user_id.into(),
            timestamp_ms,
            synced: false,
        }
    }

    /// The operation discriminant.
    #[inline]
    pub fn kind(&self) -> OperationType {
        self.payload.kind()
    }
}

// =============================================================================
// Queue Stats
// =============================================================================

/// Queue counters for UI badges and observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QueueStats {
    pub total: u64,
    pub pending: u64,
    pub synced: u64,
}

// =============================================================================
// Catalog Item
// =============================================================================

/// Catalog projection returned by the remote barcode lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemDetails {
    pub barcode: String,
    pub product_code: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
}

// =============================================================================
// Sync Report
// =============================================================================

/// Per-operation failure collected during a sync pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncFailure {
    pub operation_id: String,
    pub error: String,
}

/// Outcome of one `sync_all` pass.
///
/// Partial success is the normal case, not an error path: every acknowledged
/// operation is marked synced even when siblings in the same pass fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncReport {
    /// Operations the pass attempted to deliver.
    pub attempted: u64,

    /// Operations acknowledged and marked synced.
    pub synced: u64,

    /// Operations that failed and remain pending.
    pub failed: u64,

    /// True when the pass was skipped because the device was offline.
    pub offline: bool,

    /// One entry per failed operation.
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// Zero-work report for an offline pass.
    pub fn skipped_offline() -> Self {
        SyncReport {
            offline: true,
            ..SyncReport::default()
        }
    }

    /// True when nothing remained pending after the pass.
    pub fn is_complete(&self) -> bool {
        !self.offline && self.failed == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_mode_mapping() {
        assert_eq!(ScanAction::Out.wire_mode(), "SHIP");
        assert_eq!(ScanAction::In.wire_mode(), "RETURN");
        assert_eq!(ScanAction::Locate.wire_mode(), "LOCATE");
        assert_eq!(ScanAction::Fill.wire_mode(), "FILL");
    }

    #[test]
    fn test_action_parsing_accepts_wire_names() {
        assert_eq!("ship".parse::<ScanAction>().unwrap(), ScanAction::Out);
        assert_eq!("RETURN".parse::<ScanAction>().unwrap(), ScanAction::In);
        assert_eq!("fill".parse::<ScanAction>().unwrap(), ScanAction::Fill);
        assert!("refill".parse::<ScanAction>().is_err());
    }

    #[test]
    fn test_implied_status() {
        assert_eq!(ScanAction::In.implied_status(), Some("empty"));
        assert_eq!(ScanAction::Out.implied_status(), Some("rented"));
        assert_eq!(ScanAction::Locate.implied_status(), None);
    }

    #[test]
    fn test_payload_tag_round_trip() {
        let payload = OperationPayload::Scan(ScanOperation {
            barcode: "123456788".into(),
            action: ScanAction::Out,
            order_ref: "session-1".into(),
            location: None,
            customer_id: None,
            customer_name: None,
            notes: None,
            unassigned_asset: false,
        });

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"type\":\"scan\""));

        let back: OperationPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.kind(), OperationType::Scan);
    }

    #[test]
    fn test_lane_keys() {
        let scan = OperationPayload::Scan(ScanOperation {
            barcode: "111111111".into(),
            action: ScanAction::In,
            order_ref: "s".into(),
            location: None,
            customer_id: None,
            customer_name: None,
            notes: None,
            unassigned_asset: false,
        });
        assert_eq!(scan.lane(), "111111111");

        let rental = OperationPayload::RentalUpdate(RentalUpdate {
            rental_id: "r-9".into(),
            customer_id: "c-1".into(),
            barcode: "111111111".into(),
            status: None,
        });
        assert_eq!(rental.lane(), "r-9");
    }

    #[test]
    fn test_queued_operation_defaults() {
        let op = QueuedOperation::new(
            OperationPayload::CylinderUpdate(CylinderUpdate {
                barcode: "222222222".into(),
                status: Some("empty".into()),
                location: None,
                assigned_customer: None,
            }),
            "org-1",
            "user-1",
            1_700_000_000_000,
        );

        assert!(!op.synced);
        assert_eq!(op.kind(), OperationType::CylinderUpdate);
        assert_eq!(op.id.len(), 36);
    }

    #[test]
    fn test_operation_type_storage_round_trip() {
        for kind in [
            OperationType::Scan,
            OperationType::CylinderUpdate,
            OperationType::CustomerUpdate,
            OperationType::RentalUpdate,
        ] {
            assert_eq!(kind.as_str().parse::<OperationType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_sync_report_offline() {
        let report = SyncReport::skipped_offline();
        assert!(report.offline);
        assert_eq!(report.attempted, 0);
        assert!(!report.is_complete());
    }
}
