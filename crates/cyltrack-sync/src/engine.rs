//! # Sync Engine
//!
//! Drains the durable operation queue against the remote store.
//!
//! ## Sync Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         sync_all()                                      │
//! │                                                                         │
//! │  offline? ──────────────────────────► zero-work report, no errors      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  list_unsynced()  (insertion order)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  group into LANES by barcode/entity:                                   │
//! │                                                                         │
//! │    lane "123456789": [scan #1, cylinder_update #4]   ─┐                │
//! │    lane "987654321": [scan #2]                        ├─ concurrent    │
//! │    lane "c-17":      [customer_update #3]            ─┘                │
//! │                                                                         │
//! │  within a lane: strictly sequential, stop on first failure             │
//! │  (operations for one barcode sync in enqueue order; a failed lane      │
//! │   keeps its tail pending rather than reordering on retry)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  per operation: dispatch by payload kind                               │
//! │    scan            → exists_scan? skip : insert_scan (+status side     │
//! │                      effect for custody actions, best effort)          │
//! │    cylinder_update → upsert                                            │
//! │    customer_update → upsert                                            │
//! │    rental_update   → upsert                                            │
//! │       │                                                                 │
//! │       ├── Ok  → mark_synced immediately (siblings may still fail)      │
//! │       └── Err → collect {operation_id, error}; row stays pending       │
//! │                                                                         │
//! │  Nothing throws past sync_all: partial success is the normal case.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use cyltrack_core::{OperationPayload, QueuedOperation, SyncFailure, SyncReport};
use cyltrack_db::Database;

use crate::connectivity::ConnectivityMonitor;
use crate::error::SyncResult;
use crate::remote::{RemoteError, RemoteStore, ScanRow};

// =============================================================================
// Sync Engine
// =============================================================================

/// Reconciles pending queue operations with the remote store.
///
/// Holds its collaborators by handle - no global state, so tests construct
/// isolated instances freely. The engine only reads and flips queue rows;
/// it never touches session ScanRecords.
pub struct SyncEngine<R: RemoteStore> {
    db: Database,
    remote: Arc<R>,
    connectivity: ConnectivityMonitor,
    batch_size: usize,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(
        db: Database,
        remote: Arc<R>,
        connectivity: ConnectivityMonitor,
        batch_size: usize,
    ) -> Self {
        SyncEngine {
            db,
            remote,
            connectivity,
            batch_size: batch_size.max(1),
        }
    }

    /// Drains every pending operation it can.
    ///
    /// Offline is a zero-work result, not an error. Per-operation failures
    /// land in the report; the operations stay pending for the next pass.
    pub async fn sync_all(&self) -> SyncResult<SyncReport> {
        if !self.connectivity.is_online() {
            debug!("Offline, skipping sync pass");
            return Ok(SyncReport::skipped_offline());
        }

        let ops = self.db.operations().list_unsynced().await?;
        if ops.is_empty() {
            debug!("No pending operations");
            return Ok(SyncReport::default());
        }

        info!(pending = ops.len(), "Starting sync pass");

        let mut report = SyncReport::default();
        let mut failed_lanes: Vec<String> = Vec::new();

        for chunk in ops.chunks(self.batch_size) {
            // Insertion order within each lane is preserved because the
            // source list is seq-ordered.
            let mut lanes: Vec<(String, Vec<&QueuedOperation>)> = Vec::new();
            for op in chunk {
                let lane = op.payload.lane();
                if failed_lanes.iter().any(|l| l == lane) {
                    // An earlier operation for this key failed; its
                    // successors wait so retries replay in order.
                    continue;
                }
                match lanes.iter_mut().find(|(key, _)| key == lane) {
                    Some((_, ops)) => ops.push(op),
                    None => lanes.push((lane.to_string(), vec![op])),
                }
            }

            let results = join_all(
                lanes
                    .into_iter()
                    .map(|(key, ops)| self.drain_lane(key, ops)),
            )
            .await;

            for outcome in results {
                report.attempted += outcome.attempted;
                report.synced += outcome.synced;
                report.failed += outcome.failures.len() as u64;
                report.failures.extend(outcome.failures);
                if let Some(lane) = outcome.failed_lane {
                    failed_lanes.push(lane);
                }
            }
        }

        info!(
            attempted = report.attempted,
            synced = report.synced,
            failed = report.failed,
            "Sync pass finished"
        );

        Ok(report)
    }

    /// Delivers one lane sequentially; stops at the first failure so the
    /// lane's remaining operations retry in their original order.
    async fn drain_lane(&self, lane: String, ops: Vec<&QueuedOperation>) -> LaneOutcome {
        let mut outcome = LaneOutcome::default();

        for op in ops {
            outcome.attempted += 1;

            match self.dispatch(op).await {
                Ok(()) => {
                    outcome.synced += 1;

                    // Acknowledged operations are marked immediately, even
                    // if siblings in this pass fail afterwards.
                    if let Err(e) = self.db.operations().mark_synced(&[op.id.clone()]).await {
                        // The remote write landed; re-delivery is safe
                        // thanks to the existence check.
                        warn!(id = %op.id, error = %e, "Failed to mark operation synced");
                    }
                }
                Err(e) => {
                    warn!(
                        id = %op.id,
                        op_type = %op.kind(),
                        lane = %lane,
                        error = %e,
                        "Operation failed, will retry on next pass"
                    );
                    outcome.failures.push(SyncFailure {
                        operation_id: op.id.clone(),
                        error: e.to_string(),
                    });
                    outcome.failed_lane = Some(lane);
                    break;
                }
            }
        }

        outcome
    }

    /// Dispatches one operation to the matching remote write.
    async fn dispatch(&self, op: &QueuedOperation) -> Result<(), RemoteError> {
        match &op.payload {
            OperationPayload::Scan(scan) => {
                let mode = scan.action.wire_mode();

                // Idempotency gate: a retried delivery must not produce a
                // second remote row for the same scan.
                let exists = self
                    .remote
                    .exists_scan(&op.organization_id, &scan.order_ref, &scan.barcode, mode)
                    .await?;

                if exists {
                    debug!(
                        barcode = %scan.barcode,
                        mode,
                        "Remote scan row already present, skipping insert"
                    );
                } else {
                    let row = ScanRow {
                        organization_id: op.organization_id.clone(),
                        barcode: scan.barcode.clone(),
                        mode: mode.to_string(),
                        order_ref: scan.order_ref.clone(),
                        location: scan.location.clone(),
                        customer_id: scan.customer_id.clone(),
                        customer_name: scan.customer_name.clone(),
                        notes: scan.notes.clone(),
                        user_id: op.user_id.clone(),
                        timestamp_ms: op.timestamp_ms,
                        unassigned_asset: scan.unassigned_asset,
                    };
                    self.remote.insert_scan(&row).await?;
                }

                // Custody scans imply a cylinder status change. Best effort:
                // the scan row is the authoritative record either way.
                if let Some(status) = scan.action.implied_status() {
                    if let Err(e) = self
                        .remote
                        .set_cylinder_status(&op.organization_id, &scan.barcode, status)
                        .await
                    {
                        warn!(
                            barcode = %scan.barcode,
                            status,
                            error = %e,
                            "Could not update cylinder status"
                        );
                    }
                }

                Ok(())
            }

            OperationPayload::CylinderUpdate(update) => {
                self.remote.update_cylinder(&op.organization_id, update).await
            }

            OperationPayload::CustomerUpdate(update) => {
                self.remote.update_customer(&op.organization_id, update).await
            }

            OperationPayload::RentalUpdate(update) => {
                self.remote.update_rental(&op.organization_id, update).await
            }
        }
    }
}

#[derive(Default)]
struct LaneOutcome {
    attempted: u64,
    synced: u64,
    failures: Vec<SyncFailure>,
    failed_lane: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
