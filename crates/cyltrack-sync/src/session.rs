//! # Scan Session Controller
//!
//! Owns the lifecycle of one scanning-screen session: the scan loop state
//! machine, the session ledger and debouncer, the queue writes for
//! committed scans, and the submit-order reconciliation step.
//!
//! ## Session State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Lifecycle                                  │
//! │                                                                         │
//! │        open()                      submit_order()                       │
//! │  IDLE ───────► SCANNING ─────────────► SUBMITTING ────► SUBMITTED      │
//! │    ▲              │  ▲                    │    ▲                        │
//! │    │              │  │                    └────┘                        │
//! │    │   detection  │  │ always returns      retry after partial         │
//! │    │   ┌──────────┘  │ to SCANNING         failure / offline           │
//! │    │   ▼             │                                                  │
//! │    │  COMMIT / REJECT / DUPLICATE / ACTION_SWITCH                      │
//! │    │                                                                    │
//! │    └── close(): teardown cancels debounce timers; committed records    │
//! │        and queued operations are NOT discarded                         │
//! │                                                                         │
//! │  clear_batch(): explicit user action, wipes ledger + starts a fresh    │
//! │  provisional session id                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Interleaving Model
//! Everything here runs on one logical thread; the only suspension points
//! are the catalog lookup, the durable queue append and the sync dispatch.
//! The dedup key reservation happens synchronously in `admit_code` *before*
//! the catalog await, which closes the race where two near-simultaneous
//! detections of the same code both pass the check.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cyltrack_core::{
    is_nine_digit_serial, Admission, BarcodeError, BarcodeValidator, DebounceDecision,
    OperationPayload, QueueStats, QueuedOperation, ScanAction, ScanDebouncer, ScanOperation,
    ScanRecord, SessionLedger, SyncReport,
};
use cyltrack_db::Database;

use crate::config::ScannerConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::remote::{CatalogHit, RemoteStore};

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle state of a scanning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Scanner screen closed.
    Idle,
    /// Camera open, detections flowing.
    Scanning,
    /// Submit requested; flush and retag in progress (retryable).
    Submitting,
    /// Order submitted; terminal for this session.
    Submitted,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Scanning => write!(f, "scanning"),
            SessionState::Submitting => write!(f, "submitting"),
            SessionState::Submitted => write!(f, "submitted"),
        }
    }
}

// =============================================================================
// Session Context
// =============================================================================

/// Who is scanning, for whom.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub organization_id: String,
    pub user_id: String,
    /// Customer attached to this session (delivery flow), if any.
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    /// Free-text location applied to commits.
    pub location: Option<String>,
    /// Operator notes applied to commits.
    pub notes: Option<String>,
}

impl SessionContext {
    pub fn new(organization_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        SessionContext {
            organization_id: organization_id.into(),
            user_id: user_id.into(),
            ..SessionContext::default()
        }
    }

    /// An active delivery context admits unknown nine-digit serials even
    /// outside the ship action.
    fn is_delivery(&self) -> bool {
        self.customer_id.is_some()
    }
}

// =============================================================================
// Feedback
// =============================================================================

/// Why a scan was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// Failed format validation; shown to the user, never queued.
    #[error(transparent)]
    Format(#[from] BarcodeError),

    /// Valid format, but the catalog does not know the barcode and the
    /// unassigned-asset policy did not admit it.
    #[error("barcode not found in catalog")]
    CatalogMiss,
}

/// Per-detection feedback for the UI layer.
///
/// Every variant returns the loop to `SCANNING`; none of these are errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanFeedback {
    /// Camera re-read noise; no feedback owed.
    Ignored,

    /// Held for the stability window. The caller schedules a timer for
    /// `ready_at_ms` and resolves it via [`ScanSessionController::fire_hold`].
    Held { ready_at_ms: u64 },

    /// Scan committed: ledger record created, operation queued.
    Committed {
        barcode: String,
        /// Admitted under the unassigned-asset policy.
        unassigned_asset: bool,
        /// Committed without catalog verification (device offline or
        /// catalog unreachable).
        offline: bool,
    },

    /// Same barcode + action already in this session.
    Duplicate { barcode: String },

    /// Existing record retargeted to a new action in place.
    ActionSwitched {
        barcode: String,
        previous: ScanAction,
    },

    /// Scan rejected; nothing was queued.
    Rejected {
        barcode: String,
        reason: RejectReason,
    },
}

// =============================================================================
// Controller
// =============================================================================

/// Orchestrates one scanning session end to end.
///
/// All collaborators arrive by handle - database, remote store and
/// connectivity are constructed once by the application and shared, so
/// tests run isolated instances without global state.
pub struct ScanSessionController<R: RemoteStore> {
    db: Database,
    remote: Arc<R>,
    engine: SyncEngine<R>,
    connectivity: ConnectivityMonitor,
    validator: BarcodeValidator,
    debouncer: ScanDebouncer,
    ledger: SessionLedger,
    context: SessionContext,
    state: SessionState,
    /// Provisional identifier carried by this session's records until
    /// submit retags them to the final order number.
    session_ref: String,
    /// Current action applied to new detections.
    action: ScanAction,
    /// Queue operations this session produced: (operation id, barcode).
    session_ops: Vec<(String, String)>,
}

impl<R: RemoteStore> ScanSessionController<R> {
    pub fn new(
        db: Database,
        remote: Arc<R>,
        connectivity: ConnectivityMonitor,
        config: &ScannerConfig,
        context: SessionContext,
    ) -> SyncResult<Self> {
        let validator = BarcodeValidator::new(&config.scan.serial_pattern)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        let engine = SyncEngine::new(
            db.clone(),
            remote.clone(),
            connectivity.clone(),
            config.sync.batch_size,
        );

        Ok(ScanSessionController {
            db,
            remote,
            engine,
            connectivity,
            validator,
            debouncer: ScanDebouncer::new(config.debounce()),
            ledger: SessionLedger::new(),
            context,
            state: SessionState::Idle,
            session_ref: new_session_ref(),
            action: ScanAction::Out,
            session_ops: Vec::new(),
        })
    }

    // =========================================================================
    // State & Accessors
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_ref(&self) -> &str {
        &self.session_ref
    }

    pub fn action(&self) -> ScanAction {
        self.action
    }

    /// Switches the action applied to subsequent detections.
    pub fn set_action(&mut self, action: ScanAction) {
        self.action = action;
    }

    /// Committed records for one action (UI counters).
    pub fn count(&self, action: ScanAction) -> usize {
        self.ledger.count(action)
    }

    /// Duplicate attempts seen this session.
    pub fn duplicates(&self) -> u64 {
        self.ledger.duplicates()
    }

    /// Session records ordered by detection time.
    pub fn records(&self) -> Vec<&ScanRecord> {
        self.ledger.records_by_time()
    }

    /// Durable queue counters (UI pending badge).
    pub async fn queue_stats(&self) -> SyncResult<QueueStats> {
        Ok(self.db.operations().stats().await?)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Camera opened: `IDLE → SCANNING`.
    pub fn open(&mut self) -> SyncResult<()> {
        if self.state != SessionState::Idle {
            return Err(self.bad_state("idle"));
        }
        info!(session_ref = %self.session_ref, "Scan session opened");
        self.state = SessionState::Scanning;
        Ok(())
    }

    /// Scanner screen closed: `SCANNING → IDLE`.
    ///
    /// Tears down debounce state (the caller cancels its hold timer).
    /// Committed records and queued operations are kept.
    pub fn close(&mut self) -> SyncResult<()> {
        match self.state {
            SessionState::Scanning => {
                self.debouncer.reset();
                self.state = SessionState::Idle;
                info!(session_ref = %self.session_ref, "Scan session closed");
                Ok(())
            }
            SessionState::Idle => Ok(()),
            _ => Err(self.bad_state("scanning")),
        }
    }

    /// Explicit "clear batch": wipes the ledger and dedup set and starts a
    /// fresh provisional session id. Queued operations stay in the durable
    /// queue untouched.
    pub fn clear_batch(&mut self) {
        info!(
            session_ref = %self.session_ref,
            records = self.ledger.len(),
            "Clearing scan batch"
        );
        self.ledger.clear();
        self.session_ops.clear();
        self.debouncer.reset();
        self.session_ref = new_session_ref();
        self.state = SessionState::Idle;
    }

    // =========================================================================
    // Scan Loop
    // =========================================================================

    /// Feeds one raw camera/manual detection through the pipeline:
    /// debounce → validation → session dedup → catalog policy → commit.
    pub async fn handle_detection(&mut self, raw: &str, now_ms: u64) -> SyncResult<ScanFeedback> {
        if self.state != SessionState::Scanning {
            return Err(self.bad_state("scanning"));
        }

        let code = raw.trim();
        if code.is_empty() {
            return Ok(ScanFeedback::Rejected {
                barcode: String::new(),
                reason: RejectReason::Format(BarcodeError::Empty),
            });
        }

        // Debounce runs BEFORE business validation: camera noise should
        // not produce rejection feedback.
        match self.debouncer.observe(code, now_ms) {
            DebounceDecision::Suppressed => Ok(ScanFeedback::Ignored),
            DebounceDecision::Armed { ready_at_ms } => Ok(ScanFeedback::Held { ready_at_ms }),
            DebounceDecision::Ready => self.admit_code(code.to_string(), now_ms).await,
        }
    }

    /// Resolves the stability-hold timer scheduled for a
    /// [`ScanFeedback::Held`] decision.
    ///
    /// Benign after teardown: once the session left `SCANNING` the
    /// debouncer was reset and nothing can commit.
    pub async fn fire_hold(&mut self, now_ms: u64) -> SyncResult<Option<ScanFeedback>> {
        if self.state != SessionState::Scanning {
            return Ok(None);
        }

        match self.debouncer.fire(now_ms) {
            Some(code) => Ok(Some(self.admit_code(code, now_ms).await?)),
            None => Ok(None),
        }
    }

    /// Explicit user removal of a scanned barcode. Revokes the dedup
    /// reservation so the code may be re-scanned.
    pub fn remove_scan(&mut self, barcode: &str) -> Option<ScanRecord> {
        let removed = self.ledger.remove(barcode);
        if removed.is_some() {
            debug!(barcode, "Scan removed by user");
        }
        removed
    }

    /// Validation, dedup and the catalog decision for one debounced code.
    async fn admit_code(&mut self, barcode: String, now_ms: u64) -> SyncResult<ScanFeedback> {
        if let Err(reason) = self.validator.validate(&barcode) {
            debug!(barcode = %barcode, %reason, "Scan rejected");
            return Ok(ScanFeedback::Rejected {
                barcode,
                reason: RejectReason::Format(reason),
            });
        }

        let action = self.action;
        let timestamp_ms = now_ms as i64;

        // Synchronous up to (and including) the key reservation.
        match self.ledger.admit(&barcode, action, timestamp_ms) {
            Admission::Duplicate => {
                debug!(barcode = %barcode, %action, "Duplicate scan");
                Ok(ScanFeedback::Duplicate { barcode })
            }

            Admission::ActionSwitched { previous } => {
                info!(barcode = %barcode, %previous, now = %action, "Action switched");
                // The ledger record mutated in place; queue the new-mode
                // row so the remote mirror converges on it too.
                self.enqueue_scan(&barcode, action, timestamp_ms, false)
                    .await?;
                Ok(ScanFeedback::ActionSwitched { barcode, previous })
            }

            Admission::Reserved => {
                // The key is held; interleaved detections of this code now
                // report Duplicate while the lookup below awaits.
                let verdict = self.catalog_verdict(&barcode, action).await;

                let (unassigned_asset, offline) = match verdict {
                    CatalogVerdict::Known => (false, false),
                    CatalogVerdict::Unassigned => (true, false),
                    CatalogVerdict::Unverified => (false, true),
                    CatalogVerdict::Rejected => {
                        self.ledger.release(&barcode, action);
                        return Ok(ScanFeedback::Rejected {
                            barcode,
                            reason: RejectReason::CatalogMiss,
                        });
                    }
                };

                let mut record = ScanRecord::new(&barcode, action, &self.session_ref, timestamp_ms);
                record.location = self.context.location.clone();
                record.customer_name = self.context.customer_name.clone();
                record.notes = self.context.notes.clone();
                record.offline = offline;
                record.unassigned_asset = unassigned_asset;

                self.ledger.commit(record)?;
                self.enqueue_scan(&barcode, action, timestamp_ms, unassigned_asset)
                    .await?;

                info!(
                    barcode = %barcode,
                    %action,
                    unassigned_asset,
                    offline,
                    "Scan committed"
                );

                Ok(ScanFeedback::Committed {
                    barcode,
                    unassigned_asset,
                    offline,
                })
            }
        }
    }

    /// First-time commits check the authoritative catalog.
    ///
    /// - `Known`: barcode found.
    /// - `Unassigned`: catalog miss admitted by policy - nine-digit serial
    ///   scanned as a ship action or inside a delivery context.
    /// - `Unverified`: device offline or catalog unreachable; the scan
    ///   commits anyway (connectivity loss never blocks the loop).
    /// - `Rejected`: catalog miss outside the policy.
    async fn catalog_verdict(&self, barcode: &str, action: ScanAction) -> CatalogVerdict {
        if !self.connectivity.is_online() {
            return CatalogVerdict::Unverified;
        }

        match self
            .remote
            .find_by_barcode(&self.context.organization_id, barcode)
            .await
        {
            Ok(CatalogHit::Found(_)) => CatalogVerdict::Known,

            Ok(CatalogHit::NotFound) => {
                let admissible = is_nine_digit_serial(barcode)
                    && (action == ScanAction::Out || self.context.is_delivery());
                if admissible {
                    CatalogVerdict::Unassigned
                } else {
                    CatalogVerdict::Rejected
                }
            }

            Err(e) => {
                warn!(barcode, error = %e, "Catalog unreachable, committing unverified");
                CatalogVerdict::Unverified
            }
        }
    }

    /// Appends the scan operation for a commit or action switch. Durable
    /// before return; syncing happens separately so a hung remote call
    /// never blocks the scanning loop.
    async fn enqueue_scan(
        &mut self,
        barcode: &str,
        action: ScanAction,
        timestamp_ms: i64,
        unassigned_asset: bool,
    ) -> SyncResult<()> {
        let order_ref = self
            .ledger
            .get(barcode)
            .map(|r| r.order_ref.clone())
            .unwrap_or_else(|| self.session_ref.clone());

        let op = QueuedOperation::new(
            OperationPayload::Scan(ScanOperation {
                barcode: barcode.to_string(),
                action,
                order_ref,
                location: self.context.location.clone(),
                customer_id: self.context.customer_id.clone(),
                customer_name: self.context.customer_name.clone(),
                notes: self.context.notes.clone(),
                unassigned_asset,
            }),
            &self.context.organization_id,
            &self.context.user_id,
            timestamp_ms,
        );

        self.db.operations().enqueue(&op).await?;
        self.session_ops.push((op.id, barcode.to_string()));
        Ok(())
    }

    // =========================================================================
    // Sync & Submit
    // =========================================================================

    /// Best-effort queue drain (reconnect handler, pull-to-sync).
    /// Scanning state is untouched; ledger synced flags are refreshed.
    pub async fn sync_now(&mut self) -> SyncResult<SyncReport> {
        let report = self.engine.sync_all().await?;
        self.refresh_synced_flags().await?;
        Ok(report)
    }

    /// Submits the session as an order.
    ///
    /// `SCANNING → SUBMITTING`, flush the queue, and only once **all** of
    /// this session's scan operations are acknowledged, retag the remote
    /// rows from the provisional session id to `order_number` (scoped to
    /// rows still carrying the provisional id). On partial failure or
    /// offline the session stays in `SUBMITTING` and the call can be
    /// retried; the retag is never issued speculatively.
    pub async fn submit_order(&mut self, order_number: &str) -> SyncResult<SyncReport> {
        match self.state {
            SessionState::Scanning | SessionState::Submitting => {}
            _ => return Err(self.bad_state("scanning or submitting")),
        }
        self.state = SessionState::Submitting;

        // Fan-out flush of everything pending
        let report = self.engine.sync_all().await?;
        self.refresh_synced_flags().await?;

        if report.offline {
            info!("Submit deferred: offline");
            return Ok(report);
        }

        let pending: HashSet<String> = self
            .db
            .operations()
            .list_unsynced()
            .await?
            .into_iter()
            .map(|op| op.id)
            .collect();

        if self
            .session_ops
            .iter()
            .any(|(op_id, _)| pending.contains(op_id))
        {
            info!(
                failed = report.failed,
                "Submit incomplete: session operations still pending"
            );
            return Ok(report);
        }

        // Every session write is acknowledged; retag is now safe.
        let barcodes: Vec<String> = self
            .ledger
            .records_by_time()
            .iter()
            .filter(|r| r.order_ref == self.session_ref)
            .map(|r| r.barcode.clone())
            .collect();

        if !barcodes.is_empty() {
            let retagged = self
                .remote
                .update_order_number(
                    &self.context.organization_id,
                    &barcodes,
                    &self.session_ref,
                    order_number,
                )
                .await?;
            info!(retagged, order_number, "Order rows retagged");
        }

        self.ledger.retag(&self.session_ref, order_number);
        self.state = SessionState::Submitted;

        info!(order_number, records = self.ledger.len(), "Order submitted");
        Ok(report)
    }

    /// Marks ledger records synced once every queue operation for their
    /// barcode has been acknowledged.
    async fn refresh_synced_flags(&mut self) -> SyncResult<()> {
        let pending: HashSet<String> = self
            .db
            .operations()
            .list_unsynced()
            .await?
            .into_iter()
            .map(|op| op.id)
            .collect();

        let mut all_acked: HashMap<&str, bool> = HashMap::new();
        for (op_id, barcode) in &self.session_ops {
            let entry = all_acked.entry(barcode.as_str()).or_insert(true);
            if pending.contains(op_id) {
                *entry = false;
            }
        }

        let synced: Vec<String> = all_acked
            .into_iter()
            .filter_map(|(barcode, acked)| acked.then(|| barcode.to_string()))
            .collect();

        for barcode in synced {
            self.ledger.mark_synced(&barcode);
        }

        Ok(())
    }

    fn bad_state(&self, expected: &str) -> SyncError {
        SyncError::InvalidSessionState {
            expected: expected.to_string(),
            actual: self.state.to_string(),
        }
    }
}

/// A fresh provisional identifier for the next batch.
fn new_session_ref() -> String {
    format!("session-{}", Uuid::new_v4())
}

/// Outcome of the first-commit catalog check.
enum CatalogVerdict {
    Known,
    Unassigned,
    Unverified,
    Rejected,
}

// =============================================================================
// Unit Tests
// =============================================================================
// State-machine behavior against a permissive stub remote; the full
// pipeline (offline flows, partial submits, retag scoping) is exercised in
// tests/session_flow.rs with a scripted remote.

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::remote::{RemoteError, ScanRow};
    use cyltrack_core::{CustomerUpdate, CylinderUpdate, ItemDetails, RentalUpdate};
    use cyltrack_db::DbConfig;

    /// Knows every barcode, accepts every write.
    struct StubRemote;

    #[async_trait]
    impl RemoteStore for StubRemote {
        async fn find_by_barcode(
            &self,
            _organization_id: &str,
            barcode: &str,
        ) -> Result<CatalogHit, RemoteError> {
            Ok(CatalogHit::Found(ItemDetails {
                barcode: barcode.to_string(),
                product_code: None,
                description: None,
                status: None,
                location: None,
            }))
        }

        async fn insert_scan(&self, _row: &ScanRow) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn exists_scan(
            &self,
            _organization_id: &str,
            _order_ref: &str,
            _barcode: &str,
            _mode: &str,
        ) -> Result<bool, RemoteError> {
            Ok(false)
        }

        async fn update_cylinder(
            &self,
            _organization_id: &str,
            _update: &CylinderUpdate,
        ) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn update_customer(
            &self,
            _organization_id: &str,
            _update: &CustomerUpdate,
        ) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn update_rental(
            &self,
            _organization_id: &str,
            _update: &RentalUpdate,
        ) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn set_cylinder_status(
            &self,
            _organization_id: &str,
            _barcode: &str,
            _status: &str,
        ) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn update_order_number(
            &self,
            _organization_id: &str,
            barcodes: &[String],
            _from_ref: &str,
            _to_ref: &str,
        ) -> Result<u64, RemoteError> {
            Ok(barcodes.len() as u64)
        }
    }

    async fn controller() -> ScanSessionController<StubRemote> {
        let db = cyltrack_db::Database::new(DbConfig::in_memory()).await.unwrap();
        ScanSessionController::new(
            db,
            Arc::new(StubRemote),
            ConnectivityMonitor::new(true),
            &ScannerConfig::default(),
            SessionContext::new("org-1", "user-1"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_detection_requires_scanning_state() {
        let mut session = controller().await;
        assert!(session.handle_detection("123456789", 0).await.is_err());

        session.open().unwrap();
        assert!(session.handle_detection("123456789", 0).await.is_ok());
    }

    #[tokio::test]
    async fn test_open_close_transitions() {
        let mut session = controller().await;
        assert_eq!(session.state(), SessionState::Idle);

        session.open().unwrap();
        assert_eq!(session.state(), SessionState::Scanning);
        assert!(session.open().is_err());

        session.close().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        // Closing an idle session is a no-op
        session.close().unwrap();
    }

    #[tokio::test]
    async fn test_held_then_fire_commits() {
        let mut session = controller().await;
        session.open().unwrap();

        let feedback = session.handle_detection("123456789", 0).await.unwrap();
        assert_eq!(feedback, ScanFeedback::Held { ready_at_ms: 300 });

        let feedback = session.fire_hold(300).await.unwrap();
        assert_eq!(
            feedback,
            Some(ScanFeedback::Committed {
                barcode: "123456789".into(),
                unassigned_asset: false,
                offline: false,
            })
        );

        assert_eq!(session.count(ScanAction::Out), 1);
        assert_eq!(session.queue_stats().await.unwrap().pending, 1);
    }

    #[tokio::test]
    async fn test_rejected_scan_is_never_queued() {
        let mut session = controller().await;
        session.open().unwrap();

        // Short code clears debounce (manual path fires immediately after
        // the hold) but fails validation
        session.handle_detection("12", 0).await.unwrap();
        let feedback = session.fire_hold(300).await.unwrap().unwrap();
        assert!(matches!(
            feedback,
            ScanFeedback::Rejected {
                reason: RejectReason::Format(BarcodeError::LengthOutOfRange { .. }),
                ..
            }
        ));

        assert_eq!(session.queue_stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_teardown_cancels_pending_hold() {
        let mut session = controller().await;
        session.open().unwrap();

        session.handle_detection("123456789", 0).await.unwrap();
        session.close().unwrap();

        // The timer fires after the screen closed: nothing commits
        assert_eq!(session.fire_hold(300).await.unwrap(), None);
        assert_eq!(session.records().len(), 0);
    }

    #[tokio::test]
    async fn test_clear_batch_starts_fresh_session() {
        let mut session = controller().await;
        session.open().unwrap();

        session.handle_detection("123456789", 0).await.unwrap();
        session.fire_hold(300).await.unwrap();
        let first_ref = session.session_ref().to_string();

        session.clear_batch();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.records().len(), 0);
        assert_ne!(session.session_ref(), first_ref);

        // Queued operations survive the clear
        assert_eq!(session.queue_stats().await.unwrap().total, 1);
    }
}
