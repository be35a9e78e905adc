//! # Session Ledger
//!
//! Per-session duplicate suppression and scan-record bookkeeping.
//!
//! ## Scan Attempt State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Scan Attempt (after debounce)                    │
//! │                                                                         │
//! │  SUBMITTED barcode + current action                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  (barcode, action) already in key set?                                  │
//! │       │                                                                 │
//! │       ├── yes → DUPLICATE: bump counter, nothing else mutates          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  record exists for barcode under a DIFFERENT action?                    │
//! │       │                                                                 │
//! │       ├── yes → ACTION_SWITCH: swap dedup key, mutate the existing     │
//! │       │         record's action/timestamp in place. No new record.     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RESERVED: key inserted synchronously, BEFORE any await point.         │
//! │  The async catalog check runs afterwards; a second detection of the    │
//! │  same code during that await hits the key and reports DUPLICATE.       │
//! │       │                                                                 │
//! │       ├── catalog ok / policy commit → commit(record)                  │
//! │       └── hard rejection            → release(barcode, action)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ledger is owned exclusively by the session controller; records are
//! indexed by barcode for O(1) action switches instead of list splicing.

use std::collections::{HashMap, HashSet};

use crate::error::{CoreError, CoreResult};
use crate::types::{ScanAction, ScanRecord};

// =============================================================================
// Dedup Key
// =============================================================================

/// The `(barcode, action)` pair that identifies a live scan in a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub barcode: String,
    pub action: ScanAction,
}

impl DedupKey {
    pub fn new(barcode: impl Into<String>, action: ScanAction) -> Self {
        DedupKey {
            barcode: barcode.into(),
            action,
        }
    }
}

// =============================================================================
// Admission
// =============================================================================

/// Outcome of admitting a validated barcode into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Same barcode + action already committed (or reserved) this session.
    /// Informational, not an error: a counter bumps, nothing else mutates.
    Duplicate,

    /// Same barcode was committed under a different action; the existing
    /// record was retargeted in place. No new record, no new queue write
    /// needed for the ledger itself.
    ActionSwitched { previous: ScanAction },

    /// First sighting: the dedup key is now reserved. The caller performs
    /// the async catalog check and then either `commit`s or `release`s.
    Reserved,
}

// =============================================================================
// Session Ledger
// =============================================================================

/// Session-scoped dedup key set + barcode-indexed ScanRecord map.
///
/// ## Invariant
/// At most one live record per barcode; its `(barcode, action)` key is
/// always present in the key set. Reserved keys may exist without a record
/// while a first-time commit awaits its catalog check.
///
/// Ephemeral by design: cleared on explicit batch clear or session end,
/// never persisted.
#[derive(Debug, Default)]
pub struct SessionLedger {
    keys: HashSet<DedupKey>,
    records: HashMap<String, ScanRecord>,
    duplicates: u64,
}

impl SessionLedger {
    pub fn new() -> Self {
        SessionLedger::default()
    }

    /// Admits a validated barcode under the given action.
    ///
    /// Synchronous by contract: the key reservation must land in the same
    /// scheduler tick as the decision, before any await boundary, so two
    /// near-simultaneous detections of one code cannot both pass.
    pub fn admit(&mut self, barcode: &str, action: ScanAction, now_ms: i64) -> Admission {
        let key = DedupKey::new(barcode, action);

        if self.keys.contains(&key) {
            self.duplicates += 1;
            return Admission::Duplicate;
        }

        if let Some(record) = self.records.get_mut(barcode) {
            // Same barcode, different action: replace, don't duplicate
            let previous = record.action;
            record.action = action;
            record.timestamp_ms = now_ms;

            self.keys.remove(&DedupKey::new(barcode, previous));
            self.keys.insert(key);

            return Admission::ActionSwitched { previous };
        }

        self.keys.insert(key);
        Admission::Reserved
    }

    /// Finalizes a reservation with its record.
    ///
    /// ## Errors
    /// `CoreError::NotReserved` when no reservation exists for the record's
    /// `(barcode, action)` - the caller skipped `admit` or already released.
    pub fn commit(&mut self, record: ScanRecord) -> CoreResult<()> {
        let key = DedupKey::new(record.barcode.as_str(), record.action);
        if !self.keys.contains(&key) {
            return Err(CoreError::NotReserved {
                barcode: record.barcode.clone(),
                action: record.action.to_string(),
            });
        }

        // An interleaved action switch can leave an older record for this
        // barcode under another key; the newest commit wins.
        if let Some(previous) = self.records.insert(record.barcode.clone(), record) {
            let stale = DedupKey::new(previous.barcode.as_str(), previous.action);
            if stale != key {
                self.keys.remove(&stale);
            }
        }

        Ok(())
    }

    /// Revokes a reservation that will not become a record (hard rejection
    /// after the catalog check). A no-op if the key already backs a
    /// committed record.
    pub fn release(&mut self, barcode: &str, action: ScanAction) {
        if self.records.get(barcode).map(|r| r.action) == Some(action) {
            return;
        }
        self.keys.remove(&DedupKey::new(barcode, action));
    }

    /// Explicit user removal of a scanned barcode.
    ///
    /// Also revokes the dedup reservation, so the same barcode can be
    /// legitimately re-scanned afterwards.
    pub fn remove(&mut self, barcode: &str) -> Option<ScanRecord> {
        let record = self.records.remove(barcode)?;
        self.keys.remove(&DedupKey::new(barcode, record.action));
        Some(record)
    }

    /// Clears the batch: key set, records and counters.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.records.clear();
        self.duplicates = 0;
    }

    /// Record for a barcode, if committed.
    pub fn get(&self, barcode: &str) -> Option<&ScanRecord> {
        self.records.get(barcode)
    }

    /// Marks a record as synced after its queue operation is acknowledged.
    pub fn mark_synced(&mut self, barcode: &str) {
        if let Some(record) = self.records.get_mut(barcode) {
            record.synced = true;
        }
    }

    /// Retags records from a provisional identifier to a final one.
    ///
    /// Restricted to records still carrying `from` - the local mirror of
    /// the scoped remote retag. Returns how many records changed.
    pub fn retag(&mut self, from: &str, to: &str) -> usize {
        let mut changed = 0;
        for record in self.records.values_mut() {
            if record.order_ref == from {
                record.order_ref = to.to_string();
                changed += 1;
            }
        }
        changed
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Committed records for one action (the UI counters).
    pub fn count(&self, action: ScanAction) -> usize {
        self.records.values().filter(|r| r.action == action).count()
    }

    /// Duplicate attempts seen this session.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Records ordered by detection time.
    pub fn records_by_time(&self) -> Vec<&ScanRecord> {
        let mut records: Vec<&ScanRecord> = self.records.values().collect();
        records.sort_by_key(|r| r.timestamp_ms);
        records
    }

    /// Barcodes of all committed records.
    pub fn barcodes(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_scan(ledger: &mut SessionLedger, barcode: &str, action: ScanAction, at: i64) {
        assert_eq!(ledger.admit(barcode, action, at), Admission::Reserved);
        ledger
            .commit(ScanRecord::new(barcode, action, "session-1", at))
            .unwrap();
    }

    #[test]
    fn test_duplicate_same_action() {
        let mut ledger = SessionLedger::new();
        commit_scan(&mut ledger, "123456789", ScanAction::Out, 1000);

        assert_eq!(
            ledger.admit("123456789", ScanAction::Out, 2000),
            Admission::Duplicate
        );
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.duplicates(), 1);
    }

    #[test]
    fn test_action_switch_mutates_in_place() {
        let mut ledger = SessionLedger::new();
        commit_scan(&mut ledger, "123456789", ScanAction::Out, 1000);
        let original_id = ledger.get("123456789").unwrap().id.clone();

        assert_eq!(
            ledger.admit("123456789", ScanAction::In, 5000),
            Admission::ActionSwitched {
                previous: ScanAction::Out
            }
        );

        // One record, same identity, new action and timestamp
        assert_eq!(ledger.len(), 1);
        let record = ledger.get("123456789").unwrap();
        assert_eq!(record.id, original_id);
        assert_eq!(record.action, ScanAction::In);
        assert_eq!(record.timestamp_ms, 5000);

        // The old key is gone, the new one is live
        assert_eq!(
            ledger.admit("123456789", ScanAction::In, 6000),
            Admission::Duplicate
        );
        assert_eq!(
            ledger.admit("123456789", ScanAction::Out, 7000),
            Admission::ActionSwitched {
                previous: ScanAction::In
            }
        );
    }

    #[test]
    fn test_reservation_closes_double_scan_race() {
        let mut ledger = SessionLedger::new();

        // First detection reserves before its async catalog check resolves
        assert_eq!(
            ledger.admit("123456789", ScanAction::Out, 1000),
            Admission::Reserved
        );
        // Interleaved second detection of the same code
        assert_eq!(
            ledger.admit("123456789", ScanAction::Out, 1001),
            Admission::Duplicate
        );

        // The first commit then lands normally
        ledger
            .commit(ScanRecord::new("123456789", ScanAction::Out, "session-1", 1000))
            .unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_commit_without_reservation_fails() {
        let mut ledger = SessionLedger::new();
        let record = ScanRecord::new("123456789", ScanAction::Out, "session-1", 1000);
        assert!(ledger.commit(record).is_err());
    }

    #[test]
    fn test_release_revokes_reservation() {
        let mut ledger = SessionLedger::new();

        assert_eq!(
            ledger.admit("123456789", ScanAction::Out, 1000),
            Admission::Reserved
        );
        // Catalog check came back as a hard rejection
        ledger.release("123456789", ScanAction::Out);

        // The code may be scanned again
        assert_eq!(
            ledger.admit("123456789", ScanAction::Out, 2000),
            Admission::Reserved
        );
    }

    #[test]
    fn test_release_keeps_committed_records() {
        let mut ledger = SessionLedger::new();
        commit_scan(&mut ledger, "123456789", ScanAction::Out, 1000);

        ledger.release("123456789", ScanAction::Out);

        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.admit("123456789", ScanAction::Out, 2000),
            Admission::Duplicate
        );
    }

    #[test]
    fn test_user_removal_revokes_dedup() {
        let mut ledger = SessionLedger::new();
        commit_scan(&mut ledger, "123456789", ScanAction::Out, 1000);

        let removed = ledger.remove("123456789").unwrap();
        assert_eq!(removed.barcode, "123456789");
        assert!(ledger.is_empty());

        // Re-scan after removal is legitimate, not a duplicate
        assert_eq!(
            ledger.admit("123456789", ScanAction::Out, 2000),
            Admission::Reserved
        );
    }

    #[test]
    fn test_counters_per_action() {
        let mut ledger = SessionLedger::new();
        commit_scan(&mut ledger, "111111111", ScanAction::Out, 1000);
        commit_scan(&mut ledger, "222222222", ScanAction::Out, 1100);
        commit_scan(&mut ledger, "333333333", ScanAction::In, 1200);

        assert_eq!(ledger.count(ScanAction::Out), 2);
        assert_eq!(ledger.count(ScanAction::In), 1);
        assert_eq!(ledger.count(ScanAction::Fill), 0);

        // Switch drains one counter into the other
        ledger.admit("222222222", ScanAction::In, 1300);
        assert_eq!(ledger.count(ScanAction::Out), 1);
        assert_eq!(ledger.count(ScanAction::In), 2);
    }

    #[test]
    fn test_retag_is_scoped() {
        let mut ledger = SessionLedger::new();
        commit_scan(&mut ledger, "111111111", ScanAction::Out, 1000);

        // A record already carrying a final order number must not change
        ledger.admit("999999999", ScanAction::Out, 1100);
        let mut foreign = ScanRecord::new("999999999", ScanAction::Out, "ORD-OLD", 1100);
        foreign.synced = true;
        ledger.commit(foreign).unwrap();

        let changed = ledger.retag("session-1", "ORD-123");
        assert_eq!(changed, 1);
        assert_eq!(ledger.get("111111111").unwrap().order_ref, "ORD-123");
        assert_eq!(ledger.get("999999999").unwrap().order_ref, "ORD-OLD");
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut ledger = SessionLedger::new();
        commit_scan(&mut ledger, "111111111", ScanAction::Out, 1000);
        ledger.admit("111111111", ScanAction::Out, 1100);
        assert_eq!(ledger.duplicates(), 1);

        ledger.clear();

        assert!(ledger.is_empty());
        assert_eq!(ledger.duplicates(), 0);
        assert_eq!(
            ledger.admit("111111111", ScanAction::Out, 2000),
            Admission::Reserved
        );
    }

    #[test]
    fn test_records_by_time_ordering() {
        let mut ledger = SessionLedger::new();
        commit_scan(&mut ledger, "333333333", ScanAction::Out, 3000);
        commit_scan(&mut ledger, "111111111", ScanAction::Out, 1000);
        commit_scan(&mut ledger, "222222222", ScanAction::Out, 2000);

        let ordered: Vec<&str> = ledger
            .records_by_time()
            .iter()
            .map(|r| r.barcode.as_str())
            .collect();
        assert_eq!(ordered, vec!["111111111", "222222222", "333333333"]);
    }
}
