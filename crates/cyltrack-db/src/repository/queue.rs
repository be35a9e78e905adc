//! # Operation Queue Repository
//!
//! The durable, append-only log of pending remote writes.
//!
//! ## The Queue Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Durable Operation Queue                              │
//! │                                                                         │
//! │  COMMITTED SCAN (session controller)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  enqueue(op) ── INSERT, fsync'd ──► caller may crash NOW and the       │
//! │       │          operation is still there after restart                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  operation_queue                                                │   │
//! │  │                                                                 │   │
//! │  │  seq │ id    │ op_type         │ payload │ synced               │   │
//! │  │  ────┼───────┼─────────────────┼─────────┼────────              │   │
//! │  │  1   │ a-001 │ scan            │ {...}   │ 0                    │   │
//! │  │  2   │ a-002 │ cylinder_update │ {...}   │ 0                    │   │
//! │  │  3   │ a-003 │ scan            │ {...}   │ 1  ◄── acknowledged  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncEngine: list_unsynced (seq order) → dispatch → mark_synced        │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • synced=0 rows are never silently dropped                            │
//! │  • mark_synced is idempotent (synced rows are untouched)               │
//! │  • compaction (clear_synced) is explicit, never automatic              │
//! │  • unreadable payloads are logged and skipped, never a crash           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use cyltrack_core::{OperationPayload, QueueStats, QueuedOperation};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw row shape; payload stays JSON text until decoded.
#[derive(Debug, sqlx::FromRow)]
struct OperationRow {
    id: String,
    payload: String,
    organization_id: String,
    user_id: String,
    timestamp_ms: i64,
    synced: i64,
}

impl OperationRow {
    /// Decodes the payload column. A row that no longer deserializes is
    /// local corruption: the reader logs it and moves on (the scanning loop
    /// must not crash over one bad row).
    fn into_operation(self) -> Option<QueuedOperation> {
        match serde_json::from_str::<OperationPayload>(&self.payload) {
            Ok(payload) => Some(QueuedOperation {
                id: self.id,
                payload,
                organization_id: self.organization_id,
                user_id: self.user_id,
                timestamp_ms: self.timestamp_ms,
                synced: self.synced != 0,
            }),
            Err(e) => {
                warn!(id = %self.id, error = %e, "Skipping corrupt queue row");
                None
            }
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the durable operation queue.
///
/// The queue is the sole writer of its own storage; the sync engine only
/// reads rows and flips their synced flag through this type.
#[derive(Debug, Clone)]
pub struct OperationQueueRepository {
    pool: SqlitePool,
}

impl OperationQueueRepository {
    /// Creates a new OperationQueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OperationQueueRepository { pool }
    }

    /// Appends an operation to the queue.
    ///
    /// Durable before this returns: with FULL synchronous the INSERT is
    /// fsync'd, so a crash immediately after cannot lose the operation.
    pub async fn enqueue(&self, op: &QueuedOperation) -> DbResult<()> {
        let payload = serde_json::to_string(&op.payload)
            .map_err(|e| crate::error::DbError::Internal(e.to_string()))?;

        debug!(
            id = %op.id,
            op_type = %op.kind(),
            "Enqueuing operation"
        );

        sqlx::query(
            r#"
            INSERT INTO operation_queue (
                id, op_type, payload, organization_id, user_id, timestamp_ms, synced
            ) VALUES (?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&op.id)
        .bind(op.kind().as_str())
        .bind(&payload)
        .bind(&op.organization_id)
        .bind(&op.user_id)
        .bind(op.timestamp_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns all pending operations in insertion order.
    ///
    /// Corrupt rows are logged and skipped (treated as absent), per the
    /// local-corruption policy.
    pub async fn list_unsynced(&self) -> DbResult<Vec<QueuedOperation>> {
        let rows: Vec<OperationRow> = sqlx::query_as(
            r#"
            SELECT id, payload, organization_id, user_id, timestamp_ms, synced
            FROM operation_queue
            WHERE synced = 0
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(OperationRow::into_operation)
            .collect())
    }

    /// Marks operations as acknowledged by the remote store.
    ///
    /// Idempotent: already-synced ids are untouched, unknown ids are a
    /// no-op. Returns the number of rows actually flipped.
    pub async fn mark_synced(&self, ids: &[String]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE operation_queue SET synced = 1, synced_at = ? \
             WHERE synced = 0 AND id IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql).bind(Utc::now());
        for id in ids {
            query = query.bind(id);
        }

        let result = query.execute(&self.pool).await?;

        debug!(flipped = result.rows_affected(), "Marked operations synced");
        Ok(result.rows_affected())
    }

    /// Explicit compaction: deletes acknowledged rows.
    ///
    /// Never called automatically - the operator (or a maintenance screen)
    /// decides when history goes.
    pub async fn clear_synced(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM operation_queue WHERE synced = 1")
            .execute(&self.pool)
            .await?;

        debug!(removed = result.rows_affected(), "Cleared synced operations");
        Ok(result.rows_affected())
    }

    /// Queue counters for UI badges and observability.
    pub async fn stats(&self) -> DbResult<QueueStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operation_queue")
            .fetch_one(&self.pool)
            .await?;

        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM operation_queue WHERE synced = 0")
                .fetch_one(&self.pool)
                .await?;

        Ok(QueueStats {
            total: total as u64,
            pending: pending as u64,
            synced: (total - pending) as u64,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cyltrack_core::{CylinderUpdate, ScanAction, ScanOperation};

    fn scan_op(barcode: &str, at: i64) -> QueuedOperation {
        QueuedOperation::new(
            OperationPayload::Scan(ScanOperation {
                barcode: barcode.to_string(),
                action: ScanAction::Out,
                order_ref: "session-1".into(),
                location: None,
                customer_id: None,
                customer_name: None,
                notes: None,
                unassigned_asset: false,
            }),
            "org-1",
            "user-1",
            at,
        )
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_and_list_round_trip() {
        let db = test_db().await;
        let repo = db.operations();

        let op = scan_op("123456789", 1000);
        repo.enqueue(&op).await.unwrap();

        let pending = repo.list_unsynced().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0], op);
    }

    #[tokio::test]
    async fn test_insertion_order_preserved() {
        let db = test_db().await;
        let repo = db.operations();

        for i in 0..5 {
            repo.enqueue(&scan_op(&format!("10000000{i}"), 1000 + i))
                .await
                .unwrap();
        }

        let pending = repo.list_unsynced().await.unwrap();
        let barcodes: Vec<&str> = pending.iter().map(|op| op.payload.lane()).collect();
        assert_eq!(
            barcodes,
            vec!["100000000", "100000001", "100000002", "100000003", "100000004"]
        );
    }

    #[tokio::test]
    async fn test_mark_synced_is_idempotent() {
        let db = test_db().await;
        let repo = db.operations();

        let op = scan_op("123456789", 1000);
        repo.enqueue(&op).await.unwrap();

        let flipped = repo.mark_synced(&[op.id.clone()]).await.unwrap();
        assert_eq!(flipped, 1);

        // Second call: already synced, untouched
        let flipped = repo.mark_synced(&[op.id.clone()]).await.unwrap();
        assert_eq!(flipped, 0);

        // Unknown id: no-op
        let flipped = repo.mark_synced(&["no-such-id".into()]).await.unwrap();
        assert_eq!(flipped, 0);

        assert!(repo.list_unsynced().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_synced_only_removes_acknowledged() {
        let db = test_db().await;
        let repo = db.operations();

        let done = scan_op("111111111", 1000);
        let pending = scan_op("222222222", 1100);
        repo.enqueue(&done).await.unwrap();
        repo.enqueue(&pending).await.unwrap();
        repo.mark_synced(&[done.id.clone()]).await.unwrap();

        let removed = repo.clear_synced().await.unwrap();
        assert_eq!(removed, 1);

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.synced, 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let db = test_db().await;
        let repo = db.operations();

        let a = scan_op("111111111", 1000);
        let b = QueuedOperation::new(
            OperationPayload::CylinderUpdate(CylinderUpdate {
                barcode: "222222222".into(),
                status: Some("empty".into()),
                location: None,
                assigned_customer: None,
            }),
            "org-1",
            "user-1",
            1100,
        );
        repo.enqueue(&a).await.unwrap();
        repo.enqueue(&b).await.unwrap();
        repo.mark_synced(&[a.id.clone()]).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.synced, 1);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_skipped_not_fatal() {
        let db = test_db().await;
        let repo = db.operations();

        repo.enqueue(&scan_op("111111111", 1000)).await.unwrap();

        // Simulate on-disk corruption of one payload
        sqlx::query(
            "INSERT INTO operation_queue \
             (id, op_type, payload, organization_id, user_id, timestamp_ms, synced) \
             VALUES ('bad-row', 'scan', '{not json', 'org-1', 'user-1', 1100, 0)",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let pending = repo.list_unsynced().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload.lane(), "111111111");
    }

    #[tokio::test]
    async fn test_pending_operation_survives_restart() {
        let path = std::env::temp_dir().join(format!(
            "cyltrack-queue-test-{}.db",
            uuid::Uuid::new_v4()
        ));

        let op = scan_op("123456789", 1000);

        // First process: enqueue, then "crash" (drop the pool)
        {
            let db = Database::new(DbConfig::new(&path)).await.unwrap();
            db.operations().enqueue(&op).await.unwrap();
            db.close().await;
        }

        // Second process: reload from storage
        {
            let db = Database::new(DbConfig::new(&path)).await.unwrap();
            let pending = db.operations().list_unsynced().await.unwrap();
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].id, op.id);
            assert!(!pending[0].synced);
            db.close().await;
        }

        let _ = std::fs::remove_file(&path);
    }
}
