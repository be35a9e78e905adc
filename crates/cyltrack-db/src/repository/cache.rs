//! # Offline Cache Repository
//!
//! Per-organization read fallback for disconnected operation.
//!
//! While online, the scanner app periodically snapshots the entities it
//! needs for offline lookups (bottles, customers, active rentals) into one
//! row per organization. While offline, reads fall back to this cache.
//! The cache shares the queue database and therefore its durability
//! configuration; it is never part of the write path.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

// =============================================================================
// Snapshot
// =============================================================================

/// One organization's cached entity snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    /// Cylinder rows as fetched from the remote store.
    pub bottles: serde_json::Value,
    /// Customer rows.
    pub customers: serde_json::Value,
    /// Active rental rows.
    pub rentals: serde_json::Value,
    /// When the snapshot was taken, epoch milliseconds.
    pub last_sync_ms: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct CacheRow {
    bottles: String,
    customers: String,
    rentals: String,
    last_sync_ms: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the per-organization offline cache.
#[derive(Debug, Clone)]
pub struct OfflineCacheRepository {
    pool: SqlitePool,
}

impl OfflineCacheRepository {
    /// Creates a new OfflineCacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OfflineCacheRepository { pool }
    }

    /// Stores (or replaces) an organization's snapshot.
    pub async fn put(&self, organization_id: &str, snapshot: &CacheSnapshot) -> DbResult<()> {
        debug!(organization_id, "Caching offline snapshot");

        sqlx::query(
            r#"
            INSERT INTO offline_cache (organization_id, bottles, customers, rentals, last_sync_ms)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(organization_id) DO UPDATE SET
                bottles = excluded.bottles,
                customers = excluded.customers,
                rentals = excluded.rentals,
                last_sync_ms = excluded.last_sync_ms
            "#,
        )
        .bind(organization_id)
        .bind(snapshot.bottles.to_string())
        .bind(snapshot.customers.to_string())
        .bind(snapshot.rentals.to_string())
        .bind(snapshot.last_sync_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loads an organization's snapshot, if one exists.
    ///
    /// A snapshot with unreadable JSON is treated as absent (same policy as
    /// the queue: local corruption never crashes the scanning loop).
    pub async fn get(&self, organization_id: &str) -> DbResult<Option<CacheSnapshot>> {
        let row: Option<CacheRow> = sqlx::query_as(
            "SELECT bottles, customers, rentals, last_sync_ms \
             FROM offline_cache WHERE organization_id = ?",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let parse = |text: &str| serde_json::from_str::<serde_json::Value>(text);
        match (
            parse(&row.bottles),
            parse(&row.customers),
            parse(&row.rentals),
        ) {
            (Ok(bottles), Ok(customers), Ok(rentals)) => Ok(Some(CacheSnapshot {
                bottles,
                customers,
                rentals,
                last_sync_ms: row.last_sync_ms,
            })),
            _ => {
                tracing::warn!(organization_id, "Dropping unreadable offline cache row");
                Ok(None)
            }
        }
    }

    /// True when the snapshot is older than `max_age_ms` (or absent).
    pub async fn is_stale(
        &self,
        organization_id: &str,
        max_age_ms: i64,
        now_ms: i64,
    ) -> DbResult<bool> {
        let last_sync: Option<i64> = sqlx::query_scalar(
            "SELECT last_sync_ms FROM offline_cache WHERE organization_id = ?",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match last_sync {
            Some(at) => now_ms.saturating_sub(at) > max_age_ms,
            None => true,
        })
    }

    /// Drops an organization's snapshot (logout/reset).
    pub async fn clear(&self, organization_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM offline_cache WHERE organization_id = ?")
            .bind(organization_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    fn snapshot(at: i64) -> CacheSnapshot {
        CacheSnapshot {
            bottles: json!([{ "barcode_number": "123456789", "status": "full" }]),
            customers: json!([{ "id": "c-1", "name": "Acme Welding" }]),
            rentals: json!([]),
            last_sync_ms: at,
        }
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = db.cache();

        assert_eq!(cache.get("org-1").await.unwrap(), None);

        let snap = snapshot(1000);
        cache.put("org-1", &snap).await.unwrap();
        assert_eq!(cache.get("org-1").await.unwrap(), Some(snap));
    }

    #[tokio::test]
    async fn test_put_replaces_previous_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = db.cache();

        cache.put("org-1", &snapshot(1000)).await.unwrap();
        cache.put("org-1", &snapshot(2000)).await.unwrap();

        let loaded = cache.get("org-1").await.unwrap().unwrap();
        assert_eq!(loaded.last_sync_ms, 2000);
    }

    #[tokio::test]
    async fn test_staleness() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = db.cache();

        // Absent snapshot is stale
        assert!(cache.is_stale("org-1", 60_000, 100_000).await.unwrap());

        cache.put("org-1", &snapshot(100_000)).await.unwrap();
        assert!(!cache.is_stale("org-1", 60_000, 150_000).await.unwrap());
        assert!(cache.is_stale("org-1", 60_000, 200_000).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = db.cache();

        cache.put("org-1", &snapshot(1000)).await.unwrap();
        cache.clear("org-1").await.unwrap();
        assert_eq!(cache.get("org-1").await.unwrap(), None);
    }
}
