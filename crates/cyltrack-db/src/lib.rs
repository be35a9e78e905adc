//! # cyltrack-db: Durable Local Stores for CylTrack
//!
//! This crate provides local persistence for the scan pipeline.
//! It uses SQLite for on-device storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CylTrack Data Flow                               │
//! │                                                                         │
//! │  ScanSessionController (cyltrack-sync)                                 │
//! │       │ enqueue committed scans / read pending work                     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    cyltrack-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (queue.rs,   │    │  (embedded)  │  │   │
//! │  │   │               │    │   cache.rs)   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OperationQueue│    │ 001_init.sql │  │   │
//! │  │   │ WAL + FULL    │    │ OfflineCache  │    │ ...          │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (on-device)                                           │
//! │     operation_queue: unsynced work survives process restarts           │
//! │     offline_cache:   read fallback while disconnected                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (queue, cache)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cyltrack_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/cyltrack.db")).await?;
//!
//! db.operations().enqueue(&op).await?;
//! let pending = db.operations().list_unsynced().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cache::{CacheSnapshot, OfflineCacheRepository};
pub use repository::queue::OperationQueueRepository;
