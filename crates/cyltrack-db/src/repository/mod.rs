//! # Repository Module
//!
//! Database repository implementations for CylTrack.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  SyncEngine / ScanSessionController                                    │
//! │       │                                                                 │
//! │       │  db.operations().list_unsynced()                                │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  OperationQueueRepository                                              │
//! │  ├── enqueue(&self, op)                                                │
//! │  ├── list_unsynced(&self)                                              │
//! │  ├── mark_synced(&self, ids)                                           │
//! │  ├── clear_synced(&self)                                               │
//! │  └── stats(&self)                                                      │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • The queue is the sole writer of its own storage                     │
//! │  • Easy to test against an in-memory database                          │
//! │  • SQL is isolated in one place                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`queue::OperationQueueRepository`] - Durable pending-operation log
//! - [`cache::OfflineCacheRepository`] - Per-organization read fallback

pub mod cache;
pub mod queue;
