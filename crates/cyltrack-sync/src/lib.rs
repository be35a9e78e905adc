//! # cyltrack-sync: Sync Engine for CylTrack
//!
//! This crate provides the synchronization layer for the CylTrack scan
//! pipeline, enabling offline-first operation with best-effort, idempotent
//! reconciliation against the remote store.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scan Pipeline Data Flow                          │
//! │                                                                         │
//! │  camera detection                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │              ScanSessionController (session.rs)                  │  │
//! │  │                                                                  │  │
//! │  │  IDLE → SCANNING → (COMMIT | REJECT | DUPLICATE) → SCANNING ...  │  │
//! │  │                        → SUBMITTING → SUBMITTED                  │  │
//! │  │                                                                  │  │
//! │  │  debounce → validate → session dedup → catalog check → commit    │  │
//! │  └───────────────┬──────────────────────────────┬───────────────────┘  │
//! │                  │ enqueue (durable)            │ submit order          │
//! │                  ▼                              ▼                       │
//! │  ┌────────────────────────┐      ┌────────────────────────────────┐    │
//! │  │  cyltrack-db queue     │◄─────│  SyncEngine (engine.rs)        │    │
//! │  │  (crash-safe, local)   │ mark │                                │    │
//! │  │                        │synced│  per-barcode lanes, idempotent │    │
//! │  └────────────────────────┘      │  inserts, per-op failures      │    │
//! │                                  └───────────────┬────────────────┘    │
//! │                                                  │                     │
//! │  ┌────────────────────────┐                      ▼                     │
//! │  │  ConnectivityMonitor   │────gate────► RemoteStore trait             │
//! │  │  (connectivity.rs)     │              (remote.rs, app-provided)     │
//! │  └────────────────────────┘                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Scanner configuration (TOML file + env overrides)
//! - [`connectivity`] - Online/offline monitor with change notifications
//! - [`engine`] - Queue drain with idempotent remote writes
//! - [`error`] - Sync error types
//! - [`remote`] - Remote-store contracts (catalog, scan rows, retag)
//! - [`session`] - Scan-session lifecycle state machine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cyltrack_sync::{
//!     ConnectivityMonitor, ScanSessionController, ScannerConfig, SessionContext,
//! };
//!
//! let config = ScannerConfig::load_or_default(None);
//! let connectivity = ConnectivityMonitor::new(true);
//!
//! let mut session = ScanSessionController::new(
//!     db, remote, connectivity, &config, context,
//! )?;
//!
//! session.open()?;
//! let feedback = session.handle_detection("123456789", now_ms).await?;
//! let report = session.submit_order("ORD-1042").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod remote;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DeviceIdentity, OrganizationIdentity, ScanSettings, ScannerConfig, SyncSettings};
pub use connectivity::ConnectivityMonitor;
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use remote::{CatalogHit, RemoteError, RemoteStore, ScanRow};
pub use session::{
    RejectReason, ScanFeedback, ScanSessionController, SessionContext, SessionState,
};
