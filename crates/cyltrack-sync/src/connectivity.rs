//! # Connectivity Monitor
//!
//! Online/offline state with change notifications.
//!
//! The platform layer (NetInfo on mobile, navigator events on web, a reach
//! probe on desktop) feeds `set_online`; the sync engine gates each pass on
//! `is_online`, and interested tasks subscribe for transitions to trigger a
//! background sync when connectivity returns.
//!
//! ```text
//! platform reachability events ──► set_online(bool)
//!                                       │ watch channel
//!            ┌──────────────────────────┼──────────────────────────┐
//!            ▼                          ▼                          ▼
//!   SyncEngine.sync_all()      subscribe().changed()      UI online badge
//!   (offline → zero work)      (reconnect → sync pass)
//! ```

use tokio::sync::watch;
use tracing::info;

/// Shared online/offline flag.
///
/// Cheap to clone; all clones observe the same state.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        ConnectivityMonitor { tx }
    }

    /// Current state, as of the latest platform report.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Records a reachability change from the platform layer.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|state| {
            if *state != online {
                *state = online;
                true
            } else {
                false
            }
        });

        if changed {
            info!(online, "Connectivity changed");
        }
    }

    /// Subscribes to connectivity transitions.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let mut rx = connectivity.subscribe();
    /// while rx.changed().await.is_ok() {
    ///     if *rx.borrow() {
    ///         engine.sync_all().await?;
    ///     }
    /// }
    /// ```
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        // Optimistic: assume online until the platform says otherwise
        ConnectivityMonitor::new(true)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_transitions() {
        let monitor = ConnectivityMonitor::new(true);
        assert!(monitor.is_online());

        monitor.set_online(false);
        assert!(!monitor.is_online());

        monitor.set_online(true);
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let monitor = ConnectivityMonitor::new(false);
        let mut rx = monitor.subscribe();

        monitor.set_online(true);

        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_redundant_reports_do_not_notify() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.subscribe();

        // Same state again: no notification queued
        monitor.set_online(true);
        assert!(!rx.has_changed().unwrap());

        monitor.set_online(false);
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let monitor = ConnectivityMonitor::new(true);
        let clone = monitor.clone();

        clone.set_online(false);
        assert!(!monitor.is_online());
    }
}
