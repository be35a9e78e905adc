//! # Scan Debouncer
//!
//! Camera-noise suppression for the scan loop.
//!
//! ## Why Debounce?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Camera Detection Reality                           │
//! │                                                                         │
//! │  A barcode held in front of the camera produces a detection on          │
//! │  nearly every frame:                                                    │
//! │                                                                         │
//! │  t=0ms    "123456789"  ◄── real scan                                   │
//! │  t=33ms   "123456789"  ◄── same label, next frame                      │
//! │  t=66ms   "123456789"  ◄── same label, next frame                      │
//! │  ...                                                                    │
//! │  t=80ms   "123456780"  ◄── single-frame misread (glare)                │
//! │                                                                         │
//! │  Two mechanisms, applied BEFORE business validation:                    │
//! │                                                                         │
//! │  1. WINDOW (default 2000ms): re-detections of the code that was        │
//! │     just committed are dropped as re-read noise.                        │
//! │                                                                         │
//! │  2. STABILITY HOLD (default 300ms): a code must be the current         │
//! │     candidate for the whole hold before it commits, which filters       │
//! │     single-frame misreads. Any different detection restarts the hold.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//! This is a state machine over caller-supplied epoch-millisecond clocks.
//! The session controller owns the actual timer: on every
//! [`DebounceDecision::Armed`] it (re)schedules a timer for `ready_at_ms`
//! and resolves it through [`ScanDebouncer::fire`]. Cancelling that timer on
//! teardown, together with [`ScanDebouncer::reset`], is mandatory so a scan
//! cannot commit after the scanner screen has closed.

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_DEBOUNCE_WINDOW_MS, DEFAULT_STABILITY_HOLD_MS};

// =============================================================================
// Configuration
// =============================================================================

/// Debounce tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Re-detections of the last committed barcode inside this window are
    /// discarded.
    pub window_ms: u64,

    /// A code must be the current candidate this long before it commits.
    /// Zero disables the hold (manual entry path).
    pub stability_hold_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        DebounceConfig {
            window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            stability_hold_ms: DEFAULT_STABILITY_HOLD_MS,
        }
    }
}

// =============================================================================
// Decisions
// =============================================================================

/// Outcome of feeding one detection into the debouncer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceDecision {
    /// Re-read of the just-committed code; drop without feedback.
    Suppressed,

    /// Code is being held for stability. The caller must (re)schedule its
    /// hold timer for `ready_at_ms` and call [`ScanDebouncer::fire`] then.
    Armed { ready_at_ms: u64 },

    /// Hold satisfied by this detection; commit now.
    Ready,
}

// =============================================================================
// Debouncer
// =============================================================================

#[derive(Debug, Clone)]
struct Pending {
    barcode: String,
    first_seen_ms: u64,
}

/// Suppresses camera re-reads and single-frame misreads.
///
/// ## Example
/// ```rust
/// use cyltrack_core::debounce::{DebounceDecision, ScanDebouncer};
///
/// let mut debouncer = ScanDebouncer::default();
///
/// // First sighting arms the stability hold
/// assert_eq!(
///     debouncer.observe("123456789", 0),
///     DebounceDecision::Armed { ready_at_ms: 300 }
/// );
///
/// // Hold timer lapses with no competing detection: commit
/// assert_eq!(debouncer.fire(300), Some("123456789".to_string()));
///
/// // Camera still sees the same label: noise
/// assert_eq!(debouncer.observe("123456789", 400), DebounceDecision::Suppressed);
/// ```
#[derive(Debug, Clone)]
pub struct ScanDebouncer {
    config: DebounceConfig,
    last_commit: Option<(String, u64)>,
    pending: Option<Pending>,
}

impl ScanDebouncer {
    pub fn new(config: DebounceConfig) -> Self {
        ScanDebouncer {
            config,
            last_commit: None,
            pending: None,
        }
    }

    /// Feeds one raw detection into the state machine.
    pub fn observe(&mut self, barcode: &str, now_ms: u64) -> DebounceDecision {
        if let Some((last, committed_at)) = &self.last_commit {
            if last == barcode && now_ms.saturating_sub(*committed_at) < self.config.window_ms {
                return DebounceDecision::Suppressed;
            }
        }

        if self.config.stability_hold_ms == 0 {
            self.record_commit(barcode, now_ms);
            return DebounceDecision::Ready;
        }

        match &self.pending {
            // Same candidate still in sight: the hold keeps accumulating
            Some(p) if p.barcode == barcode => {
                let ready_at_ms = p.first_seen_ms + self.config.stability_hold_ms;
                if now_ms >= ready_at_ms {
                    self.pending = None;
                    self.record_commit(barcode, now_ms);
                    DebounceDecision::Ready
                } else {
                    DebounceDecision::Armed { ready_at_ms }
                }
            }

            // New candidate (or a different code): restart the hold
            _ => {
                self.pending = Some(Pending {
                    barcode: barcode.to_string(),
                    first_seen_ms: now_ms,
                });
                DebounceDecision::Armed {
                    ready_at_ms: now_ms + self.config.stability_hold_ms,
                }
            }
        }
    }

    /// Resolves the hold timer.
    ///
    /// Returns the barcode to commit when the pending candidate's hold has
    /// lapsed, `None` when the timer fired early or was superseded.
    pub fn fire(&mut self, now_ms: u64) -> Option<String> {
        match self.pending.take() {
            Some(p) if now_ms.saturating_sub(p.first_seen_ms) >= self.config.stability_hold_ms => {
                self.record_commit(&p.barcode, now_ms);
                Some(p.barcode)
            }
            other => {
                self.pending = other;
                None
            }
        }
    }

    /// Clears all state. Must be called on scanner teardown, alongside
    /// cancelling the hold timer.
    pub fn reset(&mut self) {
        self.pending = None;
        self.last_commit = None;
    }

    /// The candidate currently held, if any.
    pub fn pending_barcode(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.barcode.as_str())
    }

    fn record_commit(&mut self, barcode: &str, now_ms: u64) {
        self.last_commit = Some((barcode.to_string(), now_ms));
    }
}

impl Default for ScanDebouncer {
    fn default() -> Self {
        ScanDebouncer::new(DebounceConfig::default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> ScanDebouncer {
        ScanDebouncer::default()
    }

    #[test]
    fn test_rapid_redetection_yields_one_commit() {
        let mut d = debouncer();

        assert_eq!(
            d.observe("123456789", 0),
            DebounceDecision::Armed { ready_at_ms: 300 }
        );
        // 100ms later the camera reports the same label again
        assert_eq!(
            d.observe("123456789", 100),
            DebounceDecision::Armed { ready_at_ms: 300 }
        );
        assert_eq!(d.fire(300), Some("123456789".to_string()));

        // Further frames of the same label inside the window are noise
        assert_eq!(d.observe("123456789", 400), DebounceDecision::Suppressed);
        assert_eq!(d.observe("123456789", 2250), DebounceDecision::Suppressed);
    }

    #[test]
    fn test_redetection_after_window_commits_again() {
        let mut d = debouncer();

        d.observe("123456789", 0);
        assert_eq!(d.fire(300), Some("123456789".to_string()));

        // 3000ms after the commit instant: outside the window
        assert_eq!(
            d.observe("123456789", 3300),
            DebounceDecision::Armed { ready_at_ms: 3600 }
        );
        assert_eq!(d.fire(3600), Some("123456789".to_string()));
    }

    #[test]
    fn test_hold_satisfied_by_continuous_sight() {
        let mut d = debouncer();

        d.observe("123456789", 0);
        // Still in sight past the hold deadline: commits on the detection
        assert_eq!(d.observe("123456789", 350), DebounceDecision::Ready);
        // The scheduled timer then finds nothing pending
        assert_eq!(d.fire(300), None);
    }

    #[test]
    fn test_different_code_restarts_hold() {
        let mut d = debouncer();

        d.observe("111111111", 0);
        // Misread replaced by the real label: hold restarts
        assert_eq!(
            d.observe("222222222", 100),
            DebounceDecision::Armed { ready_at_ms: 400 }
        );

        // The first code's timer fires but its candidacy is gone
        assert_eq!(d.fire(300), None);
        assert_eq!(d.fire(400), Some("222222222".to_string()));
    }

    #[test]
    fn test_fire_before_deadline_keeps_pending() {
        let mut d = debouncer();

        d.observe("123456789", 0);
        assert_eq!(d.fire(200), None);
        assert_eq!(d.pending_barcode(), Some("123456789"));
        assert_eq!(d.fire(300), Some("123456789".to_string()));
    }

    #[test]
    fn test_reset_cancels_pending_commit() {
        let mut d = debouncer();

        d.observe("123456789", 0);
        d.reset();

        // Nothing may commit after teardown
        assert_eq!(d.fire(1000), None);
        assert_eq!(d.pending_barcode(), None);
    }

    #[test]
    fn test_zero_hold_commits_immediately() {
        let mut d = ScanDebouncer::new(DebounceConfig {
            window_ms: 2000,
            stability_hold_ms: 0,
        });

        assert_eq!(d.observe("123456789", 0), DebounceDecision::Ready);
        assert_eq!(d.observe("123456789", 100), DebounceDecision::Suppressed);
        assert_eq!(d.observe("987654321", 100), DebounceDecision::Ready);
    }

    #[test]
    fn test_window_is_per_barcode() {
        let mut d = ScanDebouncer::new(DebounceConfig {
            window_ms: 2000,
            stability_hold_ms: 0,
        });

        assert_eq!(d.observe("111111111", 0), DebounceDecision::Ready);
        // A different label right after is a legitimate scan
        assert_eq!(d.observe("222222222", 50), DebounceDecision::Ready);
    }
}
