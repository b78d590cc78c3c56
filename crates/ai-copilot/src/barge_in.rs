//! Barge-in / end-of-turn policy (spec §4.8). A per-call flag plus
//! timestamp, observed and cleared from multiple tasks (the AI driver's
//! receive loop and the downlink pacer), so both are plain atomics rather
//! than anything requiring a lock.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Once the flag has been set for longer than this, the watchdog clears
/// it unconditionally so a missed clear-condition never blocks audio
/// permanently (§3 invariants, §4.8).
pub const WATCHDOG_MS: i64 = 5_000;

/// Thread-safe barge-in state for one call. `now_ms` is injected by the
/// caller (rather than read from the wall clock internally) so tests can
/// drive the watchdog deterministically.
pub struct BargeInState {
    detected: AtomicBool,
    set_at_ms: AtomicI64,
}

impl BargeInState {
    pub fn new() -> Self {
        Self { detected: AtomicBool::new(false), set_at_ms: AtomicI64::new(0) }
    }

    /// Set the flag and record when it was set. Idempotent: re-setting an
    /// already-set flag just refreshes the timestamp.
    pub fn set(&self, now_ms: i64) {
        self.set_at_ms.store(now_ms, Ordering::Release);
        self.detected.store(true, Ordering::Release);
    }

    /// Unconditionally clear the flag (new completion / new content segment).
    pub fn clear(&self) {
        self.detected.store(false, Ordering::Release);
    }

    /// Whether the flag is currently set, applying the watchdog: if it has
    /// been set for more than [`WATCHDOG_MS`], this call both clears it and
    /// returns `false`.
    pub fn is_set_with_watchdog(&self, now_ms: i64) -> bool {
        if !self.detected.load(Ordering::Acquire) {
            return false;
        }
        let set_at = self.set_at_ms.load(Ordering::Acquire);
        if now_ms.saturating_sub(set_at) > WATCHDOG_MS {
            self.detected.store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// Whether the flag is currently set, with no watchdog side effect —
    /// used where the caller wants a read-only snapshot (metrics, tests).
    pub fn is_set(&self) -> bool {
        self.detected.load(Ordering::Acquire)
    }
}

impl Default for BargeInState {
    fn default() -> Self {
        Self::new()
    }
}
