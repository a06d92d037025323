//! Readiness Tracker.
//!
//! Counts how many breaks the ad subsystem has declared playable so far.
//! The counter is deliberately un-indexed: a readiness signal cannot be
//! attributed to a specific cue, only to "one more break is ready". The
//! subsystem is expected to signal once per break in index order, but the
//! tracker does not verify that; bursts and repeats are accepted as valid
//! (real ad SDKs deliver readiness in bursts).

/// Monotonically increasing ready-break counter.
#[derive(Debug, Default)]
pub struct ReadinessTracker {
    ready_count: usize,
}

impl ReadinessTracker {
    pub fn new() -> Self {
        ReadinessTracker { ready_count: 0 }
    }

    /// Record one readiness signal. Returns the new count.
    pub fn mark_next_ready(&mut self) -> usize {
        self.ready_count += 1;
        self.ready_count
    }

    /// Breaks declared ready so far.
    pub fn ready_count(&self) -> usize {
        self.ready_count
    }

    /// Zero the counter (playback restarted, new schedule loaded).
    pub fn reset(&mut self) {
        self.ready_count = 0;
    }
}
