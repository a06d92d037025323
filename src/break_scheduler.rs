//! Break Scheduler.
//!
//! Merges two racing trigger sources into a single monotonic sequence of
//! break starts: continuous clock updates from the content player, and
//! discrete readiness signals from the ad subsystem. A break may become
//! ready before its time arrives (pre-fetch) or its time may arrive before
//! readiness (slow network); both orderings converge to the same starts.
//!
//! The decision rule is a pure function invoked from both call sites, so
//! repeated re-evaluation is harmless: the in-progress guard plus the
//! monotonic started counter make starts idempotent and index-ordered.

use crate::schedule::Schedule;

// --- Constants ---

/// Tolerance when comparing the clock to a cue offset (seconds). Absorbs
/// clock-tick granularity so a cue is not missed by arriving a fraction of
/// a second late relative to the last observed tick.
pub const DEFAULT_EPS_SECS: f64 = 0.25;

// --- Scheduler state ---

/// Shared counters the decision rule gates on. Owned by the scheduler,
/// mutated only here; invariant `started_count <= ready_count <= len(schedule)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerState {
    /// Breaks started so far. Doubles as the index of the next candidate.
    pub started_count: usize,
    /// True between a break-start and the matching break-end signal.
    pub break_in_progress: bool,
}

// --- Decision rule (pure) ---

/// Decide whether a break should start now.
///
/// Returns the index of the break to start, or `None`. All inputs are
/// parameters so the rule can be exercised in isolation from either
/// trigger source:
///
/// 1. never overlap two starts (`break_in_progress` guard);
/// 2. nothing to do once all breaks are exhausted;
/// 3. the only candidate is `schedule[started_count]`, so index order is
///    preserved no matter which source fired;
/// 4. it starts iff it is ready (`ready_count > started_count`) and the
///    clock has reached its offset within `eps`.
pub fn next_break_due(
    schedule: &Schedule,
    state: SchedulerState,
    ready_count: usize,
    current_time: f64,
    eps: f64,
) -> Option<usize> {
    if state.break_in_progress {
        return None;
    }
    if state.started_count >= schedule.len() {
        return None;
    }
    let next_cue = schedule.get(state.started_count)?;
    if ready_count > state.started_count && current_time >= next_cue.offset_secs - eps {
        Some(next_cue.index)
    } else {
        None
    }
}

// --- Stateful shell ---

/// Owns the counters and commits start decisions.
#[derive(Debug)]
pub struct BreakScheduler {
    state: SchedulerState,
    eps_secs: f64,
}

impl BreakScheduler {
    pub fn new(eps_secs: f64) -> Self {
        BreakScheduler {
            state: SchedulerState::default(),
            eps_secs,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn eps_secs(&self) -> f64 {
        self.eps_secs
    }

    /// Re-run the decision rule and commit at most one start.
    ///
    /// Called from both trigger call sites. On a hit the cue is marked
    /// `Started` and the counter advances, making the start exactly-once
    /// under any further re-evaluation.
    pub fn evaluate(
        &mut self,
        schedule: &mut Schedule,
        ready_count: usize,
        current_time: f64,
    ) -> Option<usize> {
        let index = next_break_due(
            schedule,
            self.state,
            ready_count,
            current_time,
            self.eps_secs,
        )?;
        self.state.started_count += 1;
        schedule.mark_started(index);
        Some(index)
    }

    /// The host's start action failed: un-commit so the next evaluation
    /// retries the same index.
    pub fn rollback_start(&mut self, schedule: &mut Schedule, index: usize) {
        if self.state.started_count > 0 && self.state.started_count == index + 1 {
            self.state.started_count -= 1;
            // Back to Ready: readiness was already counted for this break.
            schedule.mark_rolled_back(index);
        }
    }

    pub fn on_break_started(&mut self) {
        self.state.break_in_progress = true;
    }

    pub fn on_break_ended(&mut self) {
        self.state.break_in_progress = false;
    }

    /// Zero everything (playback restarted). Stale counters from a prior
    /// load must never leak into a new one.
    pub fn reset(&mut self) {
        self.state = SchedulerState::default();
    }
}
