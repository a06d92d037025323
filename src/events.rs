//! Event and action vocabulary for the engine.
//!
//! Two independent sources feed the session: the content player
//! (`PlayerEvent`) and the ad-decisioning subsystem (`AdEvent`). The session
//! answers with `EngineAction`s for the host to execute against the real
//! player and display surface. The engine itself never touches either.

use crate::companion::TimerHandle;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

// ── Inbound events ──────────────────────────────────────────────────────────

/// Events observed on the content player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Playback clock advanced. `duration` may still be unknown (NaN on the
    /// wire); the mirror keeps the last finite value it saw.
    TimeUpdate { current_time: f64, duration: f64 },
    Seeking,
    Seeked,
    Play,
    Pause,
    RateChange(f64),
    /// Duration became known.
    LoadedMetadata { duration: f64 },
    /// Content finished.
    Ended,
}

/// Events from the ad-decisioning subsystem, as a tagged variant type
/// rather than untyped callback registration.
#[derive(Debug, Clone, PartialEq)]
pub enum AdEvent {
    /// The next break's creatives are loaded and playable. Readiness is a
    /// bare per-break signal; it carries no cue index.
    Ready,
    BreakStarted,
    BreakEnded,
    /// The subsystem wants content paused (a break is taking the screen).
    ContentPauseRequested,
    /// The subsystem wants content resumed.
    ContentResumeRequested,
    /// Runtime error with a diagnostic cause.
    Error(String),
}

// ── Outbound actions ────────────────────────────────────────────────────────

/// Actions the host must execute. The session emits these instead of
/// commanding the player or display surface directly.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    /// Start ad break at this schedule index.
    StartBreak(usize),
    PauseContent,
    ResumeContent,
    /// Render the companion creative.
    ShowCompanion,
    /// Arm a hide timer. The host must call back with the same handle when
    /// it fires; a stale handle is ignored.
    ScheduleHide { handle: TimerHandle, delay: Duration },
    /// Cancel a previously armed hide timer.
    CancelHide(TimerHandle),
    /// Clear the companion creative.
    HideCompanion,
    /// Notify the ad subsystem that content finished (enables post-rolls).
    ContentComplete,
}

// ── Subscription ────────────────────────────────────────────────────────────

/// Cancellation token shared between the session and its event producers.
///
/// Once cancelled, the session drops incoming events instead of dispatching
/// them, so nothing fires against a torn-down display surface.
#[derive(Debug, Clone)]
pub struct Subscription {
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub fn new() -> Self {
        Subscription {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.active.store(false, Ordering::Relaxed);
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}
