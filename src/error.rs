//! Error taxonomy for the ad engine.
//!
//! Every failure here is local: no variant is allowed to take down the
//! playback session. Each has a corresponding fall-back-to-plain-content
//! branch in `session`.

/// Failures the ad engine can report.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdError {
    /// The cue-point sequence was malformed (negative or non-finite offset).
    /// The prior (or empty) schedule is kept.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Content duration never resolved, so cue offsets cannot be trusted.
    /// Ad scheduling is abandoned for the session; content still plays.
    #[error("content duration unavailable")]
    DurationUnavailable,

    /// The ad subsystem failed to produce a manager for the schedule.
    /// Ad scheduling is abandoned; content resumes unaided.
    #[error("ad subsystem init failed: {0}")]
    SubsystemInitFailure(String),

    /// A start-break action failed. The started counter is left unchanged
    /// so the next evaluation retries.
    #[error("break start failed: {0}")]
    BreakStartFailure(String),

    /// The ad subsystem reported an error mid-playback. Content resumes if
    /// a pause is currently in effect.
    #[error("ad subsystem runtime error: {0}")]
    SubsystemRuntimeError(String),
}
