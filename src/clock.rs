//! Playback Clock Mirror.
//!
//! A read-only reflection of the content player's live properties, rebuilt
//! on every player event. The ad side reads the snapshot to reason about
//! content position without being handed playback control. The mirror never
//! commands the player.

use crate::events::PlayerEvent;

/// Seekable window of the content, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekableRange {
    pub start: f64,
    pub end: f64,
}

/// Value object describing the player at the most recent observation.
/// Never stale beyond one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSnapshot {
    pub current_time: f64,
    /// None until metadata resolves.
    pub duration: Option<f64>,
    pub paused: bool,
    pub seeking: bool,
    pub playback_rate: f64,
}

impl PlaybackSnapshot {
    fn initial() -> Self {
        PlaybackSnapshot {
            current_time: 0.0,
            duration: None,
            paused: true,
            seeking: false,
            playback_rate: 1.0,
        }
    }

    /// `[0, duration]` once duration is known, `[0, 0]` before metadata.
    pub fn seekable_range(&self) -> SeekableRange {
        SeekableRange {
            start: 0.0,
            end: self.duration.unwrap_or(0.0),
        }
    }

    /// True once a finite, nonzero duration has been observed.
    pub fn has_duration(&self) -> bool {
        self.duration.is_some_and(|d| d.is_finite() && d > 0.0)
    }
}

/// Maintains the snapshot. One underlying player event triggers exactly one
/// mirror update; no filtering or smoothing.
#[derive(Debug)]
pub struct ClockMirror {
    snapshot: PlaybackSnapshot,
}

impl ClockMirror {
    pub fn new() -> Self {
        ClockMirror {
            snapshot: PlaybackSnapshot::initial(),
        }
    }

    pub fn snapshot(&self) -> &PlaybackSnapshot {
        &self.snapshot
    }

    /// Apply one player event to the snapshot.
    pub fn apply(&mut self, event: &PlayerEvent) {
        let s = &mut self.snapshot;
        match event {
            PlayerEvent::TimeUpdate {
                current_time,
                duration,
            } => {
                s.current_time = *current_time;
                // Keep the last known duration if the player reports NaN.
                if duration.is_finite() && *duration > 0.0 {
                    s.duration = Some(*duration);
                }
            }
            PlayerEvent::Seeking => s.seeking = true,
            PlayerEvent::Seeked => s.seeking = false,
            PlayerEvent::Play => s.paused = false,
            PlayerEvent::Pause => s.paused = true,
            PlayerEvent::RateChange(rate) => s.playback_rate = *rate,
            PlayerEvent::LoadedMetadata { duration } => {
                if duration.is_finite() && *duration > 0.0 {
                    s.duration = Some(*duration);
                }
            }
            PlayerEvent::Ended => s.paused = true,
        }
    }

    /// Return the mirror to its pre-playback state (new session).
    pub fn reset(&mut self) {
        self.snapshot = PlaybackSnapshot::initial();
    }
}

impl Default for ClockMirror {
    fn default() -> Self {
        Self::new()
    }
}
