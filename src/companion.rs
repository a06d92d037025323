//! Companion Overlay Lifecycle.
//!
//! The secondary (non-video) creative shown alongside a linear break. It
//! appears on break start, auto-hides after a fixed hold, and any pending
//! hide timer is cancelled before a new one is armed. Timers are scheduled
//! by the host: the overlay hands out generation-numbered handles and
//! ignores expirations for handles it no longer holds, so a cancelled
//! timer firing late is a no-op.

use crate::events::EngineAction;
use std::time::Duration;

/// Default hold before the companion creative is cleared.
pub const DEFAULT_HOLD: Duration = Duration::from_secs(15);

/// Opaque identity of one armed hide timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Overlay state machine. At most one live timer handle exists at any time.
#[derive(Debug)]
pub struct CompanionOverlay {
    visible: bool,
    hold_timer: Option<TimerHandle>,
    next_handle: u64,
    hold: Duration,
}

impl CompanionOverlay {
    pub fn new(hold: Duration) -> Self {
        CompanionOverlay {
            visible: false,
            hold_timer: None,
            next_handle: 0,
            hold,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn live_timer(&self) -> Option<TimerHandle> {
        self.hold_timer
    }

    /// Break started: show the creative, cancel any pending hide, arm a
    /// fresh hold timer.
    pub fn on_break_start(&mut self) -> Vec<EngineAction> {
        let mut actions = Vec::new();
        if let Some(old) = self.hold_timer.take() {
            actions.push(EngineAction::CancelHide(old));
        }
        self.visible = true;
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.hold_timer = Some(handle);
        actions.push(EngineAction::ShowCompanion);
        actions.push(EngineAction::ScheduleHide {
            handle,
            delay: self.hold,
        });
        actions
    }

    /// The host's timer fired. A stale handle (already cancelled or
    /// superseded) is ignored.
    pub fn on_hide_timer_fired(&mut self, handle: TimerHandle) -> Vec<EngineAction> {
        if self.hold_timer != Some(handle) {
            return Vec::new();
        }
        self.hold_timer = None;
        self.visible = false;
        vec![EngineAction::HideCompanion]
    }

    /// Session end: cancel any live timer and clear unconditionally.
    pub fn teardown(&mut self) -> Vec<EngineAction> {
        let mut actions = Vec::new();
        if let Some(handle) = self.hold_timer.take() {
            actions.push(EngineAction::CancelHide(handle));
        }
        if self.visible {
            self.visible = false;
            actions.push(EngineAction::HideCompanion);
        }
        actions
    }
}
