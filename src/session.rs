//! PlaybackSession — central dispatcher for one playback page session.
//!
//! Owns the clock mirror, cue schedule, readiness tracker, break scheduler,
//! companion overlay, and log buffer. Hosts feed it player and ad events;
//! it answers with the actions to execute. Handlers run to completion, and
//! the decision rule is re-evaluated synchronously inside whichever handler
//! fired, so no evaluation ever sees stale state.

use crate::break_scheduler::BreakScheduler;
use crate::clock::{ClockMirror, PlaybackSnapshot};
use crate::companion::{CompanionOverlay, TimerHandle};
use crate::config::EngineConfig;
use crate::error::AdError;
use crate::events::{AdEvent, EngineAction, PlayerEvent, Subscription};
use crate::readiness::ReadinessTracker;
use crate::schedule::Schedule;
use chrono::Local;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

// ── Log buffer ──────────────────────────────────────────────────────────────

const LOG_BUFFER_MAX: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

/// Bounded in-memory session log. Oldest entries are discarded past the cap.
#[derive(Debug, Default)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
}

impl LogBuffer {
    pub fn new() -> Self {
        LogBuffer {
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, level: LogLevel, message: String) {
        self.entries.push_back(LogEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            level,
            message,
        });
        while self.entries.len() > LOG_BUFFER_MAX {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ── Session ─────────────────────────────────────────────────────────────────

/// One playback page session stitching the content player to its ad schedule.
pub struct PlaybackSession {
    mirror: ClockMirror,
    schedule: Schedule,
    readiness: ReadinessTracker,
    scheduler: BreakScheduler,
    companion: CompanionOverlay,
    subscription: Subscription,
    /// Set when the ad subsystem failed for good; content plays unaided.
    ads_abandoned: bool,
    pub log: LogBuffer,
}

impl PlaybackSession {
    pub fn new(config: &EngineConfig) -> Self {
        PlaybackSession {
            mirror: ClockMirror::new(),
            schedule: Schedule::empty(),
            readiness: ReadinessTracker::new(),
            scheduler: BreakScheduler::new(config.eps_secs),
            companion: CompanionOverlay::new(Duration::from_secs_f64(
                config.companion_hold_secs,
            )),
            subscription: Subscription::new(),
            ads_abandoned: false,
            log: LogBuffer::new(),
        }
    }

    /// Session with default configuration (tests, simulations).
    pub fn new_test() -> Self {
        Self::new(&EngineConfig::default())
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    /// Read-only mirror of the content player, safe to hand to the ad side.
    pub fn snapshot(&self) -> &PlaybackSnapshot {
        self.mirror.snapshot()
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn started_count(&self) -> usize {
        self.scheduler.state().started_count
    }

    pub fn ready_count(&self) -> usize {
        self.readiness.ready_count()
    }

    pub fn break_in_progress(&self) -> bool {
        self.scheduler.state().break_in_progress
    }

    pub fn companion_visible(&self) -> bool {
        self.companion.is_visible()
    }

    pub fn ads_abandoned(&self) -> bool {
        self.ads_abandoned
    }

    /// Token shared with event producers; cancelled on teardown.
    pub fn subscription(&self) -> Subscription {
        self.subscription.clone()
    }

    // ── Schedule lifecycle ──────────────────────────────────────────────────

    /// Accept a new cue-point schedule, replacing any prior one.
    ///
    /// Prior scheduler state is torn down first: started/ready counters and
    /// the in-progress flag go to zero before the new schedule is visible.
    /// Fails with `DurationUnavailable` until the mirror has observed a
    /// usable content duration, and with `InvalidSchedule` (keeping the
    /// prior schedule) on bad offsets.
    pub fn load_schedule(&mut self, offsets: &[f64]) -> Result<usize, AdError> {
        if !self.mirror.snapshot().has_duration() {
            return Err(AdError::DurationUnavailable);
        }
        let schedule = Schedule::load(offsets)?;
        self.scheduler.reset();
        self.readiness.reset();
        self.ads_abandoned = false;
        let count = schedule.len();
        self.schedule = schedule;
        self.log
            .push(LogLevel::Info, format!("schedule loaded: {} cue points", count));
        Ok(count)
    }

    /// The ad subsystem failed for the whole session: give up on ads and
    /// let content play unaided. Ads are best-effort; content playback is
    /// never blocked by ad failure.
    pub fn abandon_ads(&mut self, cause: &AdError) -> Vec<EngineAction> {
        self.log
            .push(LogLevel::Error, format!("abandoning ads: {}", cause));
        self.ads_abandoned = true;
        self.schedule = Schedule::empty();
        self.scheduler.reset();
        self.readiness.reset();
        vec![EngineAction::ResumeContent]
    }

    // ── Event handlers ──────────────────────────────────────────────────────

    /// Content player event: refresh the mirror, then re-run the decision
    /// rule (the clock-side trigger).
    pub fn handle_player_event(&mut self, event: PlayerEvent) -> Vec<EngineAction> {
        if !self.subscription.is_active() {
            return Vec::new();
        }
        self.mirror.apply(&event);

        let mut actions = Vec::new();
        if event == PlayerEvent::Ended {
            // Let the subsystem know content finished (enables post-rolls).
            actions.push(EngineAction::ContentComplete);
        }
        self.evaluate_into(&mut actions);
        actions
    }

    /// Ad subsystem event (the readiness-side trigger and the break
    /// lifecycle signals).
    pub fn handle_ad_event(&mut self, event: AdEvent) -> Vec<EngineAction> {
        if !self.subscription.is_active() {
            return Vec::new();
        }
        let mut actions = Vec::new();
        match event {
            AdEvent::Ready => {
                let count = self.readiness.mark_next_ready();
                if count > self.schedule.len() {
                    self.log.push(
                        LogLevel::Warn,
                        format!(
                            "readiness signal #{} exceeds {} scheduled break(s)",
                            count,
                            self.schedule.len()
                        ),
                    );
                } else {
                    self.schedule.mark_ready(count - 1);
                    self.log
                        .push(LogLevel::Info, format!("break ready, ready_count={}", count));
                }
                self.evaluate_into(&mut actions);
            }
            AdEvent::BreakStarted => {
                self.scheduler.on_break_started();
                self.log.push(LogLevel::Info, "break started".into());
                actions.extend(self.companion.on_break_start());
            }
            AdEvent::BreakEnded => {
                self.scheduler.on_break_ended();
                self.log.push(LogLevel::Info, "break ended".into());
                // We may already be past the next cue.
                self.evaluate_into(&mut actions);
            }
            AdEvent::ContentPauseRequested => {
                // Honored unconditionally.
                actions.push(EngineAction::PauseContent);
            }
            AdEvent::ContentResumeRequested => {
                actions.push(EngineAction::ResumeContent);
            }
            AdEvent::Error(reason) => {
                let err = AdError::SubsystemRuntimeError(reason);
                self.log.push(LogLevel::Error, err.to_string());
                if self.scheduler.state().break_in_progress {
                    self.scheduler.on_break_ended();
                }
                if self.mirror.snapshot().paused {
                    actions.push(EngineAction::ResumeContent);
                }
            }
        }
        actions
    }

    /// A host-scheduled companion hide timer fired.
    pub fn handle_timer_fired(&mut self, handle: TimerHandle) -> Vec<EngineAction> {
        if !self.subscription.is_active() {
            return Vec::new();
        }
        self.companion.on_hide_timer_fired(handle)
    }

    /// The host's start-break action failed. The started counter rolls back
    /// so the next evaluation retries the same index; content keeps playing.
    pub fn break_start_failed(&mut self, index: usize, reason: &str) {
        let err = AdError::BreakStartFailure(reason.to_string());
        self.log
            .push(LogLevel::Error, format!("break #{}: {}", index, err));
        self.scheduler.rollback_start(&mut self.schedule, index);
    }

    /// Session end: cancel the subscription and any live companion timer,
    /// clear the overlay. Events arriving after this are dropped.
    pub fn teardown(&mut self) -> Vec<EngineAction> {
        self.subscription.cancel();
        let actions = self.companion.teardown();
        self.log.push(LogLevel::Info, "session torn down".into());
        actions
    }

    // ── Decision rule ───────────────────────────────────────────────────────

    /// Single evaluation shared by both trigger call sites.
    fn evaluate_into(&mut self, actions: &mut Vec<EngineAction>) {
        if self.ads_abandoned || self.schedule.is_empty() {
            return;
        }
        let current_time = self.mirror.snapshot().current_time;
        if let Some(index) = self.scheduler.evaluate(
            &mut self.schedule,
            self.readiness.ready_count(),
            current_time,
        ) {
            let offset = self
                .schedule
                .get(index)
                .map(|c| c.offset_secs)
                .unwrap_or_default();
            self.log.push(
                LogLevel::Info,
                format!("starting break #{} at cue {}s", index, offset),
            );
            actions.push(EngineAction::StartBreak(index));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_duration(duration: f64) -> PlaybackSession {
        let mut session = PlaybackSession::new_test();
        session.handle_player_event(PlayerEvent::LoadedMetadata { duration });
        session
    }

    fn tick(session: &mut PlaybackSession, t: f64) -> Vec<EngineAction> {
        session.handle_player_event(PlayerEvent::TimeUpdate {
            current_time: t,
            duration: f64::NAN,
        })
    }

    #[test]
    fn load_schedule_requires_duration() {
        let mut session = PlaybackSession::new_test();
        let result = session.load_schedule(&[0.0, 15.0]);
        assert!(matches!(result, Err(AdError::DurationUnavailable)));
    }

    #[test]
    fn load_schedule_rejects_bad_offsets_and_keeps_prior() {
        let mut session = session_with_duration(60.0);
        session.load_schedule(&[0.0, 15.0]).unwrap();
        let result = session.load_schedule(&[-1.0]);
        assert!(matches!(result, Err(AdError::InvalidSchedule(_))));
        assert_eq!(session.schedule().len(), 2);
    }

    #[test]
    fn ready_then_time_starts_break() {
        let mut session = session_with_duration(60.0);
        session.load_schedule(&[10.0]).unwrap();

        assert!(session.handle_ad_event(AdEvent::Ready).is_empty());
        assert!(tick(&mut session, 5.0).is_empty());
        let actions = tick(&mut session, 10.1);
        assert_eq!(actions, vec![EngineAction::StartBreak(0)]);
    }

    #[test]
    fn time_then_ready_starts_break() {
        let mut session = session_with_duration(60.0);
        session.load_schedule(&[10.0]).unwrap();

        assert!(tick(&mut session, 12.0).is_empty());
        let actions = session.handle_ad_event(AdEvent::Ready);
        assert_eq!(actions, vec![EngineAction::StartBreak(0)]);
    }

    #[test]
    fn repeated_ticks_start_break_once() {
        let mut session = session_with_duration(60.0);
        session.load_schedule(&[0.0]).unwrap();

        // The preroll is already due, so the readiness signal carries the
        // one and only start; every subsequent tick re-evaluates to nothing.
        let mut starts = session
            .handle_ad_event(AdEvent::Ready)
            .iter()
            .filter(|a| matches!(a, EngineAction::StartBreak(_)))
            .count();
        for i in 0..20 {
            let actions = tick(&mut session, i as f64 * 0.5);
            starts += actions
                .iter()
                .filter(|a| matches!(a, EngineAction::StartBreak(_)))
                .count();
        }
        assert_eq!(starts, 1);
    }

    #[test]
    fn pause_resume_requests_are_honored_unconditionally() {
        let mut session = session_with_duration(60.0);
        assert_eq!(
            session.handle_ad_event(AdEvent::ContentPauseRequested),
            vec![EngineAction::PauseContent]
        );
        assert_eq!(
            session.handle_ad_event(AdEvent::ContentResumeRequested),
            vec![EngineAction::ResumeContent]
        );
    }

    #[test]
    fn break_end_reevaluates_for_overdue_cue() {
        let mut session = session_with_duration(120.0);
        session.load_schedule(&[0.0, 15.0]).unwrap();

        // The preroll starts straight from the readiness trigger.
        let actions = session.handle_ad_event(AdEvent::Ready);
        assert_eq!(actions, vec![EngineAction::StartBreak(0)]);
        session.handle_ad_event(AdEvent::Ready);
        session.handle_ad_event(AdEvent::BreakStarted);

        // Clock jumps past cue 1 while the first break is still playing.
        assert!(tick(&mut session, 20.0).is_empty());

        // Ending the break triggers the overdue start immediately.
        let actions = session.handle_ad_event(AdEvent::BreakEnded);
        assert_eq!(actions, vec![EngineAction::StartBreak(1)]);
    }

    #[test]
    fn companion_follows_break_start() {
        let mut session = session_with_duration(60.0);
        let actions = session.handle_ad_event(AdEvent::BreakStarted);
        assert!(actions.contains(&EngineAction::ShowCompanion));
        assert!(session.companion_visible());
    }

    #[test]
    fn subsystem_error_resumes_paused_content() {
        let mut session = session_with_duration(60.0);
        session.handle_ad_event(AdEvent::BreakStarted);
        session.handle_player_event(PlayerEvent::Pause);

        let actions = session.handle_ad_event(AdEvent::Error("VAST timeout".into()));
        assert!(actions.contains(&EngineAction::ResumeContent));
        assert!(!session.break_in_progress());
    }

    #[test]
    fn subsystem_error_while_playing_emits_nothing() {
        let mut session = session_with_duration(60.0);
        session.handle_player_event(PlayerEvent::Play);
        let actions = session.handle_ad_event(AdEvent::Error("no fill".into()));
        assert!(actions.is_empty());
    }

    #[test]
    fn abandon_ads_resumes_content_and_stops_scheduling() {
        let mut session = session_with_duration(60.0);
        session.load_schedule(&[0.0]).unwrap();
        session.handle_ad_event(AdEvent::Ready);

        let actions =
            session.abandon_ads(&AdError::SubsystemInitFailure("no manager".into()));
        assert_eq!(actions, vec![EngineAction::ResumeContent]);
        assert!(session.ads_abandoned());

        // No break ever starts afterwards.
        assert!(tick(&mut session, 5.0).is_empty());
    }

    #[test]
    fn break_start_failure_rolls_back_and_retries() {
        let mut session = session_with_duration(60.0);
        session.load_schedule(&[0.0]).unwrap();

        // Preroll due immediately: the start rides the readiness signal.
        let actions = session.handle_ad_event(AdEvent::Ready);
        assert_eq!(actions, vec![EngineAction::StartBreak(0)]);
        session.break_start_failed(0, "start() threw");
        assert_eq!(session.started_count(), 0);

        // Next tick retries the same break.
        assert_eq!(tick(&mut session, 0.6), vec![EngineAction::StartBreak(0)]);
    }

    #[test]
    fn reload_resets_counters_before_new_events() {
        let mut session = session_with_duration(60.0);
        session.load_schedule(&[0.0, 15.0]).unwrap();
        session.handle_ad_event(AdEvent::Ready);
        session.handle_ad_event(AdEvent::Ready);
        tick(&mut session, 0.1);
        session.handle_ad_event(AdEvent::BreakStarted);
        session.handle_ad_event(AdEvent::BreakEnded);
        tick(&mut session, 16.0);
        assert_eq!(session.started_count(), 2);

        session.load_schedule(&[0.0, 20.0, 40.0]).unwrap();
        assert_eq!(session.started_count(), 0);
        assert_eq!(session.ready_count(), 0);
        assert!(!session.break_in_progress());
        assert_eq!(session.schedule().len(), 3);
    }

    #[test]
    fn ended_emits_content_complete() {
        let mut session = session_with_duration(60.0);
        let actions = session.handle_player_event(PlayerEvent::Ended);
        assert_eq!(actions, vec![EngineAction::ContentComplete]);
    }

    #[test]
    fn teardown_drops_subsequent_events() {
        let mut session = session_with_duration(60.0);
        session.load_schedule(&[0.0]).unwrap();
        session.handle_ad_event(AdEvent::Ready);
        session.teardown();

        assert!(!session.subscription().is_active());
        assert!(tick(&mut session, 5.0).is_empty());
        assert!(session.handle_ad_event(AdEvent::Ready).is_empty());
    }

    #[test]
    fn teardown_clears_companion() {
        let mut session = session_with_duration(60.0);
        session.handle_ad_event(AdEvent::BreakStarted);
        let actions = session.teardown();
        assert!(actions.iter().any(|a| matches!(a, EngineAction::CancelHide(_))));
        assert!(actions.contains(&EngineAction::HideCompanion));
        assert!(!session.companion_visible());
    }

    #[test]
    fn excess_readiness_signal_logs_warning() {
        let mut session = session_with_duration(60.0);
        session.load_schedule(&[0.0]).unwrap();
        session.handle_ad_event(AdEvent::Ready);
        // One more signal than there are scheduled breaks.
        session.handle_ad_event(AdEvent::Ready);

        assert!(session.log.entries().any(|e| e.level == LogLevel::Warn));
        // The counter still moved; the schedule itself is untouched.
        assert_eq!(session.ready_count(), 2);
        assert_eq!(session.started_count(), 1);
    }

    #[test]
    fn log_buffer_caps_entries() {
        let mut log = LogBuffer::new();
        for i in 0..600 {
            log.push(LogLevel::Info, format!("entry {}", i));
        }
        assert_eq!(log.len(), LOG_BUFFER_MAX);
        // Oldest entries were discarded.
        assert!(log.entries().next().unwrap().message.contains("100"));
    }
}
