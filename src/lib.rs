//! midroll — Ad-break synchronization engine for video playback.
//!
//! Reconciles two independently-arriving signal streams (the content
//! player's clock and the ad subsystem's readiness notifications) into a
//! single monotonic sequence of break starts, plus the companion-overlay
//! lifecycle that rides along. The CLI consumes this crate to run
//! simulated sessions.

pub mod break_log;
pub mod break_scheduler;
pub mod clock;
pub mod companion;
pub mod config;
pub mod error;
pub mod events;
pub mod readiness;
pub mod schedule;
pub mod session;
