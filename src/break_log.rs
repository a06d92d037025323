//! JSON-based break play log.
//!
//! Records every started ad break (per-date, per-hour, with its cue offset)
//! and keeps a bounded list of start failures. Loads from disk on each
//! operation and saves after mutations, so concurrent CLI invocations see
//! fresh data without a daemon.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_FAILURES: usize = 50;

/// One recorded break start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakPlay {
    /// Hour of day (0-23).
    pub hour: u8,
    /// Schedule index of the break.
    pub index: usize,
    /// Cue offset in content seconds.
    pub offset_secs: f64,
}

/// Failure record for a break start attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakFailure {
    /// Timestamp in "MM-DD-YY HH:MM" format.
    pub t: String,
    /// Schedule index of the break that failed.
    pub index: usize,
    /// Error description.
    pub err: String,
}

/// Play data: date_str ("MM-DD-YY") -> plays that day.
pub type BreakPlayData = HashMap<String, Vec<BreakPlay>>;

/// Summary statistics over the play log.
#[derive(Debug, Clone, Serialize)]
pub struct BreakStatistics {
    pub total_plays: usize,
    /// Per-date play counts, sorted by date string.
    pub per_date: Vec<(String, usize)>,
    pub failure_count: usize,
}

/// Persistent logger for break plays and failures.
pub struct BreakPlayLogger {
    plays_path: PathBuf,
    failures_path: PathBuf,
}

impl BreakPlayLogger {
    /// Logger storing its files in the given directory.
    pub fn new(directory: &Path) -> Self {
        Self {
            plays_path: directory.join("break_plays.json"),
            failures_path: directory.join("break_failures.json"),
        }
    }

    /// Record a break start at the current date and hour.
    pub fn log_play(&self, index: usize, offset_secs: f64) {
        let now = Local::now();
        let date_key = now.format("%m-%d-%y").to_string();
        let hour = now.format("%H").to_string().parse::<u8>().unwrap_or(0);
        self.log_play_at(&date_key, hour, index, offset_secs);
    }

    /// Record a break start at a specific date and hour (for testing).
    pub fn log_play_at(&self, date_key: &str, hour: u8, index: usize, offset_secs: f64) {
        let mut data = self.load_plays();
        data.entry(date_key.to_string()).or_default().push(BreakPlay {
            hour,
            index,
            offset_secs,
        });
        self.save_plays(&data);
    }

    /// Record a start failure. Trims to MAX_FAILURES (oldest discarded).
    pub fn log_failure(&self, index: usize, error: &str) {
        let timestamp = Local::now().format("%m-%d-%y %H:%M").to_string();
        let mut failures = self.load_failures();
        failures.push(BreakFailure {
            t: timestamp,
            index,
            err: error.to_string(),
        });
        if failures.len() > MAX_FAILURES {
            let excess = failures.len() - MAX_FAILURES;
            failures.drain(..excess);
        }
        self.save_failures(&failures);
    }

    /// Summary: total plays, per-date counts, failure count.
    pub fn statistics(&self) -> BreakStatistics {
        let data = self.load_plays();
        let total_plays = data.values().map(|plays| plays.len()).sum();
        let mut per_date: Vec<(String, usize)> = data
            .iter()
            .map(|(date, plays)| (date.clone(), plays.len()))
            .collect();
        per_date.sort();
        BreakStatistics {
            total_plays,
            per_date,
            failure_count: self.load_failures().len(),
        }
    }

    /// Sorted play hours for a specific date.
    pub fn play_hours_for_date(&self, date_key: &str) -> Vec<u8> {
        let data = self.load_plays();
        let mut hours: Vec<u8> = data
            .get(date_key)
            .map(|plays| plays.iter().map(|p| p.hour).collect())
            .unwrap_or_default();
        hours.sort();
        hours
    }

    /// All failure records, oldest first.
    pub fn failures(&self) -> Vec<BreakFailure> {
        self.load_failures()
    }

    /// Clear all play data and failures.
    pub fn reset_all(&self) {
        self.save_plays(&HashMap::new());
        self.save_failures(&Vec::new());
    }

    // --- Private helpers ---

    fn load_plays(&self) -> BreakPlayData {
        load_json_or_default(&self.plays_path)
    }

    fn save_plays(&self, data: &BreakPlayData) {
        save_json(&self.plays_path, data);
    }

    fn load_failures(&self) -> Vec<BreakFailure> {
        load_json_or_default(&self.failures_path)
    }

    fn save_failures(&self, data: &Vec<BreakFailure>) {
        save_json(&self.failures_path, data);
    }
}

fn load_json_or_default<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> T {
    match fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
        Err(_) => T::default(),
    }
}

fn save_json<T: Serialize>(path: &Path, data: &T) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    match serde_json::to_string_pretty(data) {
        Ok(json) => {
            if let Err(e) = fs::write(path, json) {
                eprintln!("Warning: could not write '{}': {}", path.display(), e);
            }
        }
        Err(e) => eprintln!("Warning: could not serialize log: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_logger() -> (tempfile::TempDir, BreakPlayLogger) {
        let dir = tempfile::tempdir().unwrap();
        let logger = BreakPlayLogger::new(dir.path());
        (dir, logger)
    }

    #[test]
    fn log_play_accumulates_per_date() {
        let (_dir, logger) = make_logger();
        logger.log_play_at("01-15-26", 9, 0, 0.0);
        logger.log_play_at("01-15-26", 9, 1, 15.0);
        logger.log_play_at("01-16-26", 14, 0, 0.0);

        let stats = logger.statistics();
        assert_eq!(stats.total_plays, 3);
        assert_eq!(
            stats.per_date,
            vec![("01-15-26".to_string(), 2), ("01-16-26".to_string(), 1)]
        );
    }

    #[test]
    fn play_hours_are_sorted() {
        let (_dir, logger) = make_logger();
        logger.log_play_at("01-15-26", 17, 0, 0.0);
        logger.log_play_at("01-15-26", 9, 1, 15.0);
        logger.log_play_at("01-15-26", 12, 2, 40.0);
        assert_eq!(logger.play_hours_for_date("01-15-26"), vec![9, 12, 17]);
    }

    #[test]
    fn unknown_date_has_no_hours() {
        let (_dir, logger) = make_logger();
        assert!(logger.play_hours_for_date("12-31-99").is_empty());
    }

    #[test]
    fn failures_are_trimmed_to_cap() {
        let (_dir, logger) = make_logger();
        for i in 0..(MAX_FAILURES + 10) {
            logger.log_failure(i, "start() threw");
        }
        let failures = logger.failures();
        assert_eq!(failures.len(), MAX_FAILURES);
        // Oldest were discarded.
        assert_eq!(failures[0].index, 10);
    }

    #[test]
    fn reset_all_clears_everything() {
        let (_dir, logger) = make_logger();
        logger.log_play_at("01-15-26", 9, 0, 0.0);
        logger.log_failure(0, "boom");
        logger.reset_all();

        let stats = logger.statistics();
        assert_eq!(stats.total_plays, 0);
        assert_eq!(stats.failure_count, 0);
    }

    #[test]
    fn survives_missing_files() {
        let (_dir, logger) = make_logger();
        let stats = logger.statistics();
        assert_eq!(stats.total_plays, 0);
        assert_eq!(stats.failure_count, 0);
    }
}
