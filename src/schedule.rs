//! Cue Point Schedule.
//!
//! An ordered, immutable-once-loaded list of break offsets derived once
//! from the fetched ad schedule. Indices are assigned at load time and
//! never reordered. Per-cue state transitions (`Pending -> Ready ->
//! Started`) are driven from outside: the readiness side flips `Ready`,
//! the break scheduler flips `Started`.

use crate::error::AdError;
use serde::{Deserialize, Serialize};

/// Lifecycle of a single cue point. `Started` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueState {
    Pending,
    Ready,
    Started,
}

/// A scheduled content timestamp at which an ad break should play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuePoint {
    pub index: usize,
    pub offset_secs: f64,
    pub state: CueState,
}

/// Validated cue-point list, ascending by offset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    cues: Vec<CuePoint>,
}

impl Schedule {
    /// Schedule with no cue points (ads abandoned or none delivered).
    pub fn empty() -> Self {
        Schedule { cues: Vec::new() }
    }

    /// Build a schedule from raw break offsets (seconds from content start).
    ///
    /// Rejects negative or non-finite offsets. Offsets are sorted ascending
    /// and duplicates collapse to a single cue point: two breaks at an
    /// identical offset are indistinguishable to a clock-based trigger.
    pub fn load(offsets: &[f64]) -> Result<Schedule, AdError> {
        for &off in offsets {
            if !off.is_finite() {
                return Err(AdError::InvalidSchedule(format!(
                    "offset {} is not a finite number",
                    off
                )));
            }
            if off < 0.0 {
                return Err(AdError::InvalidSchedule(format!(
                    "offset {} is negative",
                    off
                )));
            }
        }

        let mut sorted: Vec<f64> = offsets.to_vec();
        // Offsets are all finite here, so total ordering is safe.
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        sorted.dedup();

        let cues = sorted
            .into_iter()
            .enumerate()
            .map(|(index, offset_secs)| CuePoint {
                index,
                offset_secs,
                state: CueState::Pending,
            })
            .collect();

        Ok(Schedule { cues })
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CuePoint> {
        self.cues.get(index)
    }

    pub fn cues(&self) -> &[CuePoint] {
        &self.cues
    }

    /// Raw offsets in schedule order.
    pub fn offsets(&self) -> Vec<f64> {
        self.cues.iter().map(|c| c.offset_secs).collect()
    }

    /// Flip a pending cue to `Ready`. A cue already ready or started is
    /// left alone (readiness signals can repeat or arrive in a burst).
    pub(crate) fn mark_ready(&mut self, index: usize) {
        if let Some(cue) = self.cues.get_mut(index) {
            if cue.state == CueState::Pending {
                cue.state = CueState::Ready;
            }
        }
    }

    /// Flip a cue to its terminal `Started` state.
    pub(crate) fn mark_started(&mut self, index: usize) {
        if let Some(cue) = self.cues.get_mut(index) {
            cue.state = CueState::Started;
        }
    }

    /// Undo a failed start: the cue goes back to `Ready` so the scheduler
    /// can retry it at the next evaluation.
    pub(crate) fn mark_rolled_back(&mut self, index: usize) {
        if let Some(cue) = self.cues.get_mut(index) {
            if cue.state == CueState::Started {
                cue.state = CueState::Ready;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_sorts_ascending_and_indexes() {
        let schedule = Schedule::load(&[40.0, 0.0, 15.0]).unwrap();
        assert_eq!(schedule.offsets(), vec![0.0, 15.0, 40.0]);
        let indices: Vec<usize> = schedule.cues().iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn load_rejects_negative_offset() {
        let result = Schedule::load(&[0.0, -5.0, 20.0]);
        assert!(matches!(result, Err(AdError::InvalidSchedule(_))));
    }

    #[test]
    fn load_rejects_nan_and_infinity() {
        assert!(Schedule::load(&[f64::NAN]).is_err());
        assert!(Schedule::load(&[f64::INFINITY]).is_err());
    }

    #[test]
    fn duplicate_offsets_collapse() {
        let schedule = Schedule::load(&[15.0, 0.0, 15.0, 15.0]).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.offsets(), vec![0.0, 15.0]);
    }

    #[test]
    fn empty_input_yields_empty_schedule() {
        let schedule = Schedule::load(&[]).unwrap();
        assert!(schedule.is_empty());
        assert_eq!(schedule.len(), 0);
    }

    #[test]
    fn cues_start_pending() {
        let schedule = Schedule::load(&[0.0, 20.0]).unwrap();
        assert!(schedule.cues().iter().all(|c| c.state == CueState::Pending));
    }

    #[test]
    fn mark_ready_only_promotes_pending() {
        let mut schedule = Schedule::load(&[0.0, 20.0]).unwrap();
        schedule.mark_ready(0);
        assert_eq!(schedule.get(0).unwrap().state, CueState::Ready);

        schedule.mark_started(0);
        schedule.mark_ready(0); // must not demote Started
        assert_eq!(schedule.get(0).unwrap().state, CueState::Started);
    }

    #[test]
    fn mark_out_of_range_is_ignored() {
        let mut schedule = Schedule::load(&[0.0]).unwrap();
        schedule.mark_ready(7);
        schedule.mark_started(7);
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn serialization_roundtrip() {
        let schedule = Schedule::load(&[0.0, 15.0, 40.0]).unwrap();
        let json = serde_json::to_string(&schedule).unwrap();
        let loaded: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.offsets(), schedule.offsets());
    }
}
