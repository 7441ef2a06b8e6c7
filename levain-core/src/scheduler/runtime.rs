//! Runtime state of the current run
//!
//! Owned and mutated by the [`StageScheduler`](super::StageScheduler) only;
//! everything else sees a copy through a status snapshot.

use crate::catalog::MAX_STAGES;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timing and temperature state of the current run
///
/// `stage_start_times` is the run's timeline: slots up to `stage_index`
/// hold the epoch second each stage actually began, later slots hold the
/// projected start of each remaining stage and, if it fits, the projected
/// program end in slot `stage_count`. Slots past that are 0.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RuntimeState {
    pub running: bool,
    /// Catalog index the run was started from
    pub program_index: Option<usize>,
    /// Id of the running program
    pub program_id: Option<i32>,
    pub stage_index: usize,
    pub stage_count: usize,
    pub stage_start_times: [u64; MAX_STAGES],
    /// Estimated end of the current stage (epoch s)
    pub stage_ready_at: u64,
    /// Estimated end of the program (epoch s)
    pub program_ready_at: u64,
    /// Temperature used for the latest estimate (°C)
    pub measured_temp_c: Option<f32>,
    /// Current stage target temperature (°C)
    pub set_temp_c: f32,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::idle()
    }
}

impl RuntimeState {
    /// State with nothing running and an empty timeline
    pub const fn idle() -> Self {
        Self {
            running: false,
            program_index: None,
            program_id: None,
            stage_index: 0,
            stage_count: 0,
            stage_start_times: [0; MAX_STAGES],
            stage_ready_at: 0,
            program_ready_at: 0,
            measured_temp_c: None,
            set_temp_c: 0.0,
        }
    }

    /// Epoch second the current stage began
    pub fn stage_started_at(&self) -> u64 {
        self.stage_start_times
            .get(self.stage_index)
            .copied()
            .unwrap_or(0)
    }

    /// Epoch second the run began
    pub fn program_started_at(&self) -> u64 {
        self.stage_start_times[0]
    }

    /// Seconds spent in the current stage
    pub fn stage_elapsed_s(&self, now: u64) -> u64 {
        now.saturating_sub(self.stage_started_at())
    }

    /// Seconds until the current stage is estimated to end
    pub fn stage_remaining_s(&self, now: u64) -> u64 {
        self.stage_ready_at.saturating_sub(now)
    }

    /// Seconds until the program is estimated to end
    pub fn program_remaining_s(&self, now: u64) -> u64 {
        self.program_ready_at.saturating_sub(now)
    }

    /// What needs to be stored to pick this run up after a power loss
    pub fn resume_record(&self) -> Option<ResumeRecord> {
        if !self.running {
            return None;
        }
        let mut stage_start_times = [0; MAX_STAGES];
        let actual = self.stage_index + 1;
        stage_start_times[..actual].copy_from_slice(&self.stage_start_times[..actual]);
        Some(ResumeRecord {
            program_id: self.program_id?,
            stage_index: self.stage_index as u8,
            stage_start_times,
        })
    }
}

/// Persisted progress of a run
///
/// Only the actual start times (slots up to `stage_index`) are kept;
/// projections are recomputed on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResumeRecord {
    pub program_id: i32,
    pub stage_index: u8,
    pub stage_start_times: [u64; MAX_STAGES],
}

impl ResumeRecord {
    /// Check the record describes a possible run
    ///
    /// The stage must fit the timeline and actual start times can't go
    /// backwards.
    pub fn is_consistent(&self) -> bool {
        let stage = self.stage_index as usize;
        stage < MAX_STAGES
            && self.stage_start_times[..=stage]
                .windows(2)
                .all(|pair| pair[0] <= pair[1])
    }
}

/// Program start armed for a later time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduledStart {
    pub program_index: usize,
    /// Stage to start at
    pub stage: usize,
    /// Start time (epoch s)
    pub at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_state() {
        let state = RuntimeState::idle();
        assert!(!state.running);
        assert_eq!(state.program_index, None);
        assert_eq!(state.stage_start_times, [0; MAX_STAGES]);
        assert_eq!(state.stage_remaining_s(100), 0);
    }

    #[test]
    fn test_elapsed_and_remaining() {
        let mut state = RuntimeState::idle();
        state.running = true;
        state.stage_index = 1;
        state.stage_start_times[0] = 1_000;
        state.stage_start_times[1] = 1_060;
        state.stage_ready_at = 1_360;
        state.program_ready_at = 2_000;

        assert_eq!(state.program_started_at(), 1_000);
        assert_eq!(state.stage_elapsed_s(1_100), 40);
        assert_eq!(state.stage_remaining_s(1_100), 260);
        assert_eq!(state.program_remaining_s(1_100), 900);
        assert_eq!(state.program_remaining_s(5_000), 0);
    }

    #[test]
    fn test_resume_record_keeps_actual_starts() {
        assert_eq!(RuntimeState::idle().resume_record(), None);

        let mut state = RuntimeState::idle();
        state.running = true;
        state.program_id = Some(4);
        state.stage_index = 1;
        state.stage_count = 3;
        state.stage_start_times[..4].copy_from_slice(&[1_000, 1_060, 1_360, 1_660]);

        let record = state.resume_record().unwrap();
        assert_eq!(record.program_id, 4);
        assert_eq!(record.stage_index, 1);
        assert_eq!(record.stage_start_times, [1_000, 1_060, 0, 0, 0, 0, 0, 0]);
        assert!(record.is_consistent());
    }

    #[test]
    fn test_inconsistent_resume_record() {
        let mut record = ResumeRecord {
            program_id: 1,
            stage_index: 2,
            stage_start_times: [100, 50, 200, 0, 0, 0, 0, 0],
        };
        assert!(!record.is_consistent());

        record.stage_start_times[1] = 150;
        assert!(record.is_consistent());

        record.stage_index = MAX_STAGES as u8;
        assert!(!record.is_consistent());
    }
}
