//! Status snapshot type

use heapless::String;

use crate::catalog::{MAX_LABEL_LEN, MAX_NAME_LEN, MAX_STAGES};
use crate::outputs::{MixStep, OutputState};
use crate::scheduler::{ScheduledStart, StageScheduler};

/// Stage name reported while nothing runs
pub const IDLE_STAGE: &str = "Idle";

/// Read-only view of the controller state at one instant
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusSnapshot {
    pub running: bool,
    /// Current stage label, [`IDLE_STAGE`] when not running
    pub stage: String<MAX_LABEL_LEN>,
    pub stage_index: Option<usize>,
    /// Actual and projected stage start times (epoch s)
    pub stage_start_times: [u64; MAX_STAGES],
    pub stage_ready_at: u64,
    pub program_ready_at: u64,
    /// Running program name, empty when idle
    pub program: String<MAX_NAME_LEN>,
    pub program_id: Option<i32>,
    pub program_index: Option<usize>,
    /// Selected (pending) program index
    pub selected: Option<usize>,
    /// Start armed for later
    pub scheduled: Option<ScheduledStart>,
    /// Last known temperature (°C)
    pub temp: Option<f32>,
    /// Current stage target temperature (°C)
    pub set_temp: f32,
    pub outputs: OutputState,
    pub mix: MixStep,
    /// Multiplier applied to the current stage
    pub fermentation_factor: f32,
    /// Temperature is older than the staleness window
    pub sensor_degraded: bool,
    /// Fermentation multiplier hit a bound
    pub duration_clamped: bool,
    /// Catalog was replaced while this program was running
    pub catalog_changed: bool,
    /// Uncompensated time to program end (s)
    pub time_left_s: u64,
    /// Compensated time to program end (s)
    pub adjusted_time_left_s: u64,
    /// Time since program start (s)
    pub elapsed_s: u64,
    /// Time to the end of the current stage (s)
    pub remaining_s: u64,
    /// Catalog generation at capture
    pub generation: u32,
    /// When this snapshot was taken (epoch s)
    pub taken_at: u64,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::idle(0)
    }
}

/// Copy a label, truncating at a char boundary if it can't fit
fn label<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl StatusSnapshot {
    /// Snapshot with nothing running
    pub fn idle(taken_at: u64) -> Self {
        Self {
            running: false,
            stage: label(IDLE_STAGE),
            stage_index: None,
            stage_start_times: [0; MAX_STAGES],
            stage_ready_at: 0,
            program_ready_at: 0,
            program: String::new(),
            program_id: None,
            program_index: None,
            selected: None,
            scheduled: None,
            temp: None,
            set_temp: 0.0,
            outputs: OutputState::OFF,
            mix: MixStep::default(),
            fermentation_factor: 1.0,
            sensor_degraded: false,
            duration_clamped: false,
            catalog_changed: false,
            time_left_s: 0,
            adjusted_time_left_s: 0,
            elapsed_s: 0,
            remaining_s: 0,
            generation: 0,
            taken_at,
        }
    }

    /// Capture the scheduler's state together with the driven outputs
    pub fn capture(
        now: u64,
        scheduler: &StageScheduler,
        outputs: OutputState,
        mix: MixStep,
        temp: Option<f32>,
        sensor_degraded: bool,
    ) -> Self {
        let mut snapshot = Self::idle(now);
        snapshot.temp = temp;
        snapshot.sensor_degraded = sensor_degraded;

        let (Some(program), Some(stage)) = (scheduler.program(), scheduler.current_stage())
        else {
            return snapshot;
        };
        let rt = scheduler.runtime();

        let stage_elapsed = rt.stage_elapsed_s(now);
        let planned_rest: u64 = program
            .stages
            .iter()
            .skip(rt.stage_index + 1)
            .map(|s| s.planned_s())
            .sum();

        snapshot.running = rt.running;
        snapshot.stage = label(stage.label.as_str());
        snapshot.stage_index = Some(rt.stage_index);
        snapshot.stage_start_times = rt.stage_start_times;
        snapshot.stage_ready_at = rt.stage_ready_at;
        snapshot.program_ready_at = rt.program_ready_at;
        snapshot.program = program.name.clone();
        snapshot.program_id = rt.program_id;
        snapshot.program_index = rt.program_index;
        snapshot.set_temp = rt.set_temp_c;
        snapshot.outputs = outputs;
        snapshot.mix = mix;
        snapshot.fermentation_factor = scheduler.multiplier();
        snapshot.duration_clamped = scheduler.duration_clamped();
        snapshot.catalog_changed = scheduler.catalog_changed();
        snapshot.time_left_s = stage.planned_s().saturating_sub(stage_elapsed) + planned_rest;
        snapshot.adjusted_time_left_s = rt.program_remaining_s(now);
        snapshot.elapsed_s = now.saturating_sub(rt.program_started_at());
        snapshot.remaining_s = rt.stage_remaining_s(now);
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProgramCatalog, ProgramDraft, StageDraft};

    #[test]
    fn test_idle_snapshot() {
        let snapshot = StatusSnapshot::idle(42);
        assert!(!snapshot.running);
        assert_eq!(snapshot.stage.as_str(), IDLE_STAGE);
        assert_eq!(snapshot.program.as_str(), "");
        assert_eq!(snapshot.stage_start_times.len(), 8);
        assert!(!snapshot.outputs.any_on());
        assert_eq!(snapshot.taken_at, 42);
    }

    #[test]
    fn test_capture_idle_scheduler() {
        let sched = StageScheduler::default();
        let snapshot =
            StatusSnapshot::capture(10, &sched, OutputState::OFF, MixStep::default(), Some(21.0), false);
        assert!(!snapshot.running);
        assert_eq!(snapshot.stage.as_str(), "Idle");
        assert_eq!(snapshot.temp, Some(21.0));
    }

    #[test]
    fn test_capture_running() {
        let mut bulk = StageDraft::new("Bulk", 10, 27.0);
        bulk.fermentation = true;
        let stages = [StageDraft::new("Mix", 5, 25.0), bulk];
        let mut catalog = ProgramCatalog::new();
        catalog
            .load(&[ProgramDraft::new(3, "Sourdough", &stages)])
            .unwrap();

        let mut sched = StageScheduler::default();
        sched.start(&catalog, 0, 1_000, Some(30.0)).unwrap();

        let outputs = OutputState {
            light: true,
            ..OutputState::OFF
        };
        let snapshot =
            StatusSnapshot::capture(1_100, &sched, outputs, MixStep::default(), Some(30.0), false);

        assert!(snapshot.running);
        assert_eq!(snapshot.stage.as_str(), "Mix");
        assert_eq!(snapshot.program.as_str(), "Sourdough");
        assert_eq!(snapshot.program_id, Some(3));
        assert_eq!(snapshot.stage_index, Some(0));
        assert_eq!(snapshot.set_temp, 25.0);
        assert_eq!(snapshot.stage_ready_at, 1_300);
        assert_eq!(snapshot.stage_start_times[1], 1_300);
        // Bulk at 30°C runs for half its planned 600 s
        assert_eq!(snapshot.program_ready_at, 1_600);
        assert_eq!(snapshot.stage_start_times[2], 1_600);
        assert_eq!(snapshot.time_left_s, 200 + 600);
        assert_eq!(snapshot.adjusted_time_left_s, 500);
        assert_eq!(snapshot.elapsed_s, 100);
        assert_eq!(snapshot.remaining_s, 200);
        assert!(snapshot.outputs.light);
    }
}
