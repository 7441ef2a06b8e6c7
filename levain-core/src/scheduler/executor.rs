//! Program execution scheduler
//!
//! Runs a baking program stage by stage. Each tick re-estimates the
//! current stage's end from the latest temperature and advances when it
//! has passed. Generates events for state machine transitions.

use crate::catalog::{Program, ProgramCatalog, SelectionError, Stage, MAX_STAGES};
use crate::state::{Event, State};

use super::compensator::{FermentationCompensator, MultiplierBounds};
use super::runtime::{ResumeRecord, RuntimeState};

/// Program scheduler
///
/// Sole writer of [`RuntimeState`]. The running program is copied out of
/// the catalog on start, so replacing the catalog mid-run never changes
/// what is being executed.
#[derive(Debug, Clone)]
pub struct StageScheduler {
    /// Current run state
    state: State,
    /// Program being executed (copied for the duration of the run)
    program: Option<Program>,
    /// Timing state, copied into status snapshots
    runtime: RuntimeState,
    compensator: FermentationCompensator,
    /// Multiplier applied to the current stage at the latest estimate
    multiplier: f32,
    /// Latest estimate had to clamp the multiplier
    clamped: bool,
    /// The catalog changed under the running program
    catalog_changed: bool,
}

impl Default for StageScheduler {
    fn default() -> Self {
        Self::new(MultiplierBounds::default())
    }
}

impl StageScheduler {
    /// Create an idle scheduler
    pub fn new(bounds: MultiplierBounds) -> Self {
        Self {
            state: State::Idle,
            program: None,
            runtime: RuntimeState::idle(),
            compensator: FermentationCompensator::new(bounds),
            multiplier: 1.0,
            clamped: false,
            catalog_changed: false,
        }
    }

    /// Get current run state
    pub fn state(&self) -> State {
        self.state
    }

    pub fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }

    /// Program being executed
    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// Stage being executed
    pub fn current_stage(&self) -> Option<&Stage> {
        if !self.state.is_running() {
            return None;
        }
        self.program.as_ref()?.stage(self.runtime.stage_index)
    }

    /// Multiplier applied to the current stage
    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Whether the latest estimate clamped the multiplier
    pub fn duration_clamped(&self) -> bool {
        self.clamped
    }

    /// Whether the catalog changed under the running program
    pub fn catalog_changed(&self) -> bool {
        self.catalog_changed
    }

    /// Start a program from its first stage
    ///
    /// Returns `Ok(None)` if a program is already running.
    pub fn start(
        &mut self,
        catalog: &ProgramCatalog,
        program_index: usize,
        now: u64,
        measured_c: Option<f32>,
    ) -> Result<Option<Event>, SelectionError> {
        self.start_at_stage(catalog, program_index, 0, now, measured_c)
    }

    /// Start a program at a given stage
    ///
    /// Stages before `stage_index` are recorded as having started and
    /// ended at `now`.
    pub fn start_at_stage(
        &mut self,
        catalog: &ProgramCatalog,
        program_index: usize,
        stage_index: usize,
        now: u64,
        measured_c: Option<f32>,
    ) -> Result<Option<Event>, SelectionError> {
        if !self.state.can_start() {
            debug!("Start ignored, already in {:?}", self.state);
            return Ok(None);
        }

        let program = catalog.resolve(program_index, stage_index)?;
        let mut starts = [0; MAX_STAGES];
        for slot in starts.iter_mut().take(stage_index + 1) {
            *slot = now;
        }
        info!(
            "Program {} started at stage {}",
            program.name.as_str(),
            stage_index
        );
        Ok(Some(self.begin(
            program_index,
            program,
            stage_index,
            starts,
            now,
            measured_c,
        )))
    }

    /// Pick a run back up from a stored record
    ///
    /// The program is found by id. Actual stage start times are restored;
    /// a stage that ran out while the power was off ends at `now`.
    pub fn resume(
        &mut self,
        catalog: &ProgramCatalog,
        record: &ResumeRecord,
        now: u64,
        measured_c: Option<f32>,
    ) -> Result<Option<Event>, SelectionError> {
        if !self.state.can_start() {
            debug!("Resume ignored, already in {:?}", self.state);
            return Ok(None);
        }

        let program_index = catalog.find_by_id(record.program_id)?;
        let stage_index = record.stage_index as usize;
        let program = catalog.resolve(program_index, stage_index)?;
        let mut starts = [0; MAX_STAGES];
        starts[..=stage_index].copy_from_slice(&record.stage_start_times[..=stage_index]);
        info!(
            "Program {} resumed at stage {}",
            program.name.as_str(),
            stage_index
        );
        Ok(Some(self.begin(
            program_index,
            program,
            stage_index,
            starts,
            now,
            measured_c,
        )))
    }

    /// Enter `Running` on a copy of `program` and catch up to `now`
    fn begin(
        &mut self,
        program_index: usize,
        program: &Program,
        stage_index: usize,
        starts: [u64; MAX_STAGES],
        now: u64,
        measured_c: Option<f32>,
    ) -> Event {
        let mut runtime = RuntimeState::idle();
        runtime.running = true;
        runtime.program_index = Some(program_index);
        runtime.program_id = Some(program.id);
        runtime.stage_index = stage_index;
        runtime.stage_count = program.stage_count();
        runtime.measured_temp_c = measured_c;
        runtime.stage_start_times = starts;

        self.runtime = runtime;
        self.program = Some(program.clone());
        self.catalog_changed = false;
        self.state = self.state.transition(Event::Start);

        // A zero-length first stage advances right away
        match self.tick(now, measured_c) {
            None | Some(Event::StageAdvanced) => Event::Start,
            Some(other) => other,
        }
    }

    /// Update the schedule with the current time and temperature
    ///
    /// Returns the last transition that occurred, if any. A stage that
    /// elapsed starts the next one at `now`; zero-length stages pass
    /// within the same tick.
    pub fn tick(&mut self, now: u64, measured_c: Option<f32>) -> Option<Event> {
        if !self.state.is_running() {
            return None;
        }
        if measured_c.is_some() {
            self.runtime.measured_temp_c = measured_c;
        }

        let mut event = None;
        loop {
            self.estimate();
            if now < self.runtime.stage_ready_at {
                return event;
            }

            let next = self.runtime.stage_index + 1;
            if next >= self.runtime.stage_count {
                return Some(self.finish());
            }
            self.enter_stage(next, now);
            event = Some(Event::StageAdvanced);
        }
    }

    /// Skip to the next stage now, finishing the program past the last one
    pub fn advance(&mut self, now: u64) -> Option<Event> {
        if !self.state.is_running() {
            return None;
        }
        let next = self.runtime.stage_index + 1;
        if next >= self.runtime.stage_count {
            return Some(self.finish());
        }
        self.enter_stage(next, now);
        self.estimate();
        Some(Event::StageAdvanced)
    }

    /// Restart the previous stage now (the first stage restarts itself)
    pub fn back(&mut self, now: u64) -> Option<Event> {
        if !self.state.is_running() {
            return None;
        }
        let target = self.runtime.stage_index.saturating_sub(1);
        self.enter_stage(target, now);
        self.estimate();
        Some(Event::StageRewound)
    }

    /// Stop the run and discard its timing
    ///
    /// Returns `None` if nothing was running.
    pub fn stop(&mut self) -> Option<Event> {
        if self.state == State::Idle {
            return None;
        }
        info!("Program stopped at stage {}", self.runtime.stage_index);
        self.reset();
        self.state = self.state.transition(Event::Stop);
        Some(Event::Stop)
    }

    /// Leave `Done` once completion has been observed
    pub fn settle(&mut self) -> Option<Event> {
        if self.state != State::Done {
            return None;
        }
        self.state = self.state.transition(Event::Settled);
        Some(Event::Settled)
    }

    /// Note that the catalog changed under the running program
    pub fn flag_catalog_change(&mut self) {
        if self.state.is_running() && !self.catalog_changed {
            warn!("Catalog changed under running program");
            self.catalog_changed = true;
        }
    }

    fn enter_stage(&mut self, index: usize, now: u64) {
        self.runtime.stage_index = index;
        if let Some(slot) = self.runtime.stage_start_times.get_mut(index) {
            *slot = now;
        }
        if let Some(stage) = self.program.as_ref().and_then(|p| p.stage(index)) {
            info!("Stage {} ({}) started", index, stage.label.as_str());
        }
    }

    fn finish(&mut self) -> Event {
        info!("Program finished");
        self.reset();
        self.state = self.state.transition(Event::ProgramFinished);
        Event::ProgramFinished
    }

    fn reset(&mut self) {
        let measured = self.runtime.measured_temp_c;
        self.runtime = RuntimeState::idle();
        self.runtime.measured_temp_c = measured;
        self.program = None;
        self.multiplier = 1.0;
        self.clamped = false;
        self.catalog_changed = false;
    }

    /// Recompute the current stage's end and project the remaining stages
    fn estimate(&mut self) {
        let Some(program) = self.program.as_ref() else {
            return;
        };
        let runtime = &mut self.runtime;
        let Some(stage) = program.stage(runtime.stage_index) else {
            return;
        };

        let current =
            self.compensator
                .effective_duration(stage, program, runtime.measured_temp_c);
        if current.clamped && !self.clamped {
            warn!("Duration multiplier clamped to {}", current.multiplier);
        }
        self.multiplier = current.multiplier;
        self.clamped = current.clamped;

        runtime.set_temp_c = stage.target_temp_c;
        runtime.stage_ready_at = runtime.stage_started_at().saturating_add(current.seconds);

        let mut at = runtime.stage_ready_at;
        for index in runtime.stage_index + 1..MAX_STAGES {
            runtime.stage_start_times[index] = if index <= runtime.stage_count { at } else { 0 };
            if let Some(next) = program.stage(index) {
                let effective =
                    self.compensator
                        .effective_duration(next, program, runtime.measured_temp_c);
                at = at.saturating_add(effective.seconds);
            }
        }
        runtime.program_ready_at = at;
    }
}
