//! Main controller coordinating catalog, scheduler, outputs and status
//!
//! The controller is shared between the periodic tick context and the
//! request context (status polling, catalog upload, control commands).
//! It owns:
//! - The program catalog
//! - The stage scheduler, the program selection and any scheduled start
//! - The output driver and sensor monitor
//! - The published status snapshot
//!
//! Locks are always taken in the order catalog, core, status. Every
//! mutation publishes a fresh snapshot before the core lock is released,
//! so snapshots are published in the order the mutations happened.

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use heapless::Vec;

use crate::catalog::{
    Program, ProgramCatalog, ProgramDraft, SelectionError, ValidationError, MAX_PROGRAMS,
};
use crate::config::{ConfigError, ControllerConfig};
use crate::outputs::{OutputDriver, Thermostat};
use crate::safety::SensorMonitor;
use crate::scheduler::{ResumeRecord, ScheduledStart, StageScheduler};
use crate::state::Event;
use crate::status::{StatusReporter, StatusSnapshot};
use crate::traits::{OutputBank, SensorError, TemperatureSensor};

/// Control command failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Program or stage could not be resolved
    Selection(SelectionError),
    /// Sensor still settling after boot
    StartupDelay { remaining_s: u64 },
    /// Command needs a running program
    NotRunning,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::Selection(e) => fmt::Display::fmt(e, f),
            ControlError::StartupDelay { remaining_s } => {
                write!(f, "startup delay active, {remaining_s} s remaining")
            }
            ControlError::NotRunning => f.write_str("no program running"),
        }
    }
}

impl From<SelectionError> for ControlError {
    fn from(e: SelectionError) -> Self {
        ControlError::Selection(e)
    }
}

/// State mutated by the tick and by control commands
struct Core<O: OutputBank> {
    scheduler: StageScheduler,
    outputs: OutputDriver<O>,
    sensor: SensorMonitor,
    /// Pending program selection
    selected: Option<usize>,
    /// Start armed for later
    schedule: Option<ScheduledStart>,
    /// Time of the latest tick or command (epoch s)
    last_now: u64,
}

impl<O: OutputBank> Core<O> {
    /// Bring the outputs in line with the scheduler
    fn sync_outputs(&mut self, now: u64) {
        match self.scheduler.current_stage() {
            Some(stage) => {
                let runtime = self.scheduler.runtime();
                self.outputs.apply(runtime.stage_index, stage);
                self.outputs.regulate(self.sensor.temperature());
                self.outputs.update_mix(stage, runtime.stage_elapsed_s(now));
            }
            None => self.outputs.clear(),
        }
        self.outputs.set_fail_safe(self.sensor.is_degraded(now));
    }

    /// Sync outputs and publish the resulting snapshot
    fn publish<M: RawMutex>(&mut self, now: u64, generation: u32, status: &StatusReporter<M>) {
        self.last_now = self.last_now.max(now);
        self.sync_outputs(now);

        let mut snapshot = StatusSnapshot::capture(
            now,
            &self.scheduler,
            self.outputs.state(),
            self.outputs.mix(),
            self.sensor.temperature(),
            self.sensor.is_degraded(now),
        );
        snapshot.selected = self.selected;
        snapshot.scheduled = self.schedule;
        snapshot.generation = generation;
        status.publish(snapshot);
    }
}

/// Bread machine controller
///
/// `M` picks the mutex flavour: `CriticalSectionRawMutex` when the tick
/// and request contexts run on different executors or threads,
/// `NoopRawMutex` when everything runs in one.
pub struct Controller<M: RawMutex, O: OutputBank> {
    config: ControllerConfig,
    /// Boot time (epoch s), start of the startup delay
    boot_at: u64,
    catalog: Mutex<M, RefCell<ProgramCatalog>>,
    core: Mutex<M, RefCell<Core<O>>>,
    status: StatusReporter<M>,
}

impl<M: RawMutex, O: OutputBank> Controller<M, O> {
    /// Create a controller with an empty catalog
    ///
    /// All outputs are switched off and an idle snapshot is published.
    pub fn new(config: ControllerConfig, bank: O, boot_at: u64) -> Result<Self, ConfigError> {
        config.validate()?;

        let controller = Self {
            config,
            boot_at,
            catalog: Mutex::new(RefCell::new(ProgramCatalog::new())),
            core: Mutex::new(RefCell::new(Core {
                scheduler: StageScheduler::new(config.bounds()),
                outputs: OutputDriver::with_thermostat(
                    bank,
                    Thermostat::new(config.heater_hysteresis_c),
                ),
                sensor: SensorMonitor::new(config.sensor_stale_after_s),
                selected: None,
                schedule: None,
                last_now: boot_at,
            })),
            status: StatusReporter::new(),
        };
        controller.with_core(|catalog, core| {
            core.publish(boot_at, catalog.generation(), &controller.status)
        });

        info!(
            "Controller ready: stale after {} s, multiplier {}..{}",
            config.sensor_stale_after_s,
            config.min_multiplier,
            config.max_multiplier
        );
        Ok(controller)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Period the embedding loop must call [`Controller::tick`] at (s)
    pub fn tick_interval_s(&self) -> u32 {
        self.config.tick_interval_s
    }

    /// Run `f` with the catalog and core locked, in lock order
    fn with_core<R>(&self, f: impl FnOnce(&ProgramCatalog, &mut Core<O>) -> R) -> R {
        self.catalog.lock(|catalog| {
            let catalog = catalog.borrow();
            self.core
                .lock(|core| f(&catalog, &mut core.borrow_mut()))
        })
    }

    /// Load the catalog (same as [`Controller::replace_catalog`])
    pub fn load_catalog(&self, drafts: &[ProgramDraft<'_>]) -> Result<u32, ValidationError> {
        self.replace_catalog(drafts)
    }

    /// Validate and atomically replace the whole catalog
    ///
    /// Validation runs before any lock is taken. A running program keeps
    /// going on its own copy; if the replace removed or re-assigned its
    /// index, the snapshot carries a catalog-changed notice.
    pub fn replace_catalog(&self, drafts: &[ProgramDraft<'_>]) -> Result<u32, ValidationError> {
        let programs = ProgramCatalog::validate(drafts).inspect_err(|e| {
            warn!("Catalog rejected: {:?}", e);
        })?;
        Ok(self.install_catalog(programs))
    }

    /// Install programs decoded from storage
    ///
    /// Same as [`Controller::replace_catalog`] for programs that are
    /// already typed, e.g. read back with `config::decode_catalog`.
    pub fn restore_catalog(
        &self,
        programs: Vec<Program, MAX_PROGRAMS>,
    ) -> Result<u32, ValidationError> {
        ProgramCatalog::check(&programs).inspect_err(|e| {
            warn!("Stored catalog rejected: {:?}", e);
        })?;
        Ok(self.install_catalog(programs))
    }

    fn install_catalog(&self, programs: Vec<Program, MAX_PROGRAMS>) -> u32 {
        self.catalog.lock(|catalog| {
            let mut catalog = catalog.borrow_mut();
            let generation = catalog.install(programs);

            self.core.lock(|core| {
                let mut core = core.borrow_mut();
                let runtime = *core.scheduler.runtime();
                if let (Some(index), Some(id)) = (runtime.program_index, runtime.program_id) {
                    if catalog.get(index).map(|p| p.id) != Ok(id) {
                        core.scheduler.flag_catalog_change();
                    }
                }
                if core.selected.is_some_and(|i| i >= catalog.len()) {
                    debug!("Selection cleared by catalog replace");
                    core.selected = None;
                }
                if let Some(armed) = core.schedule {
                    if catalog.resolve(armed.program_index, armed.stage).is_err() {
                        warn!("Scheduled start cleared by catalog replace");
                        core.schedule = None;
                    }
                }
                let now = core.last_now;
                core.publish(now, generation, &self.status);
            });
            generation
        })
    }

    /// Read the catalog
    ///
    /// `f` runs with the catalog locked and must not call back into the
    /// controller.
    pub fn programs<R>(&self, f: impl FnOnce(&[Program]) -> R) -> R {
        self.catalog.lock(|catalog| f(catalog.borrow().programs()))
    }

    pub fn catalog_generation(&self) -> u32 {
        self.catalog.lock(|catalog| catalog.borrow().generation())
    }

    /// Select a program by index without starting it
    pub fn select(&self, index: usize) -> Result<(), ControlError> {
        self.with_core(|catalog, core| {
            catalog.get(index)?;
            core.selected = Some(index);
            debug!("Program {} selected", index);
            let now = core.last_now;
            core.publish(now, catalog.generation(), &self.status);
            Ok(())
        })
    }

    /// Select a program by exact name without starting it
    pub fn select_by_name(&self, name: &str) -> Result<usize, ControlError> {
        self.with_core(|catalog, core| {
            let index = catalog.find_by_name(name)?;
            core.selected = Some(index);
            debug!("Program {} selected", index);
            let now = core.last_now;
            core.publish(now, catalog.generation(), &self.status);
            Ok(index)
        })
    }

    /// Pending program selection
    pub fn selected(&self) -> Option<usize> {
        self.core.lock(|core| core.borrow().selected)
    }

    /// Start the selected program
    ///
    /// Returns `Ok(false)` if a program is already running.
    pub fn start(&self, now: u64) -> Result<bool, ControlError> {
        self.with_core(|catalog, core| {
            if core.scheduler.state().is_running() {
                return Ok(false);
            }
            let index = core.selected.ok_or(SelectionError::NothingSelected)?;
            self.start_locked(catalog, core, index, 0, now)
        })
    }

    /// Select and start a program
    pub fn start_program(&self, index: usize, now: u64) -> Result<bool, ControlError> {
        self.start_at_stage(index, 0, now)
    }

    /// Select and start a program at a given stage
    pub fn start_at_stage(
        &self,
        index: usize,
        stage: usize,
        now: u64,
    ) -> Result<bool, ControlError> {
        self.with_core(|catalog, core| {
            if core.scheduler.state().is_running() {
                return Ok(false);
            }
            self.start_locked(catalog, core, index, stage, now)
        })
    }

    fn start_locked(
        &self,
        catalog: &ProgramCatalog,
        core: &mut Core<O>,
        index: usize,
        stage: usize,
        now: u64,
    ) -> Result<bool, ControlError> {
        if let Some(remaining_s) = self.startup_remaining_s(now) {
            warn!("Start refused, startup delay {} s remaining", remaining_s);
            return Err(ControlError::StartupDelay { remaining_s });
        }

        let temp = core.sensor.temperature();
        let event = core
            .scheduler
            .start_at_stage(catalog, index, stage, now, temp)
            .inspect_err(|e| warn!("Start refused: {:?}", e))?;
        core.selected = Some(index);
        if event.is_some() && core.schedule.take().is_some() {
            debug!("Scheduled start superseded");
        }
        if event == Some(Event::ProgramFinished) {
            core.scheduler.settle();
        }
        core.publish(now, catalog.generation(), &self.status);
        Ok(event.is_some())
    }

    /// Seconds left of the startup delay, if any
    fn startup_remaining_s(&self, now: u64) -> Option<u64> {
        let ready_at = self.boot_at.saturating_add(self.config.startup_delay_s);
        (now < ready_at).then(|| ready_at - now)
    }

    /// Arm a program to start at `at` (epoch s)
    ///
    /// The tick starts it once `at` has passed and the startup delay is
    /// over. Replaces any earlier schedule and selects the program.
    /// Returns `Ok(false)` if a program is already running.
    pub fn schedule_start(
        &self,
        index: usize,
        stage: usize,
        at: u64,
        now: u64,
    ) -> Result<bool, ControlError> {
        self.with_core(|catalog, core| {
            if core.scheduler.state().is_running() {
                return Ok(false);
            }
            catalog
                .resolve(index, stage)
                .inspect_err(|e| warn!("Schedule refused: {:?}", e))?;
            core.schedule = Some(ScheduledStart {
                program_index: index,
                stage,
                at,
            });
            core.selected = Some(index);
            info!("Program {} scheduled at {} (stage {})", index, at, stage);
            core.publish(now, catalog.generation(), &self.status);
            Ok(true)
        })
    }

    /// Drop a scheduled start
    ///
    /// Returns `false` if nothing was scheduled.
    pub fn cancel_schedule(&self, now: u64) -> bool {
        self.with_core(|catalog, core| {
            let cancelled = core.schedule.take().is_some();
            if cancelled {
                info!("Scheduled start cancelled");
                core.publish(now, catalog.generation(), &self.status);
            }
            cancelled
        })
    }

    /// Start armed for later, if any
    pub fn scheduled(&self) -> Option<ScheduledStart> {
        self.core.lock(|core| core.borrow().schedule)
    }

    /// Pick up a run interrupted by a power loss
    ///
    /// Not subject to the startup delay: until the first good reading the
    /// sensor counts as degraded and the heater stays off. Returns
    /// `Ok(false)` if a program is already running.
    pub fn resume(&self, record: &ResumeRecord, now: u64) -> Result<bool, ControlError> {
        self.with_core(|catalog, core| {
            let temp = core.sensor.temperature();
            let event = core
                .scheduler
                .resume(catalog, record, now, temp)
                .inspect_err(|e| warn!("Resume refused: {:?}", e))?;
            if let Some(index) = core.scheduler.runtime().program_index {
                core.selected = Some(index);
            }
            if event == Some(Event::ProgramFinished) {
                core.scheduler.settle();
            }
            core.publish(now, catalog.generation(), &self.status);
            Ok(event.is_some())
        })
    }

    /// Progress to persist, `None` while idle
    pub fn resume_record(&self) -> Option<ResumeRecord> {
        self.core
            .lock(|core| core.borrow().scheduler.runtime().resume_record())
    }

    /// Stop whatever is running and drop any scheduled start
    ///
    /// Returns `false` if there was neither.
    pub fn stop(&self, now: u64) -> bool {
        self.with_core(|catalog, core| {
            let stopped = core.scheduler.stop().is_some();
            let cancelled = core.schedule.take().is_some();
            core.publish(now, catalog.generation(), &self.status);
            stopped || cancelled
        })
    }

    /// Skip to the next stage (finishing the program past the last one)
    pub fn advance(&self, now: u64) -> Result<Event, ControlError> {
        self.navigate(now, StageScheduler::advance)
    }

    /// Restart the previous stage
    pub fn back(&self, now: u64) -> Result<Event, ControlError> {
        self.navigate(now, StageScheduler::back)
    }

    fn navigate(
        &self,
        now: u64,
        step: impl FnOnce(&mut StageScheduler, u64) -> Option<Event>,
    ) -> Result<Event, ControlError> {
        self.with_core(|catalog, core| {
            let event = step(&mut core.scheduler, now).ok_or(ControlError::NotRunning)?;
            if event == Event::ProgramFinished {
                core.scheduler.settle();
            }
            core.publish(now, catalog.generation(), &self.status);
            Ok(event)
        })
    }

    /// Periodic tick with a sensor reading taken at `now`
    ///
    /// Records the reading, advances the schedule, drives the outputs
    /// and publishes a snapshot. Returns the scheduler transition, if any.
    pub fn tick(&self, now: u64, reading: Result<f32, SensorError>) -> Option<Event> {
        self.with_core(|catalog, core| {
            core.sensor.record(now, reading);
            let started = self.fire_schedule(catalog, core, now);
            let temp = core.sensor.temperature();
            let event = core.scheduler.tick(now, temp).or(started);

            // The Done snapshot goes out before the scheduler settles
            core.publish(now, catalog.generation(), &self.status);
            if event == Some(Event::ProgramFinished) {
                core.scheduler.settle();
            }
            event
        })
    }

    /// Start a due scheduled program
    ///
    /// A schedule that can no longer start is dropped; one held back by
    /// the startup delay waits for a later tick.
    fn fire_schedule(
        &self,
        catalog: &ProgramCatalog,
        core: &mut Core<O>,
        now: u64,
    ) -> Option<Event> {
        let armed = core.schedule?;
        if now < armed.at || self.startup_remaining_s(now).is_some() {
            return None;
        }
        if core.scheduler.state().is_running() {
            return None;
        }
        info!("Scheduled start of program {} due", armed.program_index);
        match self.start_locked(catalog, core, armed.program_index, armed.stage, now) {
            Ok(true) => Some(Event::Start),
            Ok(false) => None,
            Err(e) => {
                warn!("Scheduled start failed: {:?}", e);
                core.schedule = None;
                None
            }
        }
    }

    /// Periodic tick reading the given sensor
    pub fn tick_with<S: TemperatureSensor>(&self, now: u64, sensor: &mut S) -> Option<Event> {
        let reading = sensor.read_celsius();
        self.tick(now, reading)
    }

    /// Latest published snapshot
    ///
    /// Never blocks on hardware; only copies the published value.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// Status publisher, for waiting on updates
    pub fn status(&self) -> &StatusReporter<M> {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MixActionDraft, MixKind, StageDraft};
    use crate::outputs::OutputState;
    use crate::traits::Output;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[derive(Debug, Default)]
    struct MockBank {
        state: OutputState,
    }

    impl OutputBank for MockBank {
        fn set(&mut self, output: Output, on: bool) {
            self.state.set(output, on);
        }

        fn is_on(&self, output: Output) -> bool {
            self.state.get(output)
        }
    }

    const PATTERN: [MixActionDraft; 2] = [
        MixActionDraft::new(MixKind::Mix, 30),
        MixActionDraft::new(MixKind::Wait, 30),
    ];

    fn stages() -> [StageDraft<'static>; 2] {
        let mut knead = StageDraft::new("Knead", 2, 25.0);
        knead.mix_pattern = &PATTERN;
        knead.light = true;
        let mut bake = StageDraft::new("Bake", 3, 180.0);
        bake.heater = true;
        [knead, bake]
    }

    fn controller() -> Controller<NoopRawMutex, MockBank> {
        let config = ControllerConfig {
            startup_delay_s: 0,
            ..Default::default()
        };
        Controller::new(config, MockBank::default(), 0).unwrap()
    }

    #[test]
    fn test_new_publishes_idle() {
        let ctl = controller();
        let snapshot = ctl.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.stage.as_str(), "Idle");
        assert_eq!(snapshot.generation, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ControllerConfig {
            tick_interval_s: 0,
            ..Default::default()
        };
        let result = Controller::<NoopRawMutex, _>::new(config, MockBank::default(), 0);
        assert!(matches!(result, Err(ConfigError::ZeroTickInterval)));
    }

    #[test]
    fn test_select_then_start() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();

        assert_eq!(
            ctl.start(10),
            Err(ControlError::Selection(SelectionError::NothingSelected))
        );

        ctl.select(0).unwrap();
        assert_eq!(ctl.selected(), Some(0));
        assert!(!ctl.snapshot().running);
        assert_eq!(ctl.snapshot().selected, Some(0));

        assert_eq!(ctl.start(10), Ok(true));
        let snapshot = ctl.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.stage.as_str(), "Knead");
        assert!(snapshot.outputs.light);
        assert!(snapshot.outputs.motor);

        // Idempotent while running
        assert_eq!(ctl.start(20), Ok(false));
    }

    #[test]
    fn test_select_unknown() {
        let ctl = controller();
        assert_eq!(
            ctl.select(3),
            Err(ControlError::Selection(SelectionError::UnknownIndex(3)))
        );
        assert_eq!(
            ctl.select_by_name("Rye"),
            Err(ControlError::Selection(SelectionError::UnknownName))
        );
    }

    #[test]
    fn test_select_by_name() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[
            ProgramDraft::new(1, "Basic", &stages),
            ProgramDraft::new(2, "Rye", &stages),
        ])
        .unwrap();

        assert_eq!(ctl.select_by_name("Rye"), Ok(1));
        assert_eq!(ctl.selected(), Some(1));
    }

    #[test]
    fn test_startup_delay() {
        let config = ControllerConfig::default();
        let ctl: Controller<NoopRawMutex, _> =
            Controller::new(config, MockBank::default(), 1_000).unwrap();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();

        assert_eq!(
            ctl.start_program(0, 1_010),
            Err(ControlError::StartupDelay { remaining_s: 5 })
        );
        assert!(!ctl.snapshot().running);
        assert_eq!(ctl.start_program(0, 1_015), Ok(true));
    }

    #[test]
    fn test_tick_drives_mix_and_stages() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();
        ctl.start_program(0, 0).unwrap();

        ctl.tick(10, Ok(24.0));
        assert!(ctl.snapshot().outputs.motor);

        ctl.tick(40, Ok(24.0));
        let snapshot = ctl.snapshot();
        assert!(!snapshot.outputs.motor);
        assert_eq!(snapshot.mix.index, Some(1));

        assert_eq!(ctl.tick(120, Ok(24.0)), Some(Event::StageAdvanced));
        let snapshot = ctl.snapshot();
        assert_eq!(snapshot.stage.as_str(), "Bake");
        assert!(snapshot.outputs.heater);
        assert!(!snapshot.outputs.light);
        assert!(!snapshot.outputs.motor);
        assert_eq!(snapshot.set_temp, 180.0);

        assert_eq!(ctl.tick(300, Ok(24.0)), Some(Event::ProgramFinished));
        let snapshot = ctl.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.stage.as_str(), "Idle");
        assert!(!snapshot.outputs.any_on());

        // Settled: a new start is accepted
        assert_eq!(ctl.start_program(0, 400), Ok(true));
    }

    #[test]
    fn test_stop_clears_outputs() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();
        ctl.start_program(0, 0).unwrap();
        ctl.tick(5, Ok(24.0));

        assert!(ctl.stop(6));
        let snapshot = ctl.snapshot();
        assert!(!snapshot.running);
        assert!(!snapshot.outputs.any_on());
        assert_eq!(snapshot.stage_start_times, [0; 8]);

        assert!(!ctl.stop(7));
    }

    #[test]
    fn test_advance_and_back() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();

        assert_eq!(ctl.advance(0), Err(ControlError::NotRunning));

        ctl.start_program(0, 0).unwrap();
        assert_eq!(ctl.advance(10), Ok(Event::StageAdvanced));
        assert_eq!(ctl.snapshot().stage.as_str(), "Bake");
        assert_eq!(ctl.back(20), Ok(Event::StageRewound));
        assert_eq!(ctl.snapshot().stage.as_str(), "Knead");

        ctl.advance(30).unwrap();
        assert_eq!(ctl.advance(40), Ok(Event::ProgramFinished));
        assert!(!ctl.snapshot().running);
        assert_eq!(ctl.back(50), Err(ControlError::NotRunning));
    }

    #[test]
    fn test_replace_flags_running_program() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[
            ProgramDraft::new(1, "Basic", &stages),
            ProgramDraft::new(2, "Rye", &stages),
        ])
        .unwrap();
        ctl.start_program(1, 0).unwrap();

        // Same ids at the same positions: nothing to report
        ctl.replace_catalog(&[
            ProgramDraft::new(1, "Basic", &stages),
            ProgramDraft::new(2, "Rye", &stages[..1]),
        ])
        .unwrap();
        assert!(!ctl.snapshot().catalog_changed);

        // Running index no longer exists
        let generation = ctl
            .replace_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();
        assert_eq!(generation, 3);

        let snapshot = ctl.snapshot();
        assert!(snapshot.running);
        assert!(snapshot.catalog_changed);
        assert_eq!(snapshot.program.as_str(), "Rye");
        assert_eq!(snapshot.generation, 3);
    }

    #[test]
    fn test_rejected_replace_keeps_catalog() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();

        let bad = [
            ProgramDraft::new(1, "a", &stages),
            ProgramDraft::new(1, "b", &stages),
        ];
        assert_eq!(
            ctl.replace_catalog(&bad),
            Err(ValidationError::DuplicateId { id: 1 })
        );
        assert_eq!(ctl.catalog_generation(), 1);
        ctl.programs(|programs| {
            assert_eq!(programs.len(), 1);
            assert_eq!(programs[0].name.as_str(), "Basic");
        });
    }

    #[test]
    fn test_sensor_fault_forces_heater_off() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();
        ctl.tick(0, Ok(24.0));
        ctl.start_at_stage(0, 1, 0).unwrap();
        assert!(ctl.snapshot().outputs.heater);

        // Within the window the last good value holds
        ctl.tick(30, Err(SensorError::OpenCircuit));
        let snapshot = ctl.snapshot();
        assert!(snapshot.outputs.heater);
        assert!(!snapshot.sensor_degraded);

        ctl.tick(31, Err(SensorError::OpenCircuit));
        let snapshot = ctl.snapshot();
        assert!(!snapshot.outputs.heater);
        assert!(snapshot.sensor_degraded);
        assert_eq!(snapshot.temp, Some(24.0));
        assert!(snapshot.running);

        ctl.tick(32, Ok(25.0));
        assert!(ctl.snapshot().outputs.heater);
    }

    #[test]
    fn test_heater_regulates_to_stage_target() {
        let mut proof = StageDraft::new("Proof", 60, 35.0);
        proof.heater = true;
        let stages = [proof];
        let ctl = controller();
        ctl.load_catalog(&[ProgramDraft::new(1, "Proof", &stages)])
            .unwrap();
        ctl.tick(0, Ok(20.0));
        ctl.start_program(0, 0).unwrap();
        assert!(ctl.snapshot().outputs.heater);

        ctl.tick(10, Ok(95.0));
        let snapshot = ctl.snapshot();
        assert_eq!(snapshot.set_temp, 35.0);
        assert_eq!(snapshot.temp, Some(95.0));
        assert!(!snapshot.outputs.heater);

        // Inside the band on the way down: still off
        ctl.tick(20, Ok(34.5));
        assert!(!ctl.snapshot().outputs.heater);
        ctl.tick(30, Ok(33.0));
        assert!(ctl.snapshot().outputs.heater);
    }

    #[test]
    fn test_tick_interval() {
        let config = ControllerConfig {
            tick_interval_s: 5,
            ..Default::default()
        };
        let ctl: Controller<NoopRawMutex, _> =
            Controller::new(config, MockBank::default(), 0).unwrap();
        assert_eq!(ctl.tick_interval_s(), 5);
    }

    #[test]
    fn test_scheduled_start_fires_on_tick() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();

        assert_eq!(ctl.schedule_start(0, 0, 100, 0), Ok(true));
        let snapshot = ctl.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.selected, Some(0));
        assert_eq!(snapshot.scheduled.map(|s| s.at), Some(100));

        assert_eq!(ctl.tick(99, Ok(24.0)), None);
        assert!(!ctl.snapshot().running);

        assert_eq!(ctl.tick(100, Ok(24.0)), Some(Event::Start));
        let snapshot = ctl.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.stage_start_times[0], 100);
        assert_eq!(snapshot.scheduled, None);
        assert_eq!(ctl.scheduled(), None);
    }

    #[test]
    fn test_scheduled_start_at_stage() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();

        assert_eq!(
            ctl.schedule_start(0, 2, 100, 0),
            Err(ControlError::Selection(SelectionError::StageOutOfRange {
                stage: 2,
                count: 2
            }))
        );
        assert_eq!(ctl.scheduled(), None);

        ctl.schedule_start(0, 1, 100, 0).unwrap();
        ctl.tick(150, Ok(24.0));
        let snapshot = ctl.snapshot();
        assert_eq!(snapshot.stage.as_str(), "Bake");
        assert_eq!(snapshot.stage_start_times[..2], [150, 150]);
    }

    #[test]
    fn test_stop_cancels_schedule() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();
        ctl.schedule_start(0, 0, 100, 0).unwrap();

        assert!(ctl.stop(10));
        assert_eq!(ctl.snapshot().scheduled, None);
        ctl.tick(100, Ok(24.0));
        assert!(!ctl.snapshot().running);
        assert!(!ctl.stop(110));

        ctl.schedule_start(0, 0, 200, 110).unwrap();
        assert!(ctl.cancel_schedule(120));
        assert!(!ctl.cancel_schedule(130));
    }

    #[test]
    fn test_schedule_waits_out_startup_delay() {
        let ctl: Controller<NoopRawMutex, _> =
            Controller::new(ControllerConfig::default(), MockBank::default(), 1_000).unwrap();
        let stages = stages();
        ctl.load_catalog(&[ProgramDraft::new(1, "Basic", &stages)])
            .unwrap();
        ctl.schedule_start(0, 0, 1_005, 1_000).unwrap();

        ctl.tick(1_005, Ok(24.0));
        assert!(!ctl.snapshot().running);
        assert!(ctl.scheduled().is_some());

        assert_eq!(ctl.tick(1_015, Ok(24.0)), Some(Event::Start));
        assert!(ctl.snapshot().running);
    }

    #[test]
    fn test_schedule_while_running_and_manual_start() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[
            ProgramDraft::new(1, "Basic", &stages),
            ProgramDraft::new(2, "Rye", &stages),
        ])
        .unwrap();

        ctl.schedule_start(1, 0, 500, 0).unwrap();
        // A manual start supersedes the schedule
        ctl.start_program(0, 10).unwrap();
        assert_eq!(ctl.scheduled(), None);
        assert_eq!(ctl.schedule_start(1, 0, 500, 20), Ok(false));

        ctl.tick(500, Ok(24.0));
        assert_eq!(ctl.snapshot().program.as_str(), "Basic");
    }

    #[test]
    fn test_catalog_replace_drops_stale_schedule() {
        let ctl = controller();
        let stages = stages();
        ctl.load_catalog(&[
            ProgramDraft::new(1, "Basic", &stages),
            ProgramDraft::new(2, "Rye", &stages),
        ])
        .unwrap();
        ctl.schedule_start(1, 1, 100, 0).unwrap();

        ctl.replace_catalog(&[
            ProgramDraft::new(1, "Basic", &stages),
            ProgramDraft::new(2, "Rye", &stages[..1]),
        ])
        .unwrap();
        assert_eq!(ctl.scheduled(), None);
        ctl.tick(100, Ok(24.0));
        assert!(!ctl.snapshot().running);
    }

    #[test]
    fn test_resume_after_power_loss() {
        let stages = stages();
        let drafts = [ProgramDraft::new(7, "Basic", &stages)];

        let before = controller();
        before.load_catalog(&drafts).unwrap();
        assert_eq!(before.resume_record(), None);
        before.start_program(0, 1_000).unwrap();
        before.tick(1_130, Ok(24.0));
        let record = before.resume_record().unwrap();
        assert_eq!(record.program_id, 7);
        assert_eq!(record.stage_index, 1);

        // Power comes back inside the startup delay
        let after: Controller<NoopRawMutex, _> =
            Controller::new(ControllerConfig::default(), MockBank::default(), 1_200).unwrap();
        after.load_catalog(&drafts).unwrap();
        assert_eq!(after.resume(&record, 1_200), Ok(true));

        let snapshot = after.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.stage.as_str(), "Bake");
        assert_eq!(snapshot.selected, Some(0));
        assert_eq!(snapshot.stage_start_times[..3], [1_000, 1_130, 1_310]);
        // No reading since boot: heater held off
        assert!(!snapshot.outputs.heater);

        after.tick(1_201, Ok(24.0));
        assert!(after.snapshot().outputs.heater);
        assert_eq!(after.resume(&record, 1_202), Ok(false));
    }

    #[test]
    fn test_resume_unknown_program() {
        let ctl = controller();
        let record = ResumeRecord {
            program_id: 3,
            stage_index: 0,
            stage_start_times: [0; 8],
        };
        assert_eq!(
            ctl.resume(&record, 0),
            Err(ControlError::Selection(SelectionError::UnknownId(3)))
        );
        assert!(!ctl.snapshot().running);
    }

    #[test]
    fn test_restore_catalog() {
        let stages = stages();
        let drafts = [
            ProgramDraft::new(1, "Basic", &stages),
            ProgramDraft::new(2, "Rye", &stages),
        ];
        let programs = ProgramCatalog::validate(&drafts).unwrap();

        let ctl = controller();
        assert_eq!(ctl.restore_catalog(programs.clone()), Ok(1));
        assert_eq!(ctl.select_by_name("Rye"), Ok(1));
        ctl.programs(|stored| assert_eq!(stored, programs.as_slice()));

        let mut duplicate = programs;
        duplicate[1].id = 1;
        assert_eq!(
            ctl.restore_catalog(duplicate),
            Err(ValidationError::DuplicateId { id: 1 })
        );
        assert_eq!(ctl.catalog_generation(), 1);
    }

    #[test]
    fn test_tick_with_sensor() {
        struct FixedSensor(f32);

        impl TemperatureSensor for FixedSensor {
            fn read_celsius(&mut self) -> Result<f32, SensorError> {
                Ok(self.0)
            }
        }

        let ctl = controller();
        ctl.tick_with(5, &mut FixedSensor(22.5));
        assert_eq!(ctl.snapshot().temp, Some(22.5));
        assert!(!ctl.snapshot().sensor_degraded);
    }
}
