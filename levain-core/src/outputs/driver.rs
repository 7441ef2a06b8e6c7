//! Output driver implementation

use crate::catalog::{MixKind, Stage};
use crate::traits::{Output, OutputBank};

use super::thermostat::Thermostat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// On/off state of every output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputState {
    pub heater: bool,
    pub motor: bool,
    pub light: bool,
    pub buzzer: bool,
}

impl OutputState {
    /// Everything off
    pub const OFF: Self = Self {
        heater: false,
        motor: false,
        light: false,
        buzzer: false,
    };

    pub fn get(&self, output: Output) -> bool {
        match output {
            Output::Heater => self.heater,
            Output::Motor => self.motor,
            Output::Light => self.light,
            Output::Buzzer => self.buzzer,
        }
    }

    pub fn set(&mut self, output: Output, on: bool) {
        match output {
            Output::Heater => self.heater = on,
            Output::Motor => self.motor = on,
            Output::Light => self.light = on,
            Output::Buzzer => self.buzzer = on,
        }
    }

    /// Check if anything is energized
    pub fn any_on(&self) -> bool {
        Output::ALL.iter().any(|&o| self.get(o))
    }
}

/// Position within a stage's mix pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MixStep {
    /// Index of the active action, `None` once the pattern is exhausted
    pub index: Option<usize>,
    /// Active action
    pub action: Option<MixKind>,
    /// Seconds left in the active action
    pub remaining_s: u64,
}

/// Drives the output bank from stage settings
///
/// A stage's `heater` flag enables regulation; the heater itself follows
/// the thermostat toward the stage target. Only writes to the bank when
/// an output actually changes.
#[derive(Debug)]
pub struct OutputDriver<O: OutputBank> {
    bank: O,
    /// Stage whose static settings are applied
    active_stage: Option<usize>,
    /// Outputs the stage asks for (`heater`: regulation enabled)
    requested: OutputState,
    thermostat: Thermostat,
    /// Active stage target (°C)
    target_c: f32,
    /// Outputs last written to the bank
    applied: OutputState,
    /// Heater forced off
    fail_safe: bool,
    mix: MixStep,
}

impl<O: OutputBank> OutputDriver<O> {
    /// Take ownership of the bank and switch everything off
    pub fn new(bank: O) -> Self {
        Self::with_thermostat(bank, Thermostat::default())
    }

    /// Same as [`OutputDriver::new`] with a given thermostat
    pub fn with_thermostat(mut bank: O, thermostat: Thermostat) -> Self {
        bank.all_off();
        Self {
            bank,
            active_stage: None,
            requested: OutputState::OFF,
            thermostat,
            target_c: 0.0,
            applied: OutputState::OFF,
            fail_safe: false,
            mix: MixStep::default(),
        }
    }

    /// Apply a stage's static heater/light/buzzer settings
    ///
    /// Does nothing if `stage_index` is already the active stage. Returns
    /// whether the settings were (re)applied.
    pub fn apply(&mut self, stage_index: usize, stage: &Stage) -> bool {
        if self.active_stage == Some(stage_index) {
            return false;
        }
        debug!(
            "Applying stage {} outputs: heater={} light={} buzzer={}",
            stage_index,
            stage.heater,
            stage.light,
            stage.buzzer
        );
        self.active_stage = Some(stage_index);
        self.target_c = stage.target_temp_c;
        self.thermostat.reset();
        self.requested = OutputState {
            heater: stage.heater,
            motor: false,
            light: stage.light,
            buzzer: stage.buzzer,
        };
        self.mix = MixStep::default();
        self.write();
        true
    }

    /// Locate the active mix action `elapsed_s` seconds into a stage
    ///
    /// The pattern plays once from the start of the stage; zero-length
    /// actions are passed over.
    pub fn step_mix_pattern(stage: &Stage, elapsed_s: u64) -> MixStep {
        let mut end = 0u64;
        for (index, action) in stage.mix_pattern.iter().enumerate() {
            end += action.duration_s as u64;
            if elapsed_s < end {
                return MixStep {
                    index: Some(index),
                    action: Some(action.kind),
                    remaining_s: end - elapsed_s,
                };
            }
        }
        MixStep::default()
    }

    /// Drive the motor from the mix pattern
    pub fn update_mix(&mut self, stage: &Stage, elapsed_s: u64) -> MixStep {
        let step = Self::step_mix_pattern(stage, elapsed_s);
        if step.index != self.mix.index {
            match step.action {
                Some(kind) => trace!("Mix action {:?}: {}", step.index, kind.as_str()),
                None => trace!("Mix pattern exhausted"),
            }
        }
        self.mix = step;
        self.requested.motor = step.action == Some(MixKind::Mix);
        self.write();
        step
    }

    /// Regulate the heater toward the active stage target
    ///
    /// Returns whether the thermostat asks for heat. Has no effect on the
    /// bank unless the stage enables the heater.
    pub fn regulate(&mut self, measured_c: Option<f32>) -> bool {
        let was = self.thermostat.is_heating();
        let heating = self.thermostat.update(self.target_c, measured_c);
        if heating != was && self.requested.heater {
            debug!(
                "Heater {} at {:?} C, target {} C",
                if heating { "on" } else { "off" },
                measured_c,
                self.target_c
            );
        }
        self.write();
        heating
    }

    /// Force the heater off (or release it)
    pub fn set_fail_safe(&mut self, active: bool) {
        if active == self.fail_safe {
            return;
        }
        if active {
            warn!("Heater fail-safe engaged");
        } else {
            info!("Heater fail-safe released");
        }
        self.fail_safe = active;
        self.write();
    }

    /// Switch everything off and forget the active stage
    pub fn clear(&mut self) {
        self.active_stage = None;
        self.requested = OutputState::OFF;
        self.thermostat.reset();
        self.mix = MixStep::default();
        self.write();
    }

    /// Outputs as currently driven
    pub fn state(&self) -> OutputState {
        self.applied
    }

    pub fn mix(&self) -> MixStep {
        self.mix
    }

    pub fn fail_safe(&self) -> bool {
        self.fail_safe
    }

    pub fn thermostat(&self) -> &Thermostat {
        &self.thermostat
    }

    pub fn active_stage(&self) -> Option<usize> {
        self.active_stage
    }

    pub fn bank(&self) -> &O {
        &self.bank
    }

    fn write(&mut self) {
        let mut target = self.requested;
        target.heater = target.heater && self.thermostat.is_heating() && !self.fail_safe;
        for output in Output::ALL {
            let on = target.get(output);
            if on != self.applied.get(output) {
                self.bank.set(output, on);
            }
        }
        self.applied = target;
    }
}
