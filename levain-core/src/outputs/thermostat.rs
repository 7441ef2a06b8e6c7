//! Heater thermostat
//!
//! On/off regulation with hysteresis toward the stage target. The heater
//! turns on below `target - hysteresis` and off above
//! `target + hysteresis`; inside the band it keeps its last state.

/// Default hysteresis (°C)
pub const DEFAULT_HYSTERESIS_C: f32 = 1.0;

/// Bang-bang regulator for the heater
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thermostat {
    hysteresis_c: f32,
    /// Latest demand
    heating: bool,
}

impl Default for Thermostat {
    fn default() -> Self {
        Self::new(DEFAULT_HYSTERESIS_C)
    }
}

impl Thermostat {
    pub const fn new(hysteresis_c: f32) -> Self {
        Self {
            hysteresis_c,
            heating: false,
        }
    }

    pub fn hysteresis_c(&self) -> f32 {
        self.hysteresis_c
    }

    /// Whether the latest update asked for heat
    pub fn is_heating(&self) -> bool {
        self.heating
    }

    /// Drop any demand, e.g. on a stage change
    pub fn reset(&mut self) {
        self.heating = false;
    }

    /// Update the demand from the measured temperature
    ///
    /// Without a reading there is no demand.
    pub fn update(&mut self, target_c: f32, measured_c: Option<f32>) -> bool {
        let Some(temp) = measured_c.filter(|t| t.is_finite()) else {
            self.heating = false;
            return false;
        };

        if temp < target_c - self.hysteresis_c {
            self.heating = true;
        } else if temp > target_c + self.hysteresis_c {
            self.heating = false;
        }
        self.heating
    }
}
