//! Fermentation time compensation
//!
//! Dough ferments faster when warm and slower when cold. A fermentation
//! stage's planned duration is scaled by
//!
//! ```text
//! multiplier = Q10 ^ ((baseline - measured) / 10)
//! ```
//!
//! and the multiplier is clamped to configurable bounds so a bad reading
//! can't stretch a stage indefinitely.

use crate::catalog::{Program, Stage};

/// Default lower multiplier bound
pub const DEFAULT_MIN_MULTIPLIER: f32 = 0.25;

/// Default upper multiplier bound
pub const DEFAULT_MAX_MULTIPLIER: f32 = 4.0;

/// Allowed range of the duration multiplier
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MultiplierBounds {
    pub min: f32,
    pub max: f32,
}

impl Default for MultiplierBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_MULTIPLIER,
            max: DEFAULT_MAX_MULTIPLIER,
        }
    }
}

impl MultiplierBounds {
    /// Check the bounds describe a usable range
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.min <= self.max
    }

    /// Clamp a raw multiplier, reporting whether it was out of range
    fn clamp(&self, raw: f64) -> (f64, bool) {
        if raw.is_nan() {
            return (1.0, true);
        }
        let (min, max) = (self.min as f64, self.max as f64);
        if raw < min {
            (min, true)
        } else if raw > max {
            (max, true)
        } else {
            (raw, false)
        }
    }
}

/// Result of compensating one stage
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Compensation {
    /// Effective stage duration (seconds)
    pub seconds: u64,
    /// Multiplier applied to the planned duration
    pub multiplier: f32,
    /// The raw multiplier fell outside the bounds
    pub clamped: bool,
}

impl Compensation {
    /// Stage runs for its planned duration
    pub const fn nominal(seconds: u64) -> Self {
        Self {
            seconds,
            multiplier: 1.0,
            clamped: false,
        }
    }
}

/// Converts planned stage durations into effective ones
#[derive(Debug, Clone, Copy, Default)]
pub struct FermentationCompensator {
    bounds: MultiplierBounds,
}

impl FermentationCompensator {
    pub const fn new(bounds: MultiplierBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> MultiplierBounds {
        self.bounds
    }

    /// Duration multiplier for a program at the given temperature
    ///
    /// Returns the clamped multiplier and whether clamping occurred.
    pub fn multiplier(&self, program: &Program, measured_c: f32) -> (f32, bool) {
        let exponent = (program.ferment_baseline_c as f64 - measured_c as f64) / 10.0;
        let raw = libm::pow(program.ferment_q10 as f64, exponent);
        let (multiplier, clamped) = self.bounds.clamp(raw);
        (multiplier as f32, clamped)
    }

    /// Effective duration of `stage` at the measured temperature
    ///
    /// Non-fermentation stages, and any stage while no temperature is
    /// known, run for exactly their planned duration.
    pub fn effective_duration(
        &self,
        stage: &Stage,
        program: &Program,
        measured_c: Option<f32>,
    ) -> Compensation {
        let planned = stage.planned_s();
        let Some(measured_c) = measured_c.filter(|_| stage.fermentation) else {
            return Compensation::nominal(planned);
        };

        let (multiplier, clamped) = self.multiplier(program, measured_c);
        let seconds = libm::round(planned as f64 * multiplier as f64);
        Compensation {
            seconds: seconds as u64,
            multiplier,
            clamped,
        }
    }
}
