//! Output driving
//!
//! Maps the active stage's static settings and its mix pattern onto the
//! machine's switched outputs. The heater is regulated toward the stage
//! target and sits under a fail-safe override.

pub mod driver;
pub mod thermostat;

pub use driver::{MixStep, OutputDriver, OutputState};
pub use thermostat::{Thermostat, DEFAULT_HYSTERESIS_C};
