//! Board-agnostic core logic for the bread machine controller
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Program catalog with load-time validation
//! - Fermentation (Q10) time compensation
//! - Stage scheduler and its state machine, scheduled starts and resume
//!   after power loss
//! - Output driver (static stage outputs, heater thermostat and mix
//!   pattern cursor)
//! - Sensor staleness monitoring and heater fail-safe
//! - Status snapshots for external polling
//! - Controller facade shared between the tick and request contexts
//! - Configuration types and postcard persistence
//! - Hardware abstraction traits (output bank, temperature sensor)

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod catalog;
pub mod config;
pub mod controller;
pub mod outputs;
pub mod safety;
pub mod scheduler;
pub mod state;
pub mod status;
pub mod traits;

pub use controller::{ControlError, Controller};
