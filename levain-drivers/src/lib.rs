//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in levain-core for the bread machine's hardware:
//!
//! - Output bank (heater, motor, light, buzzer) over `embedded-hal` pins
//! - RTD temperature sensor with a piecewise-linear calibration table
//! - Trimmed-mean temperature averaging

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod outputs;
pub mod sensor;
