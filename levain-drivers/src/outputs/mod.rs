//! Output bank implementations

pub mod gpio;

pub use gpio::{GpioOutputs, Polarity};
