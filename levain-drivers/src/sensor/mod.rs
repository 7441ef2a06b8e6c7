//! Temperature sensor implementations

pub mod averaging;
pub mod rtd;

pub use averaging::TemperatureAverager;
pub use rtd::{AdcReader, CalibrationError, CalibrationPoint, CalibrationTable, RtdSensor};
