//! Safety monitoring
//!
//! Tracks temperature sensor health. Short dropouts are ridden out on the
//! last good value; beyond the staleness window the heater is forced off.

pub mod monitor;

pub use monitor::{SafetyStatus, SensorFault, SensorMonitor, DEFAULT_STALE_AFTER_S};
