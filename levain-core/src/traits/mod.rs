//! Hardware abstraction traits
//!
//! These traits define the interface between the application logic
//! and hardware-specific implementations.

pub mod outputs;
pub mod sensor;

pub use outputs::{Output, OutputBank};
pub use sensor::{SensorError, TemperatureSensor};
