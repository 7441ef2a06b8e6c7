//! Temperature sensor trait

use core::fmt;

/// Errors that can occur with temperature sensing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Sensor disconnected (open circuit)
    OpenCircuit,
    /// Sensor shorted to ground
    ShortCircuit,
    /// Reading out of expected range
    OutOfRange,
    /// ADC conversion error
    ConversionError,
    /// Not enough samples collected yet
    NotReady,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensorError::OpenCircuit => "sensor open circuit",
            SensorError::ShortCircuit => "sensor short circuit",
            SensorError::OutOfRange => "reading out of range",
            SensorError::ConversionError => "ADC conversion error",
            SensorError::NotReady => "sensor not ready",
        })
    }
}

/// Trait for temperature sensors
///
/// Implementations handle the specific sensor type (RTD, NTC thermistor,
/// thermocouple...). The controller never blocks on a sensor: a failed
/// read is reported as an error and the last good value is used instead.
pub trait TemperatureSensor {
    /// Read the current temperature in degrees Celsius
    ///
    /// Takes `&mut self` because ADC reads typically require mutable access.
    fn read_celsius(&mut self) -> Result<f32, SensorError>;

    /// Check if the sensor reading is valid
    fn is_valid(&mut self) -> bool {
        self.read_celsius().is_ok()
    }
}
