//! RTD temperature sensor
//!
//! The RTD sits in a divider on an ADC pin. Raw counts are converted to
//! degrees with a piecewise-linear calibration table measured on the
//! actual machine, which absorbs the divider, the ADC's non-linearity and
//! the probe's offset in one step.

use heapless::Vec;
use levain_core::traits::{SensorError, TemperatureSensor};

/// Maximum number of calibration points
pub const MAX_CALIBRATION_POINTS: usize = 16;

/// Lowest plausible reading (°C)
pub const MIN_VALID_C: f32 = -40.0;

/// Highest plausible reading (°C)
pub const MAX_VALID_C: f32 = 250.0;

/// Full-scale count of a 12-bit ADC
pub const DEFAULT_ADC_MAX: u16 = 4095;

/// ADC reading trait for platform abstraction
pub trait AdcReader {
    /// Read the raw ADC count
    #[allow(clippy::result_unit_err)]
    fn read(&mut self) -> Result<u16, ()>;
}

/// One measured (raw count, temperature) pair
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationPoint {
    pub raw: u16,
    pub temp_c: f32,
}

impl CalibrationPoint {
    pub const fn new(raw: u16, temp_c: f32) -> Self {
        Self { raw, temp_c }
    }
}

/// Reasons a calibration table is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Fewer than two points
    TooFewPoints,
    /// More than [`MAX_CALIBRATION_POINTS`]
    TooManyPoints,
    /// Raw counts must be strictly increasing
    NotIncreasing { index: usize },
    /// Temperature is NaN or infinite
    NonFinite { index: usize },
}

impl core::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CalibrationError::TooFewPoints => f.write_str("calibration needs at least two points"),
            CalibrationError::TooManyPoints => f.write_str("too many calibration points"),
            CalibrationError::NotIncreasing { index } => {
                write!(f, "calibration point {} is not above the previous one", index)
            }
            CalibrationError::NonFinite { index } => {
                write!(f, "calibration point {} has a non-finite temperature", index)
            }
        }
    }
}

/// Piecewise-linear raw→°C mapping
///
/// Sorted by raw count. Readings below the first point or above the last
/// one are clamped to that point's temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    points: Vec<CalibrationPoint, MAX_CALIBRATION_POINTS>,
}

impl CalibrationTable {
    pub fn new(points: &[CalibrationPoint]) -> Result<Self, CalibrationError> {
        if points.len() < 2 {
            return Err(CalibrationError::TooFewPoints);
        }
        let points: Vec<_, MAX_CALIBRATION_POINTS> =
            Vec::from_slice(points).map_err(|_| CalibrationError::TooManyPoints)?;

        for (index, point) in points.iter().enumerate() {
            if !point.temp_c.is_finite() {
                return Err(CalibrationError::NonFinite { index });
            }
            if index > 0 && point.raw <= points[index - 1].raw {
                return Err(CalibrationError::NotIncreasing { index });
            }
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Convert a raw count to °C
    pub fn temperature(&self, raw: u16) -> f32 {
        // Construction guarantees at least two points
        let (first, last) = (self.points[0], self.points[self.points.len() - 1]);
        if raw <= first.raw {
            return first.temp_c;
        }
        if raw >= last.raw {
            return last.temp_c;
        }

        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if raw < b.raw {
                let span = (b.raw - a.raw) as f32;
                let offset = (raw - a.raw) as f32;
                return a.temp_c + offset * (b.temp_c - a.temp_c) / span;
            }
        }

        last.temp_c
    }
}

/// RTD probe read through an ADC
pub struct RtdSensor<ADC> {
    adc: ADC,
    table: CalibrationTable,
    /// Count at which the input is considered floating
    adc_max: u16,
}

impl<ADC> RtdSensor<ADC> {
    /// Create a sensor on a 12-bit ADC
    pub fn new(adc: ADC, table: CalibrationTable) -> Self {
        Self::with_adc_max(adc, table, DEFAULT_ADC_MAX)
    }

    pub fn with_adc_max(adc: ADC, table: CalibrationTable, adc_max: u16) -> Self {
        Self {
            adc,
            table,
            adc_max,
        }
    }

    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    /// Swap in a new calibration
    pub fn set_table(&mut self, table: CalibrationTable) {
        self.table = table;
    }

    /// Convert a raw count, rejecting faulted readings
    ///
    /// A count of 0 means the probe is shorted, a full-scale count means
    /// it is disconnected. Anything that calibrates outside
    /// [`MIN_VALID_C`]..=[`MAX_VALID_C`] is out of range.
    pub fn convert(&self, raw: u16) -> Result<f32, SensorError> {
        if raw == 0 {
            return Err(SensorError::ShortCircuit);
        }
        if raw >= self.adc_max {
            return Err(SensorError::OpenCircuit);
        }

        let temp = self.table.temperature(raw);
        if !(MIN_VALID_C..=MAX_VALID_C).contains(&temp) {
            return Err(SensorError::OutOfRange);
        }
        Ok(temp)
    }
}

impl<ADC: AdcReader> TemperatureSensor for RtdSensor<ADC> {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        let raw = self.adc.read().map_err(|_| SensorError::ConversionError)?;
        self.convert(raw).inspect_err(|e| warn!("rtd raw {} rejected: {:?}", raw, e))
    }
}
