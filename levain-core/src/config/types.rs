//! Configuration type definitions

use core::fmt;

use crate::catalog::ValidationError;
use crate::outputs::DEFAULT_HYSTERESIS_C;
use crate::safety::DEFAULT_STALE_AFTER_S;
use crate::scheduler::{MultiplierBounds, DEFAULT_MAX_MULTIPLIER, DEFAULT_MIN_MULTIPLIER};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current configuration format version
pub const CONFIG_VERSION: u8 = 2;

/// Default tick period (seconds)
pub const DEFAULT_TICK_INTERVAL_S: u32 = 1;

/// Default delay after boot before a program may start (seconds)
pub const DEFAULT_STARTUP_DELAY_S: u64 = 15;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Multiplier bounds not finite, not positive, or min > max
    InvalidMultiplierBounds,
    /// Tick interval of zero
    ZeroTickInterval,
    /// Heater hysteresis negative or not finite
    InvalidHysteresis,
    /// Serialization failed (buffer too small)
    Encode,
    /// Deserialization failed
    Decode,
    /// Stored data has an unexpected version
    VersionMismatch { found: u8 },
    /// Stored catalog failed validation
    Catalog(ValidationError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidMultiplierBounds => f.write_str("invalid multiplier bounds"),
            ConfigError::ZeroTickInterval => f.write_str("tick interval must be non-zero"),
            ConfigError::InvalidHysteresis => f.write_str("invalid heater hysteresis"),
            ConfigError::Encode => f.write_str("failed to encode configuration"),
            ConfigError::Decode => f.write_str("failed to decode configuration"),
            ConfigError::VersionMismatch { found } => write!(
                f,
                "config version mismatch: found {found}, expected {CONFIG_VERSION}"
            ),
            ConfigError::Catalog(e) => write!(f, "stored catalog invalid: {e}"),
        }
    }
}

impl From<ValidationError> for ConfigError {
    fn from(e: ValidationError) -> Self {
        ConfigError::Catalog(e)
    }
}

/// Controller configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// Config format version
    pub version: u8,
    /// Period the embedding loop calls `Controller::tick` at (seconds)
    pub tick_interval_s: u32,
    /// Lower bound of the fermentation multiplier
    pub min_multiplier: f32,
    /// Upper bound of the fermentation multiplier
    pub max_multiplier: f32,
    /// Sensor staleness window (seconds)
    pub sensor_stale_after_s: u64,
    /// Delay after boot before a program may start (seconds)
    pub startup_delay_s: u64,
    /// Heater thermostat half-band (°C)
    pub heater_hysteresis_c: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            tick_interval_s: DEFAULT_TICK_INTERVAL_S,
            min_multiplier: DEFAULT_MIN_MULTIPLIER,
            max_multiplier: DEFAULT_MAX_MULTIPLIER,
            sensor_stale_after_s: DEFAULT_STALE_AFTER_S,
            startup_delay_s: DEFAULT_STARTUP_DELAY_S,
            heater_hysteresis_c: DEFAULT_HYSTERESIS_C,
        }
    }
}

impl ControllerConfig {
    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_s == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if !self.bounds().is_valid() {
            return Err(ConfigError::InvalidMultiplierBounds);
        }
        if !self.heater_hysteresis_c.is_finite() || self.heater_hysteresis_c < 0.0 {
            return Err(ConfigError::InvalidHysteresis);
        }
        Ok(())
    }

    /// Fermentation multiplier bounds
    pub fn bounds(&self) -> MultiplierBounds {
        MultiplierBounds {
            min: self.min_multiplier,
            max: self.max_multiplier,
        }
    }
}
