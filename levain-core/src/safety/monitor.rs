//! Sensor monitor implementation

use crate::traits::SensorError;

/// Default staleness window (seconds)
pub const DEFAULT_STALE_AFTER_S: u64 = 30;

/// Why the temperature can't be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorFault {
    /// No good reading since boot
    NoReading,
    /// Last good reading is older than the staleness window
    Stale { age_s: u64 },
}

/// Sensor health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// Latest read succeeded
    Ok,
    /// Reads are failing, still within the window; last good value in use
    Holding { age_s: u64 },
    /// Beyond the window; heater must be off
    Fault(SensorFault),
}

impl SafetyStatus {
    /// Check if the heater has to be forced off
    pub fn requires_fail_safe(&self) -> bool {
        matches!(self, SafetyStatus::Fault(_))
    }
}

/// Temperature sensor monitor
///
/// Keeps the last good reading and when it was taken.
#[derive(Debug, Clone)]
pub struct SensorMonitor {
    stale_after_s: u64,
    /// Last good temperature (°C)
    last_good_c: Option<f32>,
    /// When the last good reading was taken (epoch s)
    last_good_at: Option<u64>,
    /// Most recent read error
    last_error: Option<SensorError>,
    /// Failed reads since the last good one
    consecutive_errors: u32,
    /// Fault reported at the last record, for logging transitions
    faulted: bool,
}

impl Default for SensorMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER_S)
    }
}

impl SensorMonitor {
    /// Create a monitor with the given staleness window
    pub const fn new(stale_after_s: u64) -> Self {
        Self {
            stale_after_s,
            last_good_c: None,
            last_good_at: None,
            last_error: None,
            consecutive_errors: 0,
            faulted: false,
        }
    }

    /// Record a sensor read taken at `now`
    ///
    /// Non-finite temperatures count as conversion errors.
    pub fn record(&mut self, now: u64, reading: Result<f32, SensorError>) -> SafetyStatus {
        match reading {
            Ok(temp_c) if temp_c.is_finite() => {
                self.last_good_c = Some(temp_c);
                self.last_good_at = Some(now);
                self.last_error = None;
                self.consecutive_errors = 0;
            }
            Ok(_) => self.record_error(SensorError::ConversionError),
            Err(e) => self.record_error(e),
        }

        let status = self.check(now);
        let faulted = status.requires_fail_safe();
        if faulted != self.faulted {
            if faulted {
                warn!("Temperature sensor fault: {:?}", status);
            } else {
                info!("Temperature sensor recovered");
            }
            self.faulted = faulted;
        }
        status
    }

    fn record_error(&mut self, error: SensorError) {
        if self.consecutive_errors == 0 {
            debug!("Sensor read failed: {:?}", error);
        }
        self.last_error = Some(error);
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
    }

    /// Check sensor health at `now`
    pub fn check(&self, now: u64) -> SafetyStatus {
        let Some(at) = self.last_good_at else {
            return SafetyStatus::Fault(SensorFault::NoReading);
        };
        let age_s = now.saturating_sub(at);
        if age_s > self.stale_after_s {
            SafetyStatus::Fault(SensorFault::Stale { age_s })
        } else if self.consecutive_errors > 0 {
            SafetyStatus::Holding { age_s }
        } else {
            SafetyStatus::Ok
        }
    }

    /// Last good temperature, however old
    pub fn temperature(&self) -> Option<f32> {
        self.last_good_c
    }

    /// Whether the reported temperature is beyond the staleness window
    pub fn is_degraded(&self, now: u64) -> bool {
        self.check(now).requires_fail_safe()
    }

    pub fn last_error(&self) -> Option<SensorError> {
        self.last_error
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn stale_after_s(&self) -> u64 {
        self.stale_after_s
    }
}
