//! Controller configuration file
//!
//! ```toml
//! [controller]
//! tick_interval_s = 1
//! min_multiplier = 0.25
//! max_multiplier = 4.0
//! sensor_stale_after_s = 30
//! startup_delay_s = 15
//! heater_hysteresis_c = 1.0
//! ```
//!
//! Every key is optional; missing keys (or a missing table) keep their
//! defaults. Unknown tables are ignored so the file can be shared with
//! other firmware settings.

use levain_core::config::ControllerConfig;
use serde::Deserialize;

use crate::error::WireError;

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    controller: ControllerConfig,
}

/// Parse and validate the `[controller]` table
pub fn parse_config(text: &str) -> Result<ControllerConfig, WireError> {
    let file: ConfigFile = toml::from_str(text)?;
    file.controller.validate()?;
    Ok(file.controller)
}
