//! Binary persistence
//!
//! Configuration, the program catalog and the progress of a run are
//! stored in flash as postcard-serialized binary data. Decoded data is
//! checked again before use, since flash contents can't be trusted.

use heapless::Vec;

use super::types::{ConfigError, ControllerConfig, CONFIG_VERSION};
use crate::catalog::{Program, ProgramCatalog, MAX_PROGRAMS};
use crate::scheduler::ResumeRecord;

/// Maximum serialized config size
pub const MAX_CONFIG_SIZE: usize = 64;

/// Maximum serialized resume record size
pub const MAX_RESUME_SIZE: usize = 96;

/// Serialize a configuration into `buf`, returning the used part
pub fn encode_config<'a>(
    config: &ControllerConfig,
    buf: &'a mut [u8],
) -> Result<&'a mut [u8], ConfigError> {
    postcard::to_slice(config, buf).map_err(|_| ConfigError::Encode)
}

/// Deserialize and validate a configuration
pub fn decode_config(bytes: &[u8]) -> Result<ControllerConfig, ConfigError> {
    let config: ControllerConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)?;
    if config.version != CONFIG_VERSION {
        warn!(
            "Config version mismatch: found {}, expected {}",
            config.version,
            CONFIG_VERSION
        );
        return Err(ConfigError::VersionMismatch {
            found: config.version,
        });
    }
    config.validate()?;
    Ok(config)
}

/// Serialize a catalog's programs into `buf`, returning the used part
pub fn encode_catalog<'a>(
    programs: &[Program],
    buf: &'a mut [u8],
) -> Result<&'a mut [u8], ConfigError> {
    postcard::to_slice(programs, buf).map_err(|_| ConfigError::Encode)
}

/// Deserialize stored programs
///
/// Capacity and length limits are enforced by the decoder itself; the
/// remaining catalog rules are checked before the programs are returned.
pub fn decode_catalog(bytes: &[u8]) -> Result<Vec<Program, MAX_PROGRAMS>, ConfigError> {
    let programs: Vec<Program, MAX_PROGRAMS> =
        postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)?;
    ProgramCatalog::check(&programs)?;
    debug!("Decoded {} stored programs", programs.len());
    Ok(programs)
}

/// Serialize a run's progress into `buf`, returning the used part
pub fn encode_resume<'a>(
    record: &ResumeRecord,
    buf: &'a mut [u8],
) -> Result<&'a mut [u8], ConfigError> {
    postcard::to_slice(record, buf).map_err(|_| ConfigError::Encode)
}

/// Deserialize a stored run's progress
pub fn decode_resume(bytes: &[u8]) -> Result<ResumeRecord, ConfigError> {
    let record: ResumeRecord = postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)?;
    if !record.is_consistent() {
        warn!("Stored resume record is inconsistent");
        return Err(ConfigError::Decode);
    }
    Ok(record)
}
