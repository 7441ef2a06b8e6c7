//! `/api/programs` read and write

use alloc::string::String;
use alloc::vec::Vec;

use embassy_sync::blocking_mutex::raw::RawMutex;
use levain_core::catalog::ProgramCatalog;
use levain_core::traits::OutputBank;
use levain_core::Controller;

use crate::error::WireError;
use crate::records::{with_drafts, ProgramRecord};

/// Parse and validate a catalog body without touching any controller
pub fn parse_catalog(json: &str) -> Result<Vec<ProgramRecord>, WireError> {
    let records: Vec<ProgramRecord> = serde_json::from_str(json)?;
    with_drafts(&records, ProgramCatalog::validate)?;
    Ok(records)
}

/// Replace the controller's catalog with a JSON array of records
///
/// The whole array is rejected if any record is malformed or invalid;
/// the previous catalog stays in place. Returns the new generation.
pub fn apply_catalog<M: RawMutex, O: OutputBank>(
    controller: &Controller<M, O>,
    json: &str,
) -> Result<u32, WireError> {
    let records: Vec<ProgramRecord> = serde_json::from_str(json)?;
    let generation = with_drafts(&records, |drafts| controller.replace_catalog(drafts))?;
    Ok(generation)
}

/// Current catalog as a JSON array of records
pub fn catalog_json<M: RawMutex, O: OutputBank>(
    controller: &Controller<M, O>,
) -> Result<String, WireError> {
    let records: Vec<ProgramRecord> =
        controller.programs(|programs| programs.iter().map(ProgramRecord::from).collect());
    serde_json::to_string(&records).map_err(|_| WireError::Encode)
}
