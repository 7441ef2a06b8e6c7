//! Levain wire protocol
//!
//! JSON and TOML surfaces of the bread machine controller, kept apart
//! from the core so the core never needs an allocator:
//!
//! - `/status`: [`StatusRecord`], a flat JSON object built from a
//!   [`StatusSnapshot`](levain_core::status::StatusSnapshot)
//! - `/api/programs`: an array of [`ProgramRecord`]s, read back from and
//!   atomically applied to the controller's catalog
//! - control: [`Command`]s tagged by `type` (`select`, `start`, `stop`,
//!   `start_at_stage`, `schedule`, `advance`, `back`)
//! - configuration: a `[controller]` TOML table parsed into a
//!   [`ControllerConfig`](levain_core::config::ControllerConfig)
//!
//! HTTP routing and serving are left to the embedding firmware.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod catalog;
pub mod command;
pub mod config;
pub mod error;
pub mod records;
pub mod status;

pub use catalog::{apply_catalog, catalog_json, parse_catalog};
pub use command::{Command, Outcome};
pub use config::parse_config;
pub use error::WireError;
pub use records::{ProgramRecord, StageRecord, Switch};
pub use status::{status_json, StatusRecord};
