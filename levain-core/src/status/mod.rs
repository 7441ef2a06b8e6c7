//! Status reporting
//!
//! The tick context publishes an owned [`StatusSnapshot`] after every
//! mutation; readers only ever copy the last published one.

pub mod reporter;
pub mod snapshot;

pub use reporter::StatusReporter;
pub use snapshot::{StatusSnapshot, IDLE_STAGE};
