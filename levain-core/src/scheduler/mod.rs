//! Stage scheduler
//!
//! Runs a program's stages in order, stretching or shrinking fermentation
//! stages with the measured temperature.

pub mod compensator;
pub mod executor;
pub mod runtime;

pub use compensator::{
    Compensation, FermentationCompensator, MultiplierBounds, DEFAULT_MAX_MULTIPLIER,
    DEFAULT_MIN_MULTIPLIER,
};
pub use executor::StageScheduler;
pub use runtime::{ResumeRecord, RuntimeState, ScheduledStart};
