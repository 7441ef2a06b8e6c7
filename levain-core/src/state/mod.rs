//! State machine for program execution
//!
//! The run lifecycle is explicit, finite, and deterministic. The scheduler
//! drives it with events; nothing else changes the state.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::State;
