//! Configuration types
//!
//! Controller tunables with conservative defaults. With the `serde`
//! feature they can be persisted as postcard binary data alongside the
//! program catalog.

#[cfg(feature = "serde")]
pub mod persist;
pub mod types;

#[cfg(feature = "serde")]
pub use persist::*;
pub use types::*;
