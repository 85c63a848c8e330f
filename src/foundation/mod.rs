//! Shared base types: frames, time ranges, geometry and errors.

pub mod core;
pub mod error;
pub(crate) mod math;
