//! Shared utilities.
//!
//! Tracing bootstrap and the async combinators used across the crate.

pub mod bootstrap;
pub mod concurrent;

pub use concurrent::{fan_out, ErrbackExt};
