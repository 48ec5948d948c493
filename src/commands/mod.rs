//! Commands module - CLI command implementations.
//!
//! Each command is implemented in its own module for separation of concerns.

pub mod keygen;
pub mod migrate;
pub mod promote;
pub mod serve;
pub mod stats;
