//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod completions;
pub mod config;
pub mod ports;
pub mod world_template;
