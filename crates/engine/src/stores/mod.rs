//! In-memory state storage modules.
//!
//! Stores manage runtime state for the single shared session:
//! - `ChronicleStore` - LLM transcript, display transcript and pending check
//! - `WorldStore` - Mutable world state built from the template

pub mod chronicle;
pub mod world;

// Re-export store types
pub use chronicle::{ChronicleStore, Exchange};
pub use world::WorldStore;
