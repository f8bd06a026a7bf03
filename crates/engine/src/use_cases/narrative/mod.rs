//! Structured narrative replies and the world changes they carry.

pub mod response;
pub mod updates;

pub use response::{
    parse_response, ActiveRole, AiResponse, Interaction, SequenceItem, SequenceKind, UpdateAction,
    WorldUpdate,
};
pub use updates::{apply_active_role, apply_world_updates, deep_merge, UpdateError};
