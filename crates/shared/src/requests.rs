//! Request bodies accepted by the engine.

use serde::{Deserialize, Serialize};

/// Player input for one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Stand-alone roll of a single formula such as `2d6+3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRequest {
    pub formula: String,
}
