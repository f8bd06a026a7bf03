//! Use cases - User story orchestration.
//!
//! - `chat` - one conversational turn end to end
//! - `dice` - `[[XdY+Z]]` formulas embedded in text
//! - `prompt` - system prompt assembly from the world
//! - `narrative` - structured replies and the world updates they carry

pub mod chat;
pub mod dice;
pub mod narrative;
pub mod prompt;

use std::sync::Arc;

pub use chat::{ChatOps, ChatReply, ChatSettings};
pub use dice::{DiceOps, RollOutcome};

/// Container for all use cases.
pub struct UseCases {
    pub chat: Arc<ChatOps>,
    pub dice: Arc<DiceOps>,
}
