//! Chronicle entries - the conversation transcript forwarded to the model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChronicleRole {
    User,
    Assistant,
    System,
}

impl ChronicleRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ChronicleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronicleEntry {
    /// Player turn this entry belongs to (starts at 1).
    pub turn: u32,
    pub role: ChronicleRole,
    /// Display text, or normalised JSON for structured assistant replies.
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChronicleEntry {
    pub fn new(
        turn: u32,
        role: ChronicleRole,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            turn,
            role,
            content: content.into(),
            timestamp,
        }
    }
}
