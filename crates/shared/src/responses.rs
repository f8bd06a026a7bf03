//! Response bodies returned by the engine.

use serde::{Deserialize, Serialize};

use faramita_domain::{ChronicleEntry, ChronicleRole, DiceCheck, DiceRollResult};

// =============================================================================
// Dice
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResultDto {
    /// Normalised formula, e.g. `1d20+5`
    pub formula: String,
    pub rolls: Vec<i32>,
    pub modifier: i32,
    pub total: i32,
    /// e.g. `1d20(14) + 5 = 19`
    pub breakdown: String,
}

impl From<&DiceRollResult> for RollResultDto {
    fn from(result: &DiceRollResult) -> Self {
        Self {
            formula: result.formula.to_string(),
            rolls: result.individual_rolls.clone(),
            modifier: result.modifier_applied,
            total: result.total,
            breakdown: result.breakdown(),
        }
    }
}

/// One `[[formula]]` found in chat text: either rolled or rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcomeDto {
    /// Formula as written inside the brackets
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RollResultDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// =============================================================================
// Chat
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(default)]
    pub rolls: Vec<RollOutcomeDto>,
    #[serde(default)]
    pub notifications: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntryDto {
    pub turn: u32,
    pub role: ChronicleRole,
    pub content: String,
    /// RFC 3339
    pub timestamp: String,
}

impl From<&ChronicleEntry> for HistoryEntryDto {
    fn from(entry: &ChronicleEntry) -> Self {
        Self {
            turn: entry.turn,
            role: entry.role,
            content: entry.content.clone(),
            timestamp: entry.timestamp.to_rfc3339(),
        }
    }
}

// =============================================================================
// World
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummaryDto {
    pub id: String,
    pub title: String,
    pub objective: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCharacterDto {
    pub id: String,
    pub name: String,
    /// Full title, e.g. `银阶 剑士`
    pub title: String,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCheckDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dc: Option<i32>,
}

impl From<&DiceCheck> for PendingCheckDto {
    fn from(check: &DiceCheck) -> Self {
        Self {
            description: check.description.clone(),
            attribute: check.attribute.clone(),
            dc: check.dc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSummaryDto {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_chapter: Option<ChapterSummaryDto>,
    pub active_characters: Vec<ActiveCharacterDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_check: Option<PendingCheckDto>,
}

/// Body of non-2xx JSON responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
