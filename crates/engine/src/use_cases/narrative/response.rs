//! Structured model replies.
//!
//! In structured mode the model answers with a JSON object:
//! - `sequence` - environment descriptions and character dialogue
//! - `interaction` - an optional d20 check the player must roll
//! - `active_role` - characters entering or leaving the scene
//! - `world_updates` - cards to create or merge into the world
//!
//! Models often wrap the object in prose or a fenced block, so parsing falls
//! back to extracting the first JSON-looking span.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use faramita_domain::{CardKind, DiceCheck};

// ```json ... ```, then ``` ... ```, then the outermost {...}
static JSON_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(.*?)\s*```|```\s*(.*?)\s*```|(\{.*\})").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    Dialogue,
    #[default]
    #[serde(other)]
    Environment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceItem {
    #[serde(rename = "type", default)]
    pub kind: SequenceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_name: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl SequenceItem {
    pub fn environment(content: impl Into<String>) -> Self {
        Self {
            kind: SequenceKind::Environment,
            speaker_name: None,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub needs_roll: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_dc",
        skip_serializing_if = "Option::is_none"
    )]
    pub dc: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Interaction {
    /// The check to hold as pending, when a roll is requested.
    pub fn as_check(&self) -> Option<DiceCheck> {
        self.needs_roll.then(|| DiceCheck {
            description: self.description.clone(),
            attribute: self.attribute.clone(),
            dc: self.dc,
        })
    }
}

/// Accept `15`, `15.0` or `"15"`; anything else means no DC.
fn lenient_dc<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|n| i32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveRole {
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub delete: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdateAction {
    #[serde(alias = "create")]
    Create,
    #[serde(alias = "update")]
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldUpdate {
    pub action: UpdateAction,
    #[serde(rename = "type")]
    pub kind: CardKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AiResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sequence: Vec<SequenceItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<Interaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_role: Option<ActiveRole>,
    #[serde(
        default,
        deserialize_with = "lenient_updates",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub world_updates: Vec<WorldUpdate>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Drop malformed update entries instead of rejecting the whole reply.
fn lenient_updates<'de, D>(deserializer: D) -> Result<Vec<WorldUpdate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<WorldUpdate>(value) {
            Ok(update) => Some(update),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed world update");
                None
            }
        })
        .collect())
}

impl AiResponse {
    /// Wrap unparseable model text as a single environment item.
    pub fn from_text(text: &str) -> Self {
        Self {
            sequence: vec![SequenceItem::environment(text.trim())],
            ..Self::default()
        }
    }

    /// Player-facing text of the sequence.
    pub fn render(&self) -> String {
        self.sequence
            .iter()
            .filter(|item| !item.content.trim().is_empty())
            .map(|item| match (item.kind, item.speaker_name.as_deref()) {
                (SequenceKind::Dialogue, Some(speaker)) => {
                    format!("{}: {}", speaker, item.content.trim())
                }
                _ => item.content.trim().to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Compact JSON stored in the chronicle.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.render())
    }

    pub fn check(&self) -> Option<DiceCheck> {
        self.interaction.as_ref().and_then(Interaction::as_check)
    }
}

fn parse_object(raw: &str) -> Option<AiResponse> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    if !value.is_object() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(response) => Some(response),
        Err(e) => {
            tracing::warn!(error = %e, "Model JSON did not match the response schema");
            None
        }
    }
}

/// Parse a structured reply, tolerating prose or code fences around it.
pub fn parse_response(text: &str) -> Option<AiResponse> {
    if let Some(response) = parse_object(text) {
        return Some(response);
    }

    let caps = JSON_BLOCK_RE.captures(text)?;
    let extracted = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str();
    let parsed = parse_object(extracted);
    if parsed.is_none() {
        tracing::warn!(
            preview = %text.chars().take(120).collect::<String>(),
            "Could not parse model reply as JSON"
        );
    }
    parsed
}
