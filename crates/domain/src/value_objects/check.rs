//! Model-requested ability checks

use serde::{Deserialize, Serialize};
use std::fmt;

use super::dice::DiceRollResult;

/// A pending d20 check, optionally tied to an attribute and a DC.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiceCheck {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub dc: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckOutcome {
    Success,
    Failure,
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Failure => f.write_str("FAILURE"),
        }
    }
}

impl DiceCheck {
    /// Success when the total meets the DC. A check without a DC fails.
    pub fn resolve(&self, roll: &DiceRollResult) -> CheckOutcome {
        match self.dc {
            Some(dc) if roll.total >= dc => CheckOutcome::Success,
            _ => CheckOutcome::Failure,
        }
    }

    /// `[SYSTEM] [DICE] {description}{ with attribute}`
    pub fn announcement(&self) -> String {
        let description = self.description.as_deref().unwrap_or("Check");
        match self.attribute.as_deref() {
            Some(attribute) if !attribute.is_empty() => {
                format!("[SYSTEM] [DICE] {description} with {attribute}")
            }
            _ => format!("[SYSTEM] [DICE] {description}"),
        }
    }

    /// `| Roll: N (DC x) => OUTCOME`
    pub fn resolution(&self, roll: &DiceRollResult) -> String {
        let dc = self
            .dc
            .map(|dc| dc.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!("| Roll: {} (DC {}) => {}", roll.total, dc, self.resolve(roll))
    }
}
