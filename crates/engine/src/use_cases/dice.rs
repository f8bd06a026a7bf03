//! Dice rolls embedded in free text.
//!
//! Players and the model write `[[XdY+Z]]` inside messages; every bracketed
//! formula is rolled and rendered as a player-facing result block.

use std::sync::{Arc, LazyLock};

use regex_lite::Regex;

use faramita_domain::{DiceFormula, DiceParseError, DiceRollResult};

use crate::infrastructure::ports::RandomPort;

/// Commands that roll a plain d20 on their own.
pub const QUICK_ROLL_COMMANDS: [&str; 3] = ["掷骰", "roll", "d20"];

static ROLL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.+?)\]\]").expect("valid regex"));

/// Every `[[...]]` body in order of appearance.
pub fn extract_roll_formulas(text: &str) -> Vec<String> {
    ROLL_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn is_quick_roll_command(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    QUICK_ROLL_COMMANDS.contains(&normalized.as_str())
}

/// `🎲 1d20+5\n结果: [14] + 5 = **19**`
pub fn format_roll_result(result: &DiceRollResult) -> String {
    let dice = result
        .individual_rolls
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let bonus = match result.bonus() {
        0 => String::new(),
        b if b > 0 => format!(" + {b}"),
        b => format!(" - {}", b.abs()),
    };
    format!(
        "🎲 {}\n结果: [{}]{} = **{}**",
        result.formula, dice, bonus, result.total
    )
}

pub fn format_roll_error(error: &DiceParseError) -> String {
    format!("掷骰错误: {error}")
}

/// One bracketed formula and what became of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollOutcome {
    /// Text between the brackets, as written
    pub source: String,
    pub result: Result<DiceRollResult, DiceParseError>,
}

impl RollOutcome {
    pub fn formatted(&self) -> String {
        match &self.result {
            Ok(result) => format_roll_result(result),
            Err(error) => format_roll_error(error),
        }
    }
}

/// Rolls formulas with the injected random source.
pub struct DiceOps {
    random: Arc<dyn RandomPort>,
}

impl DiceOps {
    pub fn new(random: Arc<dyn RandomPort>) -> Self {
        Self { random }
    }

    pub fn roll_formula(&self, formula: &DiceFormula) -> DiceRollResult {
        formula.roll_with(|min, max| self.random.gen_range(min, max))
    }

    pub fn roll(&self, formula: &str) -> Result<DiceRollResult, DiceParseError> {
        let formula = DiceFormula::parse(formula)?;
        Ok(self.roll_formula(&formula))
    }

    pub fn roll_d20(&self) -> DiceRollResult {
        self.roll_formula(&DiceFormula::d20())
    }

    /// Roll every embedded formula; bad ones keep their parse error.
    pub fn roll_all(&self, text: &str) -> Vec<RollOutcome> {
        extract_roll_formulas(text)
            .into_iter()
            .map(|source| {
                let result = self.roll(&source);
                if let Err(e) = &result {
                    tracing::debug!(formula = %source, error = %e, "Rejected embedded dice formula");
                }
                RollOutcome { source, result }
            })
            .collect()
    }
}
