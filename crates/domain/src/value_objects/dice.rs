//! Dice rolling value objects and parsing
//!
//! Supports dice formulas like "1d20+5", "2d6-1", "1d100", "d20".
//! Whitespace inside a formula is ignored, so "1d20 + 5" is accepted too.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error when parsing a dice formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    /// The formula string is empty
    #[error("Empty dice formula")]
    Empty,
    /// Invalid format - expected XdY or XdY+Z
    #[error("Invalid dice format: {0}")]
    InvalidFormat(String),
    /// Dice count must be at least 1
    #[error("Dice count must be at least 1")]
    InvalidDiceCount,
    /// Die size must be at least 2
    #[error("Die size must be at least 2")]
    InvalidDieSize,
    /// Modifier outside the supported range
    #[error("Modifier value overflow")]
    ModifierOverflow,
}

/// Largest modifier magnitude a formula may carry.
pub const MAX_MODIFIER: i32 = 1_000_000;

/// A parsed dice formula like "2d6+3"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceFormula {
    /// Number of dice to roll (X in XdY)
    pub dice_count: u8,
    /// Size of each die (Y in XdY)
    pub die_size: u16,
    /// Modifier to add/subtract after rolling (+Z or -Z)
    pub modifier: i32,
}

impl DiceFormula {
    /// Create a new dice formula
    pub fn new(dice_count: u8, die_size: u16, modifier: i32) -> Result<Self, DiceParseError> {
        if dice_count == 0 {
            return Err(DiceParseError::InvalidDiceCount);
        }
        if die_size < 2 {
            return Err(DiceParseError::InvalidDieSize);
        }
        if !(-MAX_MODIFIER..=MAX_MODIFIER).contains(&modifier) {
            return Err(DiceParseError::ModifierOverflow);
        }
        Ok(Self {
            dice_count,
            die_size,
            modifier,
        })
    }

    /// The plain d20 used by the quick-roll command and checks.
    pub fn d20() -> Self {
        Self {
            dice_count: 1,
            die_size: 20,
            modifier: 0,
        }
    }

    /// Parse a dice formula string like "1d20+5", "2d6-1", "1d100"
    ///
    /// Supported formats:
    /// - "XdY" - Roll X dice of size Y
    /// - "XdY+Z" - Roll X dice of size Y, add Z
    /// - "XdY-Z" - Roll X dice of size Y, subtract Z
    /// - "dY" - Roll 1 die of size Y (shorthand)
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let input: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if input.is_empty() {
            return Err(DiceParseError::Empty);
        }

        // Parsed by hand to keep regex out of the domain layer
        let d_pos = input.find('d').ok_or_else(|| {
            DiceParseError::InvalidFormat(format!("Missing 'd' separator in '{}'", input))
        })?;

        // Parse dice count (before 'd')
        let dice_count_str = &input[..d_pos];
        let dice_count: u8 = if dice_count_str.is_empty() {
            1 // "d20" means "1d20"
        } else {
            dice_count_str.parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!("Invalid dice count: '{}'", dice_count_str))
            })?
        };

        if dice_count == 0 {
            return Err(DiceParseError::InvalidDiceCount);
        }

        // Parse die size and modifier (after 'd')
        let after_d = &input[d_pos + 1..];

        let (die_size_str, modifier) = if let Some(plus_pos) = after_d.find('+') {
            let die_str = &after_d[..plus_pos];
            let mod_str = &after_d[plus_pos + 1..];
            let modifier = parse_modifier(mod_str, '+')?;
            (die_str, modifier)
        } else if let Some(minus_pos) = after_d.find('-') {
            if minus_pos == 0 {
                return Err(DiceParseError::InvalidFormat(format!(
                    "Invalid die size: '{}'",
                    after_d
                )));
            }
            let die_str = &after_d[..minus_pos];
            let mod_str = &after_d[minus_pos + 1..];
            let modifier = parse_modifier(mod_str, '-')?;
            (die_str, -modifier)
        } else {
            (after_d, 0)
        };

        let die_size: u16 = die_size_str.parse().map_err(|_| {
            DiceParseError::InvalidFormat(format!("Invalid die size: '{}'", die_size_str))
        })?;

        Self::new(dice_count, die_size, modifier)
    }

    /// Roll the dice with an injected generator.
    ///
    /// `rng(min, max)` must return a value in the inclusive range `min..=max`.
    pub fn roll_with<F>(&self, mut rng: F) -> DiceRollResult
    where
        F: FnMut(i32, i32) -> i32,
    {
        let mut individual_rolls = Vec::with_capacity(self.dice_count as usize);

        for _ in 0..self.dice_count {
            let roll = rng(1, self.die_size as i32).clamp(1, self.die_size as i32);
            individual_rolls.push(roll);
        }

        let dice_total: i32 = individual_rolls.iter().sum();
        let total = dice_total.saturating_add(self.modifier);

        DiceRollResult {
            formula: *self,
            individual_rolls,
            dice_total,
            modifier_applied: self.modifier,
            total,
        }
    }

    /// Get the minimum possible roll
    pub fn min_roll(&self) -> i32 {
        (self.dice_count as i32).saturating_add(self.modifier)
    }

    /// Get the maximum possible roll
    pub fn max_roll(&self) -> i32 {
        (self.dice_count as i32 * self.die_size as i32).saturating_add(self.modifier)
    }

    /// Format as a display string (e.g., "1d20+5")
    pub fn display(&self) -> String {
        if self.modifier == 0 {
            format!("{}d{}", self.dice_count, self.die_size)
        } else if self.modifier > 0 {
            format!("{}d{}+{}", self.dice_count, self.die_size, self.modifier)
        } else {
            format!("{}d{}{}", self.dice_count, self.die_size, self.modifier)
        }
    }
}

fn parse_modifier(raw: &str, sign: char) -> Result<i32, DiceParseError> {
    // "+-3" and friends are rejected; only plain digits are accepted
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(DiceParseError::InvalidFormat(format!(
            "Invalid modifier: '{}{}'",
            sign, raw
        )));
    }
    let magnitude: i32 = raw.parse().map_err(|_| DiceParseError::ModifierOverflow)?;
    if magnitude > MAX_MODIFIER {
        return Err(DiceParseError::ModifierOverflow);
    }
    Ok(magnitude)
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Result of rolling dice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRollResult {
    /// The formula that was rolled
    pub formula: DiceFormula,
    /// Individual die results
    pub individual_rolls: Vec<i32>,
    /// Sum of dice before modifier
    pub dice_total: i32,
    /// Modifier that was applied
    pub modifier_applied: i32,
    /// Final total (dice_total + modifier)
    pub total: i32,
}

impl DiceRollResult {
    /// Signed modifier, called "bonus" in player-facing text.
    pub fn bonus(&self) -> i32 {
        self.modifier_applied
    }

    /// Format as a breakdown string (e.g., "1d20(14) + 5 = 19")
    pub fn breakdown(&self) -> String {
        let base = format!("{}d{}", self.formula.dice_count, self.formula.die_size);
        let rolls = if self.individual_rolls.len() == 1 {
            format!("({})", self.individual_rolls[0])
        } else {
            let rolls_str: Vec<String> = self
                .individual_rolls
                .iter()
                .map(|r| r.to_string())
                .collect();
            format!("[{}]", rolls_str.join(", "))
        };

        match self.modifier_applied {
            0 => format!("{}{} = {}", base, rolls, self.total),
            m if m > 0 => format!("{}{} + {} = {}", base, rolls, m, self.total),
            m => format!("{}{} - {} = {}", base, rolls, -m, self.total),
        }
    }

    /// Check if this is a natural 20 (for d20 rolls)
    pub fn is_natural_20(&self) -> bool {
        self.formula.die_size == 20
            && self.formula.dice_count == 1
            && self.individual_rolls.first() == Some(&20)
    }

    /// Check if this is a natural 1 (for d20 rolls)
    pub fn is_natural_1(&self) -> bool {
        self.formula.die_size == 20
            && self.formula.dice_count == 1
            && self.individual_rolls.first() == Some(&1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic generator cycling through the given faces.
    fn faces(values: &[i32]) -> impl FnMut(i32, i32) -> i32 + '_ {
        let mut idx = 0;
        move |_, _| {
            let value = values[idx % values.len()];
            idx += 1;
            value
        }
    }

    #[test]
    fn test_parse_simple_d20() {
        let formula = DiceFormula::parse("1d20").unwrap();
        assert_eq!(formula.dice_count, 1);
        assert_eq!(formula.die_size, 20);
        assert_eq!(formula.modifier, 0);
    }

    #[test]
    fn test_parse_shorthand_d20() {
        let formula = DiceFormula::parse("d20").unwrap();
        assert_eq!(formula, DiceFormula::d20());
    }

    #[test]
    fn test_parse_with_positive_modifier() {
        let formula = DiceFormula::parse("1d20+5").unwrap();
        assert_eq!(formula.modifier, 5);
    }

    #[test]
    fn test_parse_with_negative_modifier() {
        let formula = DiceFormula::parse("2d6-2").unwrap();
        assert_eq!(formula.dice_count, 2);
        assert_eq!(formula.die_size, 6);
        assert_eq!(formula.modifier, -2);
    }

    #[test]
    fn test_parse_with_inner_whitespace() {
        let formula = DiceFormula::parse(" 1d20 + 5 ").unwrap();
        assert_eq!(formula, DiceFormula::new(1, 20, 5).unwrap());
    }

    #[test]
    fn test_parse_case_insensitive() {
        let formula = DiceFormula::parse("3D8+1").unwrap();
        assert_eq!(formula, DiceFormula::new(3, 8, 1).unwrap());
    }

    #[test]
    fn test_parse_d100() {
        let formula = DiceFormula::parse("1d100").unwrap();
        assert_eq!(formula.die_size, 100);
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(DiceFormula::parse("  "), Err(DiceParseError::Empty)));
    }

    #[test]
    fn test_parse_invalid_no_d() {
        assert!(matches!(
            DiceFormula::parse("20"),
            Err(DiceParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_rejects_chained_modifiers() {
        assert!(matches!(
            DiceFormula::parse("1d20+5-2"),
            Err(DiceParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            DiceFormula::parse("1d20+-2"),
            Err(DiceParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_invalid_zero_dice() {
        assert!(matches!(
            DiceFormula::parse("0d20"),
            Err(DiceParseError::InvalidDiceCount)
        ));
    }

    #[test]
    fn test_parse_invalid_die_size() {
        assert!(matches!(
            DiceFormula::parse("1d1"),
            Err(DiceParseError::InvalidDieSize)
        ));
    }

    #[test]
    fn test_parse_rejects_oversized_modifier() {
        assert_eq!(
            DiceFormula::parse("2d6+2147483647"),
            Err(DiceParseError::ModifierOverflow)
        );
        assert_eq!(
            DiceFormula::parse("1d20-99999999999"),
            Err(DiceParseError::ModifierOverflow)
        );
        assert_eq!(
            DiceFormula::parse("1d20+1000001"),
            Err(DiceParseError::ModifierOverflow)
        );
        assert_eq!(
            DiceFormula::parse("1d20-1000000").map(|f| f.modifier),
            Ok(-MAX_MODIFIER)
        );
    }

    #[test]
    fn test_new_rejects_oversized_modifier() {
        assert_eq!(
            DiceFormula::new(1, 20, i32::MAX),
            Err(DiceParseError::ModifierOverflow)
        );
        assert_eq!(
            DiceFormula::new(1, 20, i32::MIN),
            Err(DiceParseError::ModifierOverflow)
        );
    }

    #[test]
    fn test_extreme_formula_saturates_instead_of_overflowing() {
        let formula = DiceFormula {
            dice_count: 255,
            die_size: u16::MAX,
            modifier: i32::MAX,
        };
        assert_eq!(formula.max_roll(), i32::MAX);
        assert_eq!(formula.roll_with(|_, max| max).total, i32::MAX);
        let largest = DiceFormula::new(255, u16::MAX, MAX_MODIFIER).unwrap();
        assert_eq!(largest.max_roll(), 255 * 65_535 + MAX_MODIFIER);
    }

    #[test]
    fn test_roll_with_sums_faces_and_modifier() {
        let formula = DiceFormula::parse("2d6+3").unwrap();
        let result = formula.roll_with(faces(&[4, 5]));
        assert_eq!(result.individual_rolls, vec![4, 5]);
        assert_eq!(result.dice_total, 9);
        assert_eq!(result.total, 12);
        assert_eq!(result.bonus(), 3);
    }

    #[test]
    fn test_roll_with_requests_inclusive_die_range() {
        let formula = DiceFormula::parse("1d12").unwrap();
        let mut seen = Vec::new();
        formula.roll_with(|min, max| {
            seen.push((min, max));
            min
        });
        assert_eq!(seen, vec![(1, 12)]);
    }

    #[test]
    fn test_roll_with_clamps_out_of_range_generator() {
        let result = DiceFormula::d20().roll_with(|_, _| 99);
        assert_eq!(result.total, 20);
    }

    #[test]
    fn test_min_max_roll() {
        let formula = DiceFormula::parse("2d6-1").unwrap();
        assert_eq!(formula.min_roll(), 1);
        assert_eq!(formula.max_roll(), 11);
    }

    #[test]
    fn test_breakdown_single_die() {
        let result = DiceFormula::new(1, 20, 5).unwrap().roll_with(faces(&[14]));
        assert_eq!(result.breakdown(), "1d20(14) + 5 = 19");
    }

    #[test]
    fn test_breakdown_multiple_dice_negative_modifier() {
        let result = DiceFormula::new(2, 6, -2).unwrap().roll_with(faces(&[4, 5]));
        assert_eq!(result.breakdown(), "2d6[4, 5] - 2 = 7");
    }

    #[test]
    fn test_natural_20_and_1() {
        let nat20 = DiceFormula::d20().roll_with(faces(&[20]));
        assert!(nat20.is_natural_20());
        assert!(!nat20.is_natural_1());

        let nat1 = DiceFormula::d20().roll_with(faces(&[1]));
        assert!(nat1.is_natural_1());
    }

    #[test]
    fn test_display() {
        assert_eq!(DiceFormula::new(1, 20, 0).unwrap().to_string(), "1d20");
        assert_eq!(DiceFormula::new(1, 20, 5).unwrap().to_string(), "1d20+5");
        assert_eq!(DiceFormula::new(1, 20, -3).unwrap().to_string(), "1d20-3");
    }
}
