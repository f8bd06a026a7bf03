//! Value objects - Immutable objects defined by their attributes

mod check;
mod dice;

pub use check::{CheckOutcome, DiceCheck};
pub use dice::{DiceFormula, DiceParseError, DiceRollResult, MAX_MODIFIER};
