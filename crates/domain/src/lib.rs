//! Faramita domain - dice, world-template cards and the in-memory world.
//!
//! No I/O and no RNG live here: rolling takes an injected generator closure.

pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use entities::{
    attribute_bonus, character_full_title, level_display, Attributes, CardKind, ChapterCard,
    ChapterStatus, CharacterCard, CharacterSummary, ChronicleEntry, ChronicleRole,
    InteractionCard, InventoryItem, PlotPoint, ScalingMode, SettingCard, SettingCategory,
    TemplateEntries, Visibility, WorldCard, WorldMeta, WorldSnapshot, WorldState, WorldTemplate,
    PLAYER_CHARACTER_ID,
};
pub use error::DomainError;
pub use ids::CardId;
pub use value_objects::{
    CheckOutcome, DiceCheck, DiceFormula, DiceParseError, DiceRollResult, MAX_MODIFIER,
};
