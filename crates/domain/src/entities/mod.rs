//! Domain entities - World-template cards, world state and chronicle entries

mod card;
mod chronicle;
mod level_title;
mod world;

pub use card::{
    Attributes, CardKind, ChapterCard, ChapterStatus, CharacterCard, InteractionCard,
    InventoryItem, PlotPoint, ScalingMode, SettingCard, SettingCategory, Visibility, WorldCard,
};
pub use chronicle::{ChronicleEntry, ChronicleRole};
pub use level_title::{attribute_bonus, character_full_title, level_display};
pub use world::{
    CharacterSummary, TemplateEntries, WorldMeta, WorldSnapshot, WorldState, WorldTemplate,
    PLAYER_CHARACTER_ID,
};
