//! World-template cards - settings, chapters, characters and interactions
//!
//! Cards come from hand-written JSON templates and from model-issued world
//! updates, so deserialization is lenient: most fields default when missing,
//! `null` lists read as empty, and several list fields also accept a single
//! string.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::CardId;

fn default_true() -> bool {
    true
}

fn default_level() -> u32 {
    1
}

/// Deserialize `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `"a"`, `["a", "b"]` or `null` for a list of strings.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) if value.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

/// Who may see a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    #[serde(default = "default_true")]
    pub public_visible: bool,
    #[serde(default = "default_true")]
    pub player_visible: bool,
    #[serde(default)]
    pub unlock_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_learned: Option<bool>,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            public_visible: true,
            player_visible: true,
            unlock_condition: None,
            is_learned: None,
        }
    }
}

impl Visibility {
    /// Fully hidden from both the public and the player.
    pub fn hidden() -> Self {
        Self {
            public_visible: false,
            player_visible: false,
            unlock_condition: None,
            is_learned: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.public_visible || self.player_visible
    }
}

// =============================================================================
// Setting cards
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingCategory {
    Background,
    Race,
    Level,
    Class,
    Rule,
    #[default]
    #[serde(other)]
    Other,
}

impl SettingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Race => "race",
            Self::Level => "level",
            Self::Class => "class",
            Self::Rule => "rule",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SettingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named prefix ladder used by level settings (e.g. per faction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingMode {
    pub step: u32,
    #[serde(default)]
    pub prefix_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingCard {
    pub id: CardId,
    #[serde(default)]
    pub visible: Visibility,
    #[serde(default)]
    pub category: SettingCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_range: Option<(i32, i32)>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub scaling_modes: BTreeMap<String, ScalingMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub suffix_names: Vec<String>,
}

impl SettingCard {
    pub fn new(id: CardId, category: SettingCategory, title: impl Into<String>) -> Self {
        Self {
            id,
            visible: Visibility::default(),
            category,
            title: Some(title.into()),
            content: None,
            tags: Vec::new(),
            base_range: None,
            scaling_modes: BTreeMap::new(),
            default_mode: None,
            step: None,
            suffix_names: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn title_or_id(&self) -> &str {
        self.title.as_deref().unwrap_or(self.id.as_str())
    }
}

// =============================================================================
// Chapter cards
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlotPoint {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// GM-only notes; forwarded to the model, never shown to the player.
    #[serde(default)]
    pub secret_notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterCard {
    pub id: CardId,
    #[serde(default)]
    pub visible: Visibility,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub status: ChapterStatus,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub plot_points: Vec<PlotPoint>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rewards: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

impl ChapterCard {
    pub fn new(id: CardId, title: impl Into<String>, objective: impl Into<String>) -> Self {
        Self {
            id,
            visible: Visibility::default(),
            title: title.into(),
            summary: None,
            objective: objective.into(),
            status: ChapterStatus::Pending,
            is_current: false,
            plot_points: Vec::new(),
            rewards: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: ChapterStatus) -> Self {
        self.status = status;
        self
    }
}

// =============================================================================
// Character cards
// =============================================================================

/// The six classic ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(rename = "str", default = "Attributes::average")]
    pub strength: i32,
    #[serde(rename = "dex", default = "Attributes::average")]
    pub dexterity: i32,
    #[serde(rename = "con", default = "Attributes::average")]
    pub constitution: i32,
    #[serde(rename = "int", default = "Attributes::average")]
    pub intelligence: i32,
    #[serde(rename = "wis", default = "Attributes::average")]
    pub wisdom: i32,
    #[serde(rename = "cha", default = "Attributes::average")]
    pub charisma: i32,
}

impl Attributes {
    fn average() -> i32 {
        10
    }

    /// Look up a score by its short or long name ("dex", "Dexterity").
    pub fn get(&self, name: &str) -> Option<i32> {
        match name.trim().to_lowercase().as_str() {
            "str" | "strength" => Some(self.strength),
            "dex" | "dexterity" => Some(self.dexterity),
            "con" | "constitution" => Some(self.constitution),
            "int" | "intelligence" => Some(self.intelligence),
            "wis" | "wisdom" => Some(self.wisdom),
            "cha" | "charisma" => Some(self.charisma),
            _ => None,
        }
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "STR:{} DEX:{} CON:{} INT:{} WIS:{} CHA:{}",
            self.strength,
            self.dexterity,
            self.constitution,
            self.intelligence,
            self.wisdom,
            self.charisma
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCard {
    pub id: CardId,
    #[serde(default)]
    pub visible: Visibility,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub race: Vec<String>,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub gender: String,
    #[serde(rename = "class", default)]
    pub class_name: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default, deserialize_with = "string_or_list")]
    pub affiliation: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub status: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Attributes,
    #[serde(default, deserialize_with = "string_or_list")]
    pub personality: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inventory: Vec<InventoryItem>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub background: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

impl CharacterCard {
    pub fn new(id: CardId, name: impl Into<String>) -> Self {
        Self {
            id,
            visible: Visibility::default(),
            name: name.into(),
            prefix_name: None,
            race: Vec::new(),
            age: 0,
            gender: String::new(),
            class_name: String::new(),
            level: 1,
            affiliation: Vec::new(),
            status: Vec::new(),
            attributes: Attributes::default(),
            personality: Vec::new(),
            inventory: Vec::new(),
            background: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>, level: u32) -> Self {
        self.class_name = class_name.into();
        self.level = level;
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation.push(affiliation.into());
        self
    }
}

// =============================================================================
// Interaction cards
// =============================================================================

/// A skill, spell or manoeuvre the world makes available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCard {
    pub id: CardId,
    #[serde(default)]
    pub visible: Visibility,
    pub name: String,
    #[serde(default)]
    pub min_level: u32,
    #[serde(default)]
    pub element: String,
    #[serde(default)]
    pub cost: String,
    #[serde(default)]
    pub d20_logic: Option<String>,
    #[serde(default)]
    pub effect: String,
}

// =============================================================================
// Tagged union
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Setting,
    Chapter,
    Character,
    Interaction,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setting => "setting",
            Self::Chapter => "chapter",
            Self::Character => "character",
            Self::Interaction => "interaction",
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any card, discriminated by its `"type"` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorldCard {
    Setting(SettingCard),
    Chapter(ChapterCard),
    Character(CharacterCard),
    Interaction(InteractionCard),
}

impl WorldCard {
    pub fn id(&self) -> &CardId {
        match self {
            Self::Setting(c) => &c.id,
            Self::Chapter(c) => &c.id,
            Self::Character(c) => &c.id,
            Self::Interaction(c) => &c.id,
        }
    }

    pub fn set_id(&mut self, id: CardId) {
        match self {
            Self::Setting(c) => c.id = id,
            Self::Chapter(c) => c.id = id,
            Self::Character(c) => c.id = id,
            Self::Interaction(c) => c.id = id,
        }
    }

    pub fn kind(&self) -> CardKind {
        match self {
            Self::Setting(_) => CardKind::Setting,
            Self::Chapter(_) => CardKind::Chapter,
            Self::Character(_) => CardKind::Character,
            Self::Interaction(_) => CardKind::Interaction,
        }
    }

    pub fn visibility(&self) -> &Visibility {
        match self {
            Self::Setting(c) => &c.visible,
            Self::Chapter(c) => &c.visible,
            Self::Character(c) => &c.visible,
            Self::Interaction(c) => &c.visible,
        }
    }

    /// Name for characters and interactions, title for settings and chapters.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Setting(c) => c.title_or_id(),
            Self::Chapter(c) if !c.title.is_empty() => &c.title,
            Self::Chapter(c) => c.id.as_str(),
            Self::Character(c) => &c.name,
            Self::Interaction(c) => &c.name,
        }
    }
}
