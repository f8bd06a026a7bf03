//! World entity - the loaded template and its mutable in-memory state
//!
//! A `WorldTemplate` is the JSON document read at startup. `WorldState` is the
//! flattened, mutable form the game master works against: cards can be added
//! or replaced by model-issued updates, and the set of active characters
//! changes as scenes move on.

use serde::{Deserialize, Serialize};

use super::card::{
    Attributes, ChapterCard, ChapterStatus, CharacterCard, InteractionCard, PlotPoint,
    ScalingMode, SettingCard, SettingCategory, WorldCard,
};
use super::level_title::character_full_title;
use crate::{CardId, DomainError};

/// Id of the player character in hand-written templates.
pub const PLAYER_CHARACTER_ID: &str = "char-001";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorldMeta {
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
}

/// Card lists exactly as they appear in a template file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateEntries {
    #[serde(default)]
    pub setting_cards: Vec<SettingCard>,
    #[serde(default)]
    pub chapter_cards: Vec<ChapterCard>,
    #[serde(default)]
    pub character_cards: Vec<CharacterCard>,
    #[serde(default)]
    pub interaction_cards: Vec<InteractionCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldTemplate {
    pub world_meta: WorldMeta,
    #[serde(default)]
    pub entries: TemplateEntries,
}

impl WorldTemplate {
    /// Flatten every card list, settings first.
    pub fn into_cards(self) -> (WorldMeta, Vec<WorldCard>) {
        let TemplateEntries {
            setting_cards,
            chapter_cards,
            character_cards,
            interaction_cards,
        } = self.entries;

        let cards = setting_cards
            .into_iter()
            .map(WorldCard::Setting)
            .chain(chapter_cards.into_iter().map(WorldCard::Chapter))
            .chain(character_cards.into_iter().map(WorldCard::Character))
            .chain(interaction_cards.into_iter().map(WorldCard::Interaction))
            .collect();

        (self.world_meta, cards)
    }

    /// The built-in dark-fantasy world of Oort, used when no template file is
    /// configured.
    pub fn oort() -> Self {
        let meta = WorldMeta {
            uuid: "oort-default".to_string(),
            name: "奥尔特大陆".to_string(),
            version: "1.0.0".to_string(),
            author: "Faramita Worlds".to_string(),
            description: "奥尔特是一个被古老神明遗弃的世界，魔法与科技的残余在这个废土世界中交织。\
                          冒险者们在这个危险的世界中探索遗迹，对抗怪物，寻找失落的知识。"
                .to_string(),
        };

        let background = SettingCard::new(
            card_id("setting-background"),
            SettingCategory::Background,
            "诸神的遗弃",
        )
        .with_content("远古神明离开了奥尔特，只留下破碎的神殿与失控的魔力潮汐。");

        let mut level = SettingCard::new(card_id("setting-level"), SettingCategory::Level, "阶位");
        level.content = Some("冒险者的力量以阶位衡量，每五级晋升一阶。".to_string());
        level.default_mode = Some("冒险者".to_string());
        level.scaling_modes.insert(
            "冒险者".to_string(),
            ScalingMode {
                step: 5,
                prefix_names: ["见习", "铜阶", "银阶", "金阶"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            },
        );
        level.scaling_modes.insert(
            "教会".to_string(),
            ScalingMode {
                step: 5,
                prefix_names: ["侍祭", "司祭", "主教", "圣者"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            },
        );

        let mut chapter = ChapterCard::new(card_id("chapter-001"), "灰烬中的醒来", "走出废弃神殿，找到最近的聚落")
            .with_status(ChapterStatus::Active);
        chapter.is_current = true;
        chapter.summary = Some("你在一座坍塌的神殿中醒来，记忆残缺，手中握着一枚发烫的徽记。".to_string());
        chapter.plot_points.push(PlotPoint {
            id: "pp-001".to_string(),
            title: "发烫的徽记".to_string(),
            content: "徽记上刻着已被抹去名字的神明符号。".to_string(),
            secret_notes: "徽记会在靠近神殿祭坛时引来游荡的守卫。".to_string(),
        });

        let mut player = CharacterCard::new(card_id(PLAYER_CHARACTER_ID), "无名旅者")
            .with_class("战士", 1)
            .with_attributes(Attributes {
                strength: 14,
                dexterity: 12,
                constitution: 13,
                intelligence: 10,
                wisdom: 11,
                charisma: 9,
            })
            .with_affiliation("冒险者");
        player.race = vec!["人类".to_string()];
        player.status = vec!["健康".to_string()];
        player.background = vec!["失去记忆的幸存者".to_string()];

        Self {
            world_meta: meta,
            entries: TemplateEntries {
                setting_cards: vec![background, level],
                chapter_cards: vec![chapter],
                character_cards: vec![player],
                interaction_cards: Vec::new(),
            },
        }
    }
}

fn card_id(value: &str) -> CardId {
    CardId::from_trusted(value)
}

/// Summary of a character that is not currently in the scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterSummary {
    pub id: CardId,
    pub name: String,
}

/// The slice of world state forwarded to the model each turn.
#[derive(Debug, Clone)]
pub struct WorldSnapshot<'a> {
    pub active_chapter: Option<&'a ChapterCard>,
    pub active_characters: Vec<&'a CharacterCard>,
    pub inactive_characters: Vec<CharacterSummary>,
    pub settings: Vec<&'a SettingCard>,
}

/// Mutable world state held for the lifetime of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldState {
    meta: WorldMeta,
    cards: Vec<WorldCard>,
    active_character_ids: Vec<CardId>,
}

impl WorldState {
    pub fn from_template(template: WorldTemplate) -> Self {
        let (meta, cards) = template.into_cards();

        let characters = || {
            cards.iter().filter_map(|card| match card {
                WorldCard::Character(c) => Some(&c.id),
                _ => None,
            })
        };
        let active_character_ids = characters()
            .find(|id| **id == PLAYER_CHARACTER_ID)
            .or_else(|| characters().next())
            .cloned()
            .into_iter()
            .collect();

        Self {
            meta,
            cards,
            active_character_ids,
        }
    }

    pub fn meta(&self) -> &WorldMeta {
        &self.meta
    }

    pub fn cards(&self) -> &[WorldCard] {
        &self.cards
    }

    pub fn active_character_ids(&self) -> &[CardId] {
        &self.active_character_ids
    }

    pub fn card(&self, id: &str) -> Option<&WorldCard> {
        self.cards.iter().find(|card| card.id() == id)
    }

    pub fn character(&self, id: &str) -> Option<&CharacterCard> {
        match self.card(id) {
            Some(WorldCard::Character(c)) => Some(c),
            _ => None,
        }
    }

    pub fn characters(&self) -> impl Iterator<Item = &CharacterCard> {
        self.cards.iter().filter_map(|card| match card {
            WorldCard::Character(c) => Some(c),
            _ => None,
        })
    }

    /// Active characters in activation order.
    pub fn active_characters(&self) -> Vec<&CharacterCard> {
        self.active_character_ids
            .iter()
            .filter_map(|id| self.character(id.as_str()))
            .collect()
    }

    /// First chapter marked active, else the one flagged as current.
    pub fn active_chapter(&self) -> Option<&ChapterCard> {
        let chapters = || {
            self.cards.iter().filter_map(|card| match card {
                WorldCard::Chapter(c) => Some(c),
                _ => None,
            })
        };
        chapters()
            .find(|c| c.status == ChapterStatus::Active)
            .or_else(|| chapters().find(|c| c.is_current))
    }

    pub fn setting_by_category(&self, category: SettingCategory) -> Option<&SettingCard> {
        self.cards.iter().find_map(|card| match card {
            WorldCard::Setting(s) if s.category == category => Some(s),
            _ => None,
        })
    }

    /// Class setting whose title matches the character's class name.
    pub fn class_setting_for(&self, character: &CharacterCard) -> Option<&SettingCard> {
        if character.class_name.is_empty() {
            return None;
        }
        self.cards.iter().find_map(|card| match card {
            WorldCard::Setting(s)
                if s.category == SettingCategory::Class
                    && s.title.as_deref() == Some(character.class_name.as_str()) =>
            {
                Some(s)
            }
            _ => None,
        })
    }

    pub fn character_title(&self, character: &CharacterCard) -> String {
        character_full_title(
            character,
            self.setting_by_category(SettingCategory::Level),
            self.class_setting_for(character),
        )
    }

    pub fn snapshot(&self) -> WorldSnapshot<'_> {
        let inactive_characters = self
            .characters()
            .filter(|c| !self.active_character_ids.contains(&c.id))
            .map(|c| CharacterSummary {
                id: c.id.clone(),
                name: c.name.clone(),
            })
            .collect();

        let settings = self
            .cards
            .iter()
            .filter_map(|card| match card {
                WorldCard::Setting(s) if s.visible.is_visible() => Some(s),
                _ => None,
            })
            .collect();

        WorldSnapshot {
            active_chapter: self.active_chapter(),
            active_characters: self.active_characters(),
            inactive_characters,
            settings,
        }
    }

    /// Id derived from `base` that no existing card uses: `base`, `base_1`,
    /// `base_2`, ...
    pub fn unique_card_id(&self, base: &CardId) -> CardId {
        if self.card(base.as_str()).is_none() {
            return base.clone();
        }
        let mut counter = 1u32;
        loop {
            let candidate = format!("{}_{}", base, counter);
            if self.card(&candidate).is_none() {
                return CardId::from_trusted(candidate);
            }
            counter += 1;
        }
    }

    /// Insert a new card, renaming it on id collision. Returns the final id.
    pub fn insert_card(&mut self, mut card: WorldCard) -> CardId {
        let id = self.unique_card_id(card.id());
        card.set_id(id.clone());
        self.cards.push(card);
        id
    }

    /// Replace the card with the same id.
    pub fn replace_card(&mut self, card: WorldCard) -> Result<(), DomainError> {
        let slot = self
            .cards
            .iter_mut()
            .find(|existing| existing.id() == card.id())
            .ok_or_else(|| DomainError::not_found("card", card.id().as_str()))?;
        if slot.kind() != card.kind() {
            return Err(DomainError::constraint(format!(
                "card {} is a {}, not a {}",
                card.id(),
                slot.kind(),
                card.kind()
            )));
        }
        *slot = card;
        Ok(())
    }

    /// Add then remove ids, keeping first-activation order and no duplicates.
    pub fn update_active_characters(&mut self, add: &[CardId], remove: &[CardId]) {
        for id in add {
            if !self.active_character_ids.contains(id) {
                self.active_character_ids.push(id.clone());
            }
        }
        self.active_character_ids.retain(|id| !remove.contains(id));
    }

    pub fn set_active_characters(&mut self, ids: Vec<CardId>) {
        self.active_character_ids.clear();
        self.update_active_characters(&ids, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::card::Visibility;

    fn id(value: &str) -> CardId {
        CardId::new(value).unwrap()
    }

    fn sample_world() -> WorldState {
        let mut hidden = SettingCard::new(id("setting-secret"), SettingCategory::Rule, "禁忌");
        hidden.visible = Visibility::hidden();
        let template = WorldTemplate {
            world_meta: WorldMeta {
                name: "测试".to_string(),
                ..WorldMeta::default()
            },
            entries: TemplateEntries {
                setting_cards: vec![
                    SettingCard::new(id("setting-bg"), SettingCategory::Background, "背景"),
                    hidden,
                ],
                chapter_cards: vec![
                    ChapterCard::new(id("chapter-0"), "旧章", "已完成")
                        .with_status(ChapterStatus::Completed),
                    ChapterCard::new(id("chapter-1"), "新章", "前进")
                        .with_status(ChapterStatus::Active),
                ],
                character_cards: vec![
                    CharacterCard::new(id("char-002"), "守卫"),
                    CharacterCard::new(id("char-001"), "旅者"),
                ],
                interaction_cards: Vec::new(),
            },
        };
        WorldState::from_template(template)
    }

    #[test]
    fn player_character_is_active_by_default() {
        let world = sample_world();
        assert_eq!(world.active_character_ids(), &[id("char-001")]);
    }

    #[test]
    fn first_character_is_active_without_player_card() {
        let template = WorldTemplate {
            world_meta: WorldMeta::default(),
            entries: TemplateEntries {
                character_cards: vec![CharacterCard::new(id("npc-7"), "商人")],
                ..TemplateEntries::default()
            },
        };
        let world = WorldState::from_template(template);
        assert_eq!(world.active_character_ids(), &[id("npc-7")]);
    }

    #[test]
    fn snapshot_filters_settings_and_splits_characters() {
        let world = sample_world();
        let snapshot = world.snapshot();

        assert_eq!(snapshot.active_chapter.map(|c| c.title.as_str()), Some("新章"));
        assert_eq!(snapshot.settings.len(), 1);
        assert_eq!(snapshot.active_characters.len(), 1);
        assert_eq!(snapshot.inactive_characters[0].name, "守卫");
    }

    #[test]
    fn active_chapter_falls_back_to_current_flag() {
        let mut chapter = ChapterCard::new(id("c"), "当前", "目标");
        chapter.is_current = true;
        let template = WorldTemplate {
            world_meta: WorldMeta::default(),
            entries: TemplateEntries {
                chapter_cards: vec![chapter],
                ..TemplateEntries::default()
            },
        };
        let world = WorldState::from_template(template);
        assert_eq!(world.active_chapter().map(|c| c.title.as_str()), Some("当前"));
    }

    #[test]
    fn insert_card_suffixes_colliding_ids() {
        let mut world = sample_world();
        let first = world.insert_card(WorldCard::Character(CharacterCard::new(id("char-002"), "双子")));
        let second = world.insert_card(WorldCard::Character(CharacterCard::new(id("char-002"), "三子")));

        assert_eq!(first, "char-002_1");
        assert_eq!(second, "char-002_2");
        assert_eq!(world.character("char-002_2").map(|c| c.name.as_str()), Some("三子"));
    }

    #[test]
    fn replace_card_requires_existing_card_of_same_kind() {
        let mut world = sample_world();
        let missing = WorldCard::Character(CharacterCard::new(id("ghost"), "幽灵"));
        assert!(matches!(
            world.replace_card(missing),
            Err(DomainError::NotFound { .. })
        ));

        let wrong_kind = WorldCard::Setting(SettingCard::new(
            id("char-002"),
            SettingCategory::Rule,
            "冒名",
        ));
        assert!(matches!(
            world.replace_card(wrong_kind),
            Err(DomainError::Constraint(_))
        ));

        let renamed = WorldCard::Character(CharacterCard::new(id("char-002"), "队长"));
        world.replace_card(renamed).unwrap();
        assert_eq!(world.character("char-002").map(|c| c.name.as_str()), Some("队长"));
    }

    #[test]
    fn active_characters_behave_as_ordered_set() {
        let mut world = sample_world();
        world.update_active_characters(&[id("char-002"), id("char-001")], &[]);
        assert_eq!(world.active_character_ids(), &[id("char-001"), id("char-002")]);

        world.update_active_characters(&[], &[id("char-001")]);
        assert_eq!(world.active_character_ids(), &[id("char-002")]);

        world.set_active_characters(vec![id("char-001"), id("char-001")]);
        assert_eq!(world.active_character_ids(), &[id("char-001")]);
    }

    #[test]
    fn oort_template_round_trips_through_json() {
        let template = WorldTemplate::oort();
        let json = serde_json::to_string(&template).unwrap();
        let back: WorldTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, template);

        let world = WorldState::from_template(back);
        let player = world.character(PLAYER_CHARACTER_ID).unwrap();
        assert_eq!(world.character_title(player), "见习 战士");
    }
}
