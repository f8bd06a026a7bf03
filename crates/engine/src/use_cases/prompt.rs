//! System prompt assembly from the world snapshot.

use std::collections::HashMap;
use std::fmt::Write;

use faramita_domain::{
    CardId, CharacterCard, ChronicleEntry, ChronicleRole, WorldMeta, WorldSnapshot, WorldState,
};

use crate::infrastructure::config::ResponseMode;

const NARRATIVE_FORMAT: &str = "直接输出叙事内容，不需要JSON格式。";

const STRUCTURED_FORMAT: &str = r#"You MUST respond with a valid JSON object. Do NOT include any text outside the JSON block.
Internal keys and structure must remain English; the content of "sequence" MUST be in Chinese (Simplified).
{
  "sequence": [
    { "type": "environment", "content": "Environmental description..." },
    { "type": "dialogue", "speaker_name": "Name", "content": "Spoken text..." }
  ],
  "interaction": {
    "needs_roll": false,
    "dc": 12,
    "description": "Reason for roll",
    "attribute": "str|dex|con|int|wis|cha"
  },
  "active_role": { "add": ["char_id"], "delete": ["char_id"] },
  "world_updates": [
    {
      "action": "CREATE | UPDATE",
      "type": "character | setting | interaction | chapter",
      "target_id": "id_if_update",
      "data": { }
    }
  ]
}"#;

/// Build the system prompt for `snapshot`.
///
/// `titles` maps character ids to full titles; characters without an entry
/// are shown by name only.
pub fn build_system_prompt(
    meta: &WorldMeta,
    snapshot: &WorldSnapshot<'_>,
    titles: &HashMap<CardId, String>,
    mode: ResponseMode,
) -> String {
    let mut out = String::new();

    out.push_str("# Role\n");
    let _ = writeln!(out, "你是「{}」世界的游戏主持人(GM)。", meta.name);
    out.push_str("你的目标是编织一个引人入胜的叙事，涉及神明、魔法和命运。\n");

    let context = world_context(meta, snapshot, titles);
    if !context.is_empty() {
        out.push_str("\n# World Context\n");
        out.push_str(&context);
    }

    out.push_str("\n# Rules\n");
    out.push_str("1. 使用生动、感官丰富的描述（视觉、声音、气味）。\n");
    out.push_str("2. 保持严肃、沉浸的黑暗奇幻基调。\n");
    out.push_str("3. 用中文回复。\n");
    if mode == ResponseMode::Structured {
        out.push_str("4. 将环境描写与角色对白分开，对白须符合角色身份。\n");
        out.push_str("5. 只有在结果真正无法裁定时才设置 interaction.needs_roll = true。\n");
        out.push_str("6. 遇到新角色或新地点时，使用 world_updates 或 active_role 更新状态。\n");
        out.push_str("7. 玩家输入含糊或剧情停滞时，主动引入新的事件、威胁或发现。\n");
    }

    out.push_str("\n# Interaction System\n");
    out.push_str("- 如果需要投骰，使用 [[XdY+Z]] 格式（例如：[[1d20+5]]）\n");
    out.push_str("- 玩家输入 \"掷骰\" 或 \"roll\" 时，自动投掷最近一次需要的骰子\n");

    out.push_str("\n# Response Format\n");
    out.push_str(match mode {
        ResponseMode::Narrative => NARRATIVE_FORMAT,
        ResponseMode::Structured => STRUCTURED_FORMAT,
    });
    out.push('\n');

    out
}

/// Prompt for the current world state, with titles resolved from its settings.
pub fn system_prompt_for(world: &WorldState, mode: ResponseMode) -> String {
    let snapshot = world.snapshot();
    let titles = snapshot
        .active_characters
        .iter()
        .map(|c| (c.id.clone(), world.character_title(c)))
        .collect();
    build_system_prompt(world.meta(), &snapshot, &titles, mode)
}

fn world_context(
    meta: &WorldMeta,
    snapshot: &WorldSnapshot<'_>,
    titles: &HashMap<CardId, String>,
) -> String {
    let mut out = String::new();

    if !meta.description.trim().is_empty() {
        out.push_str(meta.description.trim());
        out.push('\n');
    }

    if !snapshot.settings.is_empty() {
        out.push_str("\n## Settings\n");
        for setting in &snapshot.settings {
            let _ = write!(out, "- {} ({})", setting.title_or_id(), setting.category);
            match setting.content.as_deref() {
                Some(content) if !content.is_empty() => {
                    let _ = writeln!(out, ": {content}");
                }
                _ => out.push('\n'),
            }
        }
    }

    if let Some(chapter) = snapshot.active_chapter {
        let _ = writeln!(out, "\n## Current Chapter: {}", chapter.title);
        if !chapter.objective.is_empty() {
            let _ = writeln!(out, "Objective: {}", chapter.objective);
        }
        if let Some(summary) = chapter.summary.as_deref().filter(|s| !s.is_empty()) {
            let _ = writeln!(out, "Summary: {summary}");
        }
        if !chapter.plot_points.is_empty() {
            out.push_str("Plot Points:\n");
            for point in &chapter.plot_points {
                let _ = write!(out, "- {}: {}", point.title, point.content);
                if point.secret_notes.is_empty() {
                    out.push('\n');
                } else {
                    let _ = writeln!(out, " (Secret: {})", point.secret_notes);
                }
            }
        }
    }

    if !snapshot.active_characters.is_empty() {
        out.push_str("\n## Active Characters\n");
        for character in &snapshot.active_characters {
            character_block(&mut out, character, titles.get(&character.id));
        }
    }

    if !snapshot.inactive_characters.is_empty() {
        out.push_str("\n## Other Characters (Summary)\n");
        for summary in &snapshot.inactive_characters {
            let _ = writeln!(out, "- {} ({})", summary.name, summary.id);
        }
    }

    out
}

fn character_block(out: &mut String, c: &CharacterCard, title: Option<&String>) {
    match title.filter(|t| !t.is_empty()) {
        Some(title) => {
            let _ = writeln!(out, "### {} (ID: {}) - {}", c.name, c.id, title);
        }
        None => {
            let _ = writeln!(out, "### {} (ID: {})", c.name, c.id);
        }
    }
    let _ = writeln!(
        out,
        "Race: {}, Class: {}, Level: {}",
        join_or(&c.race, ", ", "Unknown"),
        if c.class_name.is_empty() { "Unknown" } else { c.class_name.as_str() },
        c.level
    );
    let _ = writeln!(out, "Attributes: {}", c.attributes);
    let _ = writeln!(out, "Status: {}", join_or(&c.status, ", ", "None"));
    if !c.personality.is_empty() {
        let _ = writeln!(out, "Personality: {}", c.personality.join(", "));
    }
    if !c.background.is_empty() {
        let _ = writeln!(out, "Background: {}", c.background.join(" "));
    }
    if !c.inventory.is_empty() {
        let items: Vec<String> = c
            .inventory
            .iter()
            .map(|i| {
                if i.description.is_empty() {
                    i.item.clone()
                } else {
                    format!("{} ({})", i.item, i.description)
                }
            })
            .collect();
        let _ = writeln!(out, "Inventory: {}", items.join(", "));
    }
}

fn join_or(values: &[String], sep: &str, fallback: &str) -> String {
    if values.is_empty() {
        fallback.to_string()
    } else {
        values.join(sep)
    }
}

/// Text sent to the model for a chronicle entry.
///
/// Structured assistant replies are flattened into `speaker: line` and
/// `(Environment: ...)` lines; everything else passes through.
pub fn format_history_entry(entry: &ChronicleEntry) -> String {
    if entry.role != ChronicleRole::Assistant {
        return entry.content.clone();
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(&entry.content) else {
        return entry.content.clone();
    };
    let Some(sequence) = value.get("sequence").and_then(|s| s.as_array()) else {
        return entry.content.clone();
    };

    sequence
        .iter()
        .map(|item| {
            let content = item.get("content").and_then(|c| c.as_str()).unwrap_or_default();
            match (
                item.get("type").and_then(|t| t.as_str()),
                item.get("speaker_name").and_then(|s| s.as_str()),
            ) {
                (Some("dialogue"), Some(speaker)) => format!("{speaker}: {content}"),
                _ => format!("(Environment: {content})"),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use faramita_domain::{
        ChapterCard, ChapterStatus, InventoryItem, PlotPoint, SettingCard, SettingCategory,
        TemplateEntries, Visibility, WorldTemplate,
    };

    fn id(value: &str) -> CardId {
        CardId::new(value).unwrap()
    }

    fn world() -> WorldState {
        let mut secret = SettingCard::new(id("s-hidden"), SettingCategory::Rule, "隐秘规则");
        secret.visible = Visibility::hidden();

        let mut chapter = ChapterCard::new(id("ch-1"), "雾港", "找到向导")
            .with_status(ChapterStatus::Active);
        chapter.plot_points.push(PlotPoint {
            id: "pp-1".into(),
            title: "灯塔".into(),
            content: "灯塔熄灭了".into(),
            secret_notes: "守塔人已死".into(),
        });

        let mut hero = CharacterCard::new(id("char-001"), "旅者").with_class("战士", 3);
        hero.inventory.push(InventoryItem {
            item: "短剑".into(),
            description: "生锈".into(),
            effect: None,
        });

        WorldState::from_template(WorldTemplate {
            world_meta: WorldMeta {
                name: "灰港".into(),
                description: "雾中的港口".into(),
                ..WorldMeta::default()
            },
            entries: TemplateEntries {
                setting_cards: vec![
                    SettingCard::new(id("s-bg"), SettingCategory::Background, "雾")
                        .with_content("永不散去"),
                    secret,
                ],
                chapter_cards: vec![chapter],
                character_cards: vec![hero, CharacterCard::new(id("npc-1"), "船夫")],
                interaction_cards: Vec::new(),
            },
        })
    }

    #[test]
    fn narrative_prompt_contains_world_context() {
        let prompt = system_prompt_for(&world(), ResponseMode::Narrative);

        assert!(prompt.starts_with("# Role\n你是「灰港」世界的游戏主持人(GM)。"));
        assert!(prompt.contains("雾中的港口"));
        assert!(prompt.contains("- 雾 (background): 永不散去"));
        assert!(!prompt.contains("隐秘规则"));
        assert!(prompt.contains("## Current Chapter: 雾港"));
        assert!(prompt.contains("- 灯塔: 灯塔熄灭了 (Secret: 守塔人已死)"));
        assert!(prompt.contains("### 旅者 (ID: char-001) - 战士"));
        assert!(prompt.contains("Inventory: 短剑 (生锈)"));
        assert!(prompt.contains("- 船夫 (npc-1)"));
        assert!(prompt.contains("[[XdY+Z]]"));
        assert!(prompt.ends_with("直接输出叙事内容，不需要JSON格式。\n"));
    }

    #[test]
    fn structured_prompt_describes_json_schema() {
        let prompt = system_prompt_for(&world(), ResponseMode::Structured);
        assert!(prompt.contains("\"world_updates\""));
        assert!(prompt.contains("needs_roll"));
        assert!(!prompt.contains(NARRATIVE_FORMAT));
    }

    #[test]
    fn empty_world_omits_context_section() {
        let world = WorldState::from_template(WorldTemplate {
            world_meta: WorldMeta {
                name: "空".into(),
                ..WorldMeta::default()
            },
            entries: TemplateEntries::default(),
        });
        let prompt = system_prompt_for(&world, ResponseMode::Narrative);
        assert!(!prompt.contains("# World Context"));
        assert!(!prompt.contains("## Active Characters"));
    }

    #[test]
    fn structured_history_is_flattened() {
        let entry = ChronicleEntry::new(
            1,
            ChronicleRole::Assistant,
            r#"{"sequence":[{"type":"environment","content":"雨停了"},{"type":"dialogue","speaker_name":"船夫","content":"上船吧"}]}"#,
            Utc::now(),
        );
        assert_eq!(format_history_entry(&entry), "(Environment: 雨停了)\n船夫: 上船吧");
    }

    #[test]
    fn plain_history_passes_through() {
        let narrative = ChronicleEntry::new(1, ChronicleRole::Assistant, "雨停了", Utc::now());
        assert_eq!(format_history_entry(&narrative), "雨停了");

        let user_json = ChronicleEntry::new(1, ChronicleRole::User, r#"{"sequence":[]}"#, Utc::now());
        assert_eq!(format_history_entry(&user_json), r#"{"sequence":[]}"#);
    }
}
