//! Level titles derived from level and class settings.

use super::card::{CharacterCard, ScalingMode, SettingCard};

fn ladder_index(level: u32, step: u32, len: usize) -> usize {
    let step = step.max(1);
    let rung = (level.saturating_sub(1) / step) as usize;
    rung.min(len.saturating_sub(1))
}

fn prefix_for(mode: &ScalingMode, level: u32) -> Option<&str> {
    mode.prefix_names
        .get(ladder_index(level, mode.step, mode.prefix_names.len()))
        .map(String::as_str)
}

/// Render a level through a setting's scaling mode or suffix ladder.
///
/// With `suffix_only` only the rung name (or the bare level) is returned.
pub fn level_display(
    level: u32,
    setting: &SettingCard,
    mode: Option<&str>,
    suffix_only: bool,
) -> String {
    let title = setting.title.as_deref().unwrap_or_default();

    if let Some(prefix) = mode
        .and_then(|name| setting.scaling_modes.get(name))
        .and_then(|mode| prefix_for(mode, level))
    {
        return if suffix_only {
            prefix.to_string()
        } else {
            format!("{prefix}{title}")
        };
    }

    if let Some(step) = setting.step {
        if let Some(suffix) = setting
            .suffix_names
            .get(ladder_index(level, step, setting.suffix_names.len()))
        {
            return if suffix_only {
                suffix.clone()
            } else {
                format!("{title}{suffix}")
            };
        }
    }

    if suffix_only {
        level.to_string()
    } else {
        format!("{title} Lv.{level}")
    }
}

/// Full title such as "银阶 剑士".
///
/// A manual `prefix_name` wins. Otherwise the first affiliation naming a
/// scaling mode of the level setting (else its default mode) supplies the
/// prefix. The class part comes from the class setting's ladder, or the raw
/// class name.
pub fn character_full_title(
    character: &CharacterCard,
    level_setting: Option<&SettingCard>,
    class_setting: Option<&SettingCard>,
) -> String {
    let class_suffix = match class_setting {
        Some(setting) => level_display(character.level, setting, None, true),
        None => character.class_name.clone(),
    };

    let prefix = character.prefix_name.clone().or_else(|| {
        let setting = level_setting?;
        let mode_name = character
            .affiliation
            .iter()
            .find(|aff| setting.scaling_modes.contains_key(aff.as_str()))
            .or(setting.default_mode.as_ref())?;
        let mode = setting.scaling_modes.get(mode_name)?;
        prefix_for(mode, character.level).map(str::to_string)
    });

    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix} {class_suffix}"),
        _ => class_suffix,
    }
}

/// Ability modifier: `floor((value - 10) / 2)`.
pub fn attribute_bonus(value: i32) -> i32 {
    value.saturating_sub(10).div_euclid(2)
}
