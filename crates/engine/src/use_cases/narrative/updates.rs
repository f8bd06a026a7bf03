//! Applying model-issued world changes.

use serde_json::{Map, Value};

use faramita_domain::{CardId, CardKind, DomainError, WorldCard, WorldState};

use super::response::{ActiveRole, UpdateAction, WorldUpdate};
use crate::infrastructure::ports::RandomPort;

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("Update data for {0} is not a JSON object")]
    NotAnObject(CardKind),
    #[error("UPDATE of {0} has no target_id")]
    MissingTarget(CardKind),
    #[error("No card with id {0}")]
    UnknownCard(String),
    #[error("Invalid card data: {0}")]
    InvalidCard(#[from] serde_json::Error),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Merge `source` into `target`.
///
/// Objects merge per key, arrays become an order-preserving union, anything
/// else in `source` replaces `target`.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target), Value::Object(source)) => {
            for (key, value) in source {
                let merged = match target.remove(&key) {
                    Some(existing) if !existing.is_null() => deep_merge(existing, value),
                    _ => value,
                };
                target.insert(key, merged);
            }
            Value::Object(target)
        }
        (Value::Array(mut target), Value::Array(source)) => {
            for item in source {
                if !target.contains(&item) {
                    target.push(item);
                }
            }
            Value::Array(target)
        }
        (Value::Array(mut target), item) if !item.is_null() && !item.is_object() => {
            if !target.contains(&item) {
                target.push(item);
            }
            Value::Array(target)
        }
        (_, source) => source,
    }
}

// Models often send a single string where the card stores a list
fn coerce_list_fields(data: &mut Map<String, Value>) {
    for key in ["status", "background"] {
        if let Some(Value::String(s)) = data.get(key) {
            let list = if s.trim().is_empty() {
                Vec::new()
            } else {
                vec![Value::String(s.clone())]
            };
            data.insert(key.to_string(), Value::Array(list));
        }
    }
}

fn create_card(
    world: &mut WorldState,
    update: &WorldUpdate,
    random: &dyn RandomPort,
) -> Result<String, UpdateError> {
    let Value::Object(mut data) = update.data.clone() else {
        return Err(UpdateError::NotAnObject(update.kind));
    };
    data.insert("type".to_string(), Value::String(update.kind.as_str().to_string()));

    let has_id = data
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.trim().is_empty());
    if !has_id {
        let id = update
            .target_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| random.gen_uuid().to_string());
        data.insert("id".to_string(), Value::String(id));
    }

    let card: WorldCard = serde_json::from_value(Value::Object(data))?;
    let kind = card.kind();
    let name = card.display_name().to_string();
    let id = world.insert_card(card);
    if kind == CardKind::Character {
        world.update_active_characters(std::slice::from_ref(&id), &[]);
    }

    tracing::info!(card_id = %id, kind = %kind, "Created card from model update");
    Ok(format!("Created new {}: {}", kind, name))
}

fn update_card(world: &mut WorldState, update: &WorldUpdate) -> Result<String, UpdateError> {
    let target = update
        .target_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or(UpdateError::MissingTarget(update.kind))?;
    let existing = world
        .card(target)
        .ok_or_else(|| UpdateError::UnknownCard(target.to_string()))?;

    let Value::Object(mut data) = update.data.clone() else {
        return Err(UpdateError::NotAnObject(update.kind));
    };
    coerce_list_fields(&mut data);

    let mut merged = deep_merge(serde_json::to_value(existing)?, Value::Object(data));
    if let Value::Object(fields) = &mut merged {
        fields.insert("id".to_string(), Value::String(target.to_string()));
        fields.insert("type".to_string(), Value::String(update.kind.as_str().to_string()));
    }

    let card: WorldCard = serde_json::from_value(merged)?;
    let kind = card.kind();
    let name = card.display_name().to_string();
    world.replace_card(card)?;

    tracing::info!(card_id = %target, kind = %kind, "Merged model update into card");
    Ok(format!("Updated {}: {}", kind, name))
}

/// Apply every update in order and return one notification per success.
///
/// Failed updates are logged and skipped.
pub fn apply_world_updates(
    world: &mut WorldState,
    updates: &[WorldUpdate],
    random: &dyn RandomPort,
) -> Vec<String> {
    updates
        .iter()
        .filter_map(|update| {
            let applied = match update.action {
                UpdateAction::Create => create_card(world, update, random),
                UpdateAction::Update => update_card(world, update),
            };
            match applied {
                Ok(notification) => Some(notification),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        action = ?update.action,
                        kind = %update.kind,
                        target_id = ?update.target_id,
                        "Skipping world update"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Characters entering and leaving the scene.
pub fn apply_active_role(world: &mut WorldState, role: &ActiveRole) {
    fn parse(ids: &[String]) -> Vec<CardId> {
        ids.iter().filter_map(|id| CardId::new(id.as_str()).ok()).collect()
    }
    let add = parse(&role.add);
    let remove = parse(&role.delete);
    if add.is_empty() && remove.is_empty() {
        return;
    }
    world.update_active_characters(&add, &remove);
    tracing::debug!(
        active = ?world.active_character_ids(),
        "Active characters changed"
    );
}
