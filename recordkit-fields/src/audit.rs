//! Audit records emitted by schema mutations, consumed by history views.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{EntityType, FieldDefinition, FieldId};

/// Bookkeeping attributes that change on every write and are not reported.
const IGNORED_ATTRIBUTES: &[&str] = &["updatedAt", "updatedBy"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

/// One schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub field_id: FieldId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_attributes: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_values: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_values: Option<Map<String, Value>>,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Record for a newly created field, with its full snapshot.
    pub fn created(def: &FieldDefinition, actor: &str) -> Self {
        Self {
            action: AuditAction::Create,
            entity_type: def.entity_type,
            field_id: def.id,
            changed_attributes: None,
            before_values: None,
            after_values: Some(snapshot(def)),
            actor: actor.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Record for an update, listing only the attributes that differ.
    pub fn updated(before: &FieldDefinition, after: &FieldDefinition, actor: &str) -> Self {
        let before_map = snapshot(before);
        let after_map = snapshot(after);
        let changed: BTreeSet<String> = before_map
            .keys()
            .chain(after_map.keys())
            .filter(|k| !IGNORED_ATTRIBUTES.contains(&k.as_str()))
            .filter(|k| before_map.get(*k) != after_map.get(*k))
            .cloned()
            .collect();
        let pick = |map: &Map<String, Value>| -> Map<String, Value> {
            changed
                .iter()
                .map(|k| (k.clone(), map.get(k).cloned().unwrap_or(Value::Null)))
                .collect()
        };
        Self {
            action: AuditAction::Update,
            entity_type: after.entity_type,
            field_id: after.id,
            before_values: Some(pick(&before_map)),
            after_values: Some(pick(&after_map)),
            changed_attributes: Some(changed),
            actor: actor.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Record for a deleted field, with its last snapshot.
    pub fn deleted(def: &FieldDefinition, actor: &str) -> Self {
        Self {
            action: AuditAction::Delete,
            entity_type: def.entity_type,
            field_id: def.id,
            changed_attributes: None,
            before_values: Some(snapshot(def)),
            after_values: None,
            actor: actor.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Whether an update record carries any real change.
    pub fn has_changes(&self) -> bool {
        self.changed_attributes
            .as_ref()
            .is_none_or(|set| !set.is_empty())
    }
}

fn snapshot(def: &FieldDefinition) -> Map<String, Value> {
    match serde_json::to_value(def) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
