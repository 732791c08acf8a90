//! Runtime field values and the label-keyed storage adapter.
//!
//! Forms work with [`FieldValues`], keyed by `fieldName`. Persisted records
//! keep their custom values keyed by `fieldLabel`; [`to_label_keyed`] and
//! [`from_label_keyed`] are the only places that translate between the two.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::types::{EntityType, FieldDefinition};

/// A single stored or entered value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Text form of the value. Lists are joined with `", "`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s.as_str()),
            FieldValue::Bool(b) => Cow::Owned(b.to_string()),
            FieldValue::Number(n) => Cow::Owned(n.to_string()),
            FieldValue::List(items) => Cow::Owned(items.join(", ")),
        }
    }

    /// Individual items: the list elements, or the scalar as one item.
    pub fn items(&self) -> Vec<Cow<'_, str>> {
        match self {
            FieldValue::List(items) => items.iter().map(|s| Cow::Borrowed(s.as_str())).collect(),
            other => vec![other.as_text()],
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Custom values as persisted with a record: keyed by field label.
pub type LabelKeyedValues = BTreeMap<String, FieldValue>;

/// Runtime custom values of one record, keyed by `fieldName`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValues(BTreeMap<String, FieldValue>);

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_name: &str) -> Option<&FieldValue> {
        self.0.get(field_name)
    }

    pub fn insert(&mut self, field_name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field_name.into(), value.into());
    }

    pub fn with(mut self, field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field_name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the given definition.
    pub fn value_of(&self, def: &FieldDefinition) -> Option<&FieldValue> {
        self.get(&def.field_name)
    }
}

impl FromIterator<(String, FieldValue)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Which storage key each definition owns.
///
/// A definition is stored under its label, except when the label is empty,
/// already owned by an earlier definition, or equal to another definition's
/// `fieldName`; then it is stored under its own `fieldName`. Field names are
/// unique, so every definition ends up with a distinct key.
fn storage_keys(defs: &[FieldDefinition]) -> Vec<(&FieldDefinition, &str)> {
    let names: HashSet<&str> = defs.iter().map(|d| d.field_name.as_str()).collect();
    let mut claimed: HashSet<&str> = HashSet::new();
    defs.iter()
        .filter(|d| !d.is_composite())
        .map(|d| {
            let label = d.field_label.as_str();
            let usable = !label.is_empty() && (label == d.field_name || !names.contains(label));
            if usable && claimed.insert(label) {
                (d, label)
            } else {
                (d, d.field_name.as_str())
            }
        })
        .collect()
}

/// Convert runtime values into the label-keyed persisted form.
pub fn to_label_keyed(values: &FieldValues, defs: &[FieldDefinition]) -> LabelKeyedValues {
    let mut out = LabelKeyedValues::new();
    for (def, key) in storage_keys(defs) {
        if let Some(value) = values.get(&def.field_name) {
            out.insert(key.to_string(), value.clone());
        }
    }
    out
}

/// Convert a label-keyed persisted map into runtime values.
///
/// Keys that match no definition are dropped.
pub fn from_label_keyed(stored: &LabelKeyedValues, defs: &[FieldDefinition]) -> FieldValues {
    let keys = storage_keys(defs);
    let mut out = FieldValues::new();
    for (key, value) in stored {
        let owner = keys
            .iter()
            .find(|(_, k)| *k == key.as_str())
            .map(|(d, _)| *d)
            .or_else(|| defs.iter().find(|d| d.field_name == *key));
        match owner {
            Some(def) => out.insert(def.field_name.clone(), value.clone()),
            None => debug!(key = %key, "dropping stored value with no matching field"),
        }
    }
    out
}

/// Source of persisted custom values for records.
#[async_trait]
pub trait EntityValueSource: Send + Sync {
    /// Label-keyed custom values of one record.
    async fn load_entity_values(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<LabelKeyedValues>;
}

/// Load a record's custom values and key them by `fieldName`.
pub async fn load_runtime_values(
    source: &dyn EntityValueSource,
    defs: &[FieldDefinition],
    entity_type: EntityType,
    entity_id: &str,
) -> Result<FieldValues> {
    let stored = source.load_entity_values(entity_type, entity_id).await?;
    Ok(from_label_keyed(&stored, defs))
}
