//! Composite grouping and dependency gating.
//!
//! Fields listed in some composite's `subFieldIds` never render on their own;
//! the composite renders once, at its own sort position, with its sub-fields
//! in declared order. A field with `dependentOnFieldId` stays disabled until
//! the target field holds a present value.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::{FieldsError, Result};
use crate::registry::FieldTypeRegistry;
use crate::types::{FieldDefinition, FieldId};
use crate::values::FieldValues;

/// One rendered slot of a form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayoutEntry<'a> {
    Standalone {
        field: &'a FieldDefinition,
    },
    #[serde(rename_all = "camelCase")]
    CompositeGroup {
        composite: &'a FieldDefinition,
        sub_fields: Vec<&'a FieldDefinition>,
    },
}

impl<'a> LayoutEntry<'a> {
    /// The definition that anchors this slot's position.
    pub fn anchor(&self) -> &'a FieldDefinition {
        match self {
            LayoutEntry::Standalone { field } => field,
            LayoutEntry::CompositeGroup { composite, .. } => composite,
        }
    }
}

/// Visible layout of a field set, in display order.
pub fn resolve_layout(defs: &[FieldDefinition]) -> Vec<LayoutEntry<'_>> {
    layout(defs, false)
}

/// Layout including hidden fields, used for required-satisfaction checks.
pub(crate) fn layout(defs: &[FieldDefinition], include_hidden: bool) -> Vec<LayoutEntry<'_>> {
    let by_id: HashMap<FieldId, &FieldDefinition> = defs.iter().map(|d| (d.id, d)).collect();
    let grouped: HashSet<FieldId> = defs
        .iter()
        .filter(|d| d.is_composite())
        .flat_map(|d| d.sub_field_ids.iter().copied())
        .filter(|id| by_id.get(id).is_some_and(|d| !d.is_composite()))
        .collect();

    let mut ordered: Vec<&FieldDefinition> = defs.iter().collect();
    ordered.sort_by_key(|d| d.sort_order);

    let mut entries = Vec::new();
    for def in ordered {
        if def.is_hidden && !include_hidden {
            continue;
        }
        if def.is_composite() {
            let sub_fields: Vec<&FieldDefinition> = def
                .sub_field_ids
                .iter()
                .filter(|id| **id != def.id)
                .filter_map(|id| by_id.get(id).copied())
                .filter(|d| !d.is_composite())
                .filter(|d| include_hidden || !d.is_hidden)
                .collect();
            if !sub_fields.is_empty() {
                entries.push(LayoutEntry::CompositeGroup {
                    composite: def,
                    sub_fields,
                });
            }
        } else if !grouped.contains(&def.id) {
            entries.push(LayoutEntry::Standalone { field: def });
        }
    }
    entries
}

/// Whether a form should let the user edit `field` given the current values.
pub fn is_editable(defs: &[FieldDefinition], values: &FieldValues, field: &FieldDefinition) -> bool {
    if field.is_read_only {
        return false;
    }
    let Some(target_id) = field.dependent_on_field_id else {
        return true;
    };
    match defs.iter().find(|d| d.id == target_id) {
        // A dangling reference gates nothing; delete cleans these up.
        None => true,
        Some(target) if target.is_hidden => false,
        Some(target) => FieldTypeRegistry::is_present(target.field_type, values.value_of(target)),
    }
}

/// Fields `field` may be made dependent on: visible, non-composite, same
/// entity type, and not already depending on `field`.
pub fn dependency_targets<'a>(
    defs: &'a [FieldDefinition],
    field: &FieldDefinition,
) -> Vec<&'a FieldDefinition> {
    defs.iter()
        .filter(|d| d.id != field.id)
        .filter(|d| d.entity_type == field.entity_type)
        .filter(|d| !d.is_hidden && !d.is_composite())
        .filter(|d| detect_cycle(defs, field.id, d.id).is_ok())
        .collect()
}

/// Walk the dependency chain starting at `candidate`; fail if it reaches
/// `field_id`.
pub fn detect_cycle(defs: &[FieldDefinition], field_id: FieldId, candidate: FieldId) -> Result<()> {
    let by_id: HashMap<FieldId, &FieldDefinition> = defs.iter().map(|d| (d.id, d)).collect();
    let name_of = |id: FieldId| {
        by_id
            .get(&id)
            .map(|d| d.field_name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let mut path = vec![name_of(field_id)];
    let mut seen = HashSet::new();
    let mut current = Some(candidate);
    while let Some(id) = current {
        path.push(name_of(id));
        if id == field_id {
            return Err(FieldsError::CyclicDependency {
                path: path.join(" -> "),
            });
        }
        if !seen.insert(id) {
            // A pre-existing loop that does not pass through `field_id`.
            break;
        }
        current = by_id.get(&id).and_then(|d| d.dependent_on_field_id);
    }
    Ok(())
}

/// The composite that lists `field_id` as a sub-field, if any.
pub fn composite_owner(defs: &[FieldDefinition], field_id: FieldId) -> Option<&FieldDefinition> {
    defs.iter()
        .find(|d| d.is_composite() && d.id != field_id && d.sub_field_ids.contains(&field_id))
}
