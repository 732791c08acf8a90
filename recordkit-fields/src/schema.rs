//! SchemaService: create, update, delete and reorder field definitions.
//!
//! Every mutation re-checks the structural invariants against the current
//! definitions of the entity type before it reaches the store, and appends an
//! audit record once the store accepted it. Checks run in a fixed order so a
//! request that breaks several rules always reports the same error:
//! duplicate name, invalid reference, cycle, read-only conflict.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::AuditRecord;
use crate::config::FieldsConfig;
use crate::error::{FieldsError, Result};
use crate::resolver::{composite_owner, detect_cycle};
use crate::store::FieldStore;
use crate::types::{EntityType, FieldChanges, FieldDefinition, FieldDraft, FieldId};

/// The three mutually constrained flags of a definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFlags {
    pub is_required: bool,
    pub is_hidden: bool,
    pub is_read_only: bool,
}

impl FieldFlags {
    pub fn of(def: &FieldDefinition) -> Self {
        Self {
            is_required: def.is_required,
            is_hidden: def.is_hidden,
            is_read_only: def.is_read_only,
        }
    }

    fn apply_to(self, def: &mut FieldDefinition) {
        def.is_required = self.is_required;
        def.is_hidden = self.is_hidden;
        def.is_read_only = self.is_read_only;
    }
}

/// Requested flag changes; `None` leaves a flag as it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagChanges {
    pub is_required: Option<bool>,
    pub is_hidden: Option<bool>,
    pub is_read_only: Option<bool>,
}

impl From<&FieldChanges> for FlagChanges {
    fn from(changes: &FieldChanges) -> Self {
        Self {
            is_required: changes.is_required,
            is_hidden: changes.is_hidden,
            is_read_only: changes.is_read_only,
        }
    }
}

/// Apply `changes` to `current` and restore the flag invariants.
///
/// Required and hidden exclude each other: the flag set true in the request
/// wins, and required wins when both are requested. Read-only clears required
/// unless required was explicitly requested in the same call, in which case
/// both stay set and the caller reports a [`FieldsError::ReadOnlyConflict`].
pub fn coerce_flags(current: FieldFlags, changes: FlagChanges) -> FieldFlags {
    let mut flags = current;
    if let Some(v) = changes.is_required {
        flags.is_required = v;
    }
    if let Some(v) = changes.is_hidden {
        flags.is_hidden = v;
    }
    if let Some(v) = changes.is_read_only {
        flags.is_read_only = v;
    }

    let required_requested = changes.is_required == Some(true);
    if required_requested {
        flags.is_hidden = false;
    } else if changes.is_hidden == Some(true) {
        flags.is_required = false;
    }
    if flags.is_read_only && flags.is_required && !required_requested {
        flags.is_required = false;
    }
    if flags.is_required && flags.is_hidden {
        flags.is_hidden = false;
    }
    flags
}

/// `Field_<n>` with `n` one above the highest numeric suffix in use.
pub fn next_field_name(existing: &[FieldDefinition]) -> String {
    let max = existing
        .iter()
        .filter_map(FieldDefinition::name_number)
        .max()
        .unwrap_or(0);
    format!("Field_{}", max + 1)
}

/// The next multiple of `step` above the highest `sortOrder` in use.
///
/// This is not `(max + 1) * step`: existing orders are already multiples of
/// the step, so the new field lands one slot after the last instead of
/// multiplying the gap.
pub fn next_sort_order(existing: &[FieldDefinition], step: i64) -> i64 {
    let max = existing.iter().map(|d| d.sort_order).max().unwrap_or(0).max(0);
    (max / step + 1) * step
}

/// Schema mutation service over a [`FieldStore`].
pub struct SchemaService<S> {
    store: S,
    config: FieldsConfig,
}

impl<S: FieldStore> SchemaService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, FieldsConfig::default())
    }

    pub fn with_config(store: S, config: FieldsConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FieldsConfig {
        &self.config
    }

    /// Definitions of an entity type in display order.
    pub async fn list_fields(&self, entity_type: EntityType) -> Result<Vec<FieldDefinition>> {
        self.store.list_field_definitions(entity_type).await
    }

    pub async fn get_field(&self, id: &FieldId) -> Result<FieldDefinition> {
        self.store.get_field_definition(id).await
    }

    /// Create a field from `draft`.
    ///
    /// Without an explicit name the field is named `Field_<n>`. If the store
    /// reports that name as taken (another writer got there first), the name
    /// is recomputed and the insert retried.
    pub async fn create_field(
        &self,
        entity_type: EntityType,
        draft: FieldDraft,
        actor: &str,
    ) -> Result<FieldDefinition> {
        let field_type = draft
            .field_type
            .ok_or_else(|| FieldsError::InvalidFieldType {
                value: "(none)".to_string(),
            })?;
        let explicit_name = draft
            .field_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let actor = self.actor(actor);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let existing = self.store.list_field_definitions(entity_type).await?;
            let now = Utc::now();
            let flags = coerce_flags(
                FieldFlags::default(),
                FlagChanges {
                    is_required: Some(draft.is_required && !draft.is_read_only),
                    is_hidden: Some(draft.is_hidden),
                    is_read_only: Some(draft.is_read_only),
                },
            );
            let mut def = FieldDefinition {
                id: FieldId::new(),
                entity_type,
                field_name: explicit_name
                    .clone()
                    .unwrap_or_else(|| next_field_name(&existing)),
                field_label: draft.field_label.clone(),
                field_type,
                is_required: flags.is_required,
                is_hidden: flags.is_hidden,
                is_read_only: flags.is_read_only,
                sort_order: draft
                    .sort_order
                    .unwrap_or_else(|| next_sort_order(&existing, self.config.sort_order_step)),
                options: draft.options.clone(),
                placeholder: draft.placeholder.clone(),
                default_value: draft.default_value.clone(),
                lookup_type: draft.lookup_type,
                sub_field_ids: draft.sub_field_ids.clone(),
                dependent_on_field_id: draft.dependent_on_field_id,
                role: draft.role,
                created_at: now,
                updated_at: now,
                created_by: actor.to_string(),
                updated_by: actor.to_string(),
            };
            normalize_type_specific(&mut def);
            check_definition(&def, &existing)?;

            match self.store.insert_field(&def).await {
                Ok(()) => {
                    self.store
                        .append_audit(&AuditRecord::created(&def, actor))
                        .await?;
                    debug!(entity_type = %entity_type, name = %def.field_name, id = %def.id, "field created");
                    return Ok(def);
                }
                Err(FieldsError::Conflict { .. }) if explicit_name.is_some() => {
                    return Err(FieldsError::DuplicateFieldName {
                        entity_type: entity_type.to_string(),
                        name: def.field_name,
                    });
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_create_retries => {
                    debug!(attempt, name = %def.field_name, "generated field name taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Apply partial `changes` to a field.
    ///
    /// A request that changes nothing returns the stored definition without
    /// writing or auditing.
    pub async fn update_field(
        &self,
        id: &FieldId,
        changes: FieldChanges,
        actor: &str,
    ) -> Result<FieldDefinition> {
        let actor = self.actor(actor);
        let before = self.store.get_field_definition(id).await?;
        let existing = self.store.list_field_definitions(before.entity_type).await?;

        let mut after = before.clone();
        apply_changes(&mut after, &changes);
        coerce_flags(FieldFlags::of(&before), FlagChanges::from(&changes)).apply_to(&mut after);
        normalize_type_specific(&mut after);
        check_definition(&after, &existing)?;

        after.updated_at = Utc::now();
        after.updated_by = actor.to_string();
        let record = AuditRecord::updated(&before, &after, actor);
        if !record.has_changes() {
            debug!(name = %before.field_name, "update changed nothing");
            return Ok(before);
        }

        match self.store.update_field(&after).await {
            Ok(()) => {}
            Err(FieldsError::Conflict { entity_type, name }) => {
                return Err(FieldsError::DuplicateFieldName { entity_type, name });
            }
            Err(e) => return Err(e),
        }
        self.store.append_audit(&record).await?;
        debug!(name = %after.field_name, id = %after.id, "field updated");
        Ok(after)
    }

    /// Delete a field and remove every reference other fields hold to it.
    ///
    /// Returns the deleted definition.
    pub async fn delete_field(&self, id: &FieldId, actor: &str) -> Result<FieldDefinition> {
        let actor = self.actor(actor);
        let def = self.store.get_field_definition(id).await?;
        let existing = self.store.list_field_definitions(def.entity_type).await?;

        let now = Utc::now();
        let mut cleaned: Vec<(&FieldDefinition, FieldDefinition)> = Vec::new();
        for other in existing.iter().filter(|d| d.id != *id) {
            let mut after = other.clone();
            if after.dependent_on_field_id == Some(*id) {
                after.dependent_on_field_id = None;
            }
            after.sub_field_ids.retain(|sub| sub != id);
            if after != *other {
                after.updated_at = now;
                after.updated_by = actor.to_string();
                cleaned.push((other, after));
            }
        }

        let updates: Vec<FieldDefinition> = cleaned.iter().map(|(_, after)| after.clone()).collect();
        self.store.update_many(&updates).await?;
        self.store.delete_field(id).await?;

        self.store
            .append_audit(&AuditRecord::deleted(&def, actor))
            .await?;
        for (before, after) in &cleaned {
            self.store
                .append_audit(&AuditRecord::updated(before, after, actor))
                .await?;
        }
        debug!(name = %def.field_name, id = %def.id, cleaned = cleaned.len(), "field deleted");
        Ok(def)
    }

    /// Rewrite `sortOrder` so fields follow `ordered_ids`.
    ///
    /// Unknown and repeated ids are ignored; fields not mentioned keep their
    /// relative order after the mentioned ones. Only fields whose position
    /// value changes are written. Returns the definitions in their new order.
    pub async fn reorder_fields(
        &self,
        entity_type: EntityType,
        ordered_ids: &[FieldId],
        actor: &str,
    ) -> Result<Vec<FieldDefinition>> {
        let actor = self.actor(actor);
        let existing = self.store.list_field_definitions(entity_type).await?;

        let mut seen = HashSet::new();
        let mut order: Vec<&FieldDefinition> = ordered_ids
            .iter()
            .filter_map(|id| existing.iter().find(|d| d.id == *id))
            .filter(|d| seen.insert(d.id))
            .collect();
        order.extend(existing.iter().filter(|d| !seen.contains(&d.id)));

        let now = Utc::now();
        let step = self.config.sort_order_step;
        let mut result = Vec::with_capacity(order.len());
        let mut changed: Vec<(&FieldDefinition, FieldDefinition)> = Vec::new();
        for (index, def) in order.into_iter().enumerate() {
            let sort_order = (index as i64 + 1) * step;
            if def.sort_order == sort_order {
                result.push(def.clone());
                continue;
            }
            let mut after = def.clone();
            after.sort_order = sort_order;
            after.updated_at = now;
            after.updated_by = actor.to_string();
            result.push(after.clone());
            changed.push((def, after));
        }

        if changed.is_empty() {
            return Ok(result);
        }
        let updates: Vec<FieldDefinition> = changed.iter().map(|(_, after)| after.clone()).collect();
        self.store.update_many(&updates).await?;
        for (before, after) in &changed {
            self.store
                .append_audit(&AuditRecord::updated(before, after, actor))
                .await?;
        }
        debug!(entity_type = %entity_type, moved = changed.len(), "fields reordered");
        Ok(result)
    }

    fn actor<'a>(&'a self, actor: &'a str) -> &'a str {
        if actor.trim().is_empty() {
            &self.config.actor
        } else {
            actor
        }
    }
}

fn apply_changes(def: &mut FieldDefinition, changes: &FieldChanges) {
    if let Some(name) = changes.field_name.as_deref().map(str::trim) {
        if !name.is_empty() {
            def.field_name = name.to_string();
        }
    }
    if let Some(label) = &changes.field_label {
        def.field_label = label.clone();
    }
    if let Some(field_type) = changes.field_type {
        def.field_type = field_type;
    }
    if let Some(order) = changes.sort_order {
        def.sort_order = order;
    }
    if let Some(options) = &changes.options {
        def.options = options.clone();
    }
    if let Some(placeholder) = &changes.placeholder {
        def.placeholder = placeholder.clone();
    }
    if let Some(value) = &changes.default_value {
        def.default_value = value.clone();
    }
    if let Some(lookup) = changes.lookup_type {
        def.lookup_type = lookup;
    }
    if let Some(ids) = &changes.sub_field_ids {
        def.sub_field_ids = ids.clone();
    }
    if let Some(target) = changes.dependent_on_field_id {
        def.dependent_on_field_id = target;
    }
    if let Some(role) = changes.role {
        def.role = role;
    }
}

/// Drop attributes the field type does not carry.
fn normalize_type_specific(def: &mut FieldDefinition) {
    if !def.field_type.has_options() {
        def.options.clear();
    }
    if !def.field_type.is_lookup() {
        def.lookup_type = None;
    }
    if def.is_composite() {
        let mut seen = HashSet::new();
        def.sub_field_ids.retain(|id| seen.insert(*id));
    } else {
        def.sub_field_ids.clear();
    }
}

/// Check invariants 3 to 5 and the read-only rule for `def` as it would be
/// stored, against the other definitions of its entity type.
fn check_definition(def: &FieldDefinition, existing: &[FieldDefinition]) -> Result<()> {
    let others = || existing.iter().filter(|d| d.id != def.id);

    if others().any(|d| d.field_name == def.field_name) {
        return Err(FieldsError::DuplicateFieldName {
            entity_type: def.entity_type.to_string(),
            name: def.field_name.clone(),
        });
    }

    if let Some(target_id) = def.dependent_on_field_id {
        if def.is_composite() {
            return Err(FieldsError::invalid_reference(
                target_id,
                "composite fields cannot depend on another field",
            ));
        }
        if target_id == def.id {
            return Err(FieldsError::CyclicDependency {
                path: format!("{0} -> {0}", def.field_name),
            });
        }
        let target = others()
            .find(|d| d.id == target_id)
            .ok_or_else(|| not_in_entity(target_id, def.entity_type))?;
        if target.is_hidden {
            return Err(FieldsError::invalid_reference(
                target_id,
                "dependency target is hidden",
            ));
        }
        if target.is_composite() {
            return Err(FieldsError::invalid_reference(
                target_id,
                "cannot depend on a composite field",
            ));
        }
    }

    for sub_id in &def.sub_field_ids {
        if *sub_id == def.id {
            return Err(FieldsError::invalid_reference(
                sub_id,
                "a composite cannot contain itself",
            ));
        }
        let sub = others()
            .find(|d| d.id == *sub_id)
            .ok_or_else(|| not_in_entity(*sub_id, def.entity_type))?;
        if sub.is_composite() {
            return Err(FieldsError::invalid_reference(
                sub_id,
                "composites cannot contain other composites",
            ));
        }
    }

    let depended_on = others().any(|d| d.dependent_on_field_id == Some(def.id));
    if def.is_hidden && depended_on {
        return Err(FieldsError::invalid_reference(
            def.id,
            "other fields depend on this field, it cannot be hidden",
        ));
    }
    if def.is_composite() {
        if depended_on {
            return Err(FieldsError::invalid_reference(
                def.id,
                "other fields depend on this field, it cannot become a composite",
            ));
        }
        if composite_owner(existing, def.id).is_some() {
            return Err(FieldsError::invalid_reference(
                def.id,
                "field belongs to a composite, it cannot become one",
            ));
        }
    }

    if let Some(target_id) = def.dependent_on_field_id {
        let mut defs: Vec<FieldDefinition> = others().cloned().collect();
        defs.push(def.clone());
        detect_cycle(&defs, def.id, target_id)?;
    }

    if def.is_read_only && def.is_required {
        return Err(FieldsError::ReadOnlyConflict {
            name: def.field_name.clone(),
        });
    }
    Ok(())
}

fn not_in_entity(id: FieldId, entity_type: EntityType) -> FieldsError {
    FieldsError::invalid_reference(id, format!("no such field for entity type {entity_type}"))
}
