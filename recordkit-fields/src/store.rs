//! Storage boundary for field definitions and their audit trail.
//!
//! The engine never talks to a database directly. It reads and writes through
//! [`FieldStore`]; the store is responsible for enforcing `fieldName`
//! uniqueness per entity type and reporting violations as
//! [`FieldsError::Conflict`].

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::audit::AuditRecord;
use crate::error::{FieldsError, Result};
use crate::types::{EntityType, FieldDefinition, FieldId};

/// Persistence operations the schema engine depends on.
#[async_trait]
pub trait FieldStore: Send + Sync {
    /// Definitions of one entity type ordered by `sortOrder`, then `fieldName`.
    async fn list_field_definitions(&self, entity_type: EntityType) -> Result<Vec<FieldDefinition>>;

    /// Definition by id, or [`FieldsError::NotFound`].
    async fn get_field_definition(&self, id: &FieldId) -> Result<FieldDefinition>;

    /// Insert a new definition. Fails with `Conflict` when the name is taken.
    async fn insert_field(&self, def: &FieldDefinition) -> Result<()>;

    /// Replace an existing definition. Fails with `Conflict` when a rename
    /// collides and `NotFound` when the id is unknown.
    async fn update_field(&self, def: &FieldDefinition) -> Result<()>;

    /// Replace several definitions.
    async fn update_many(&self, defs: &[FieldDefinition]) -> Result<()> {
        for def in defs {
            self.update_field(def).await?;
        }
        Ok(())
    }

    /// Remove a definition.
    async fn delete_field(&self, id: &FieldId) -> Result<()>;

    /// Append one audit record.
    async fn append_audit(&self, record: &AuditRecord) -> Result<()>;

    /// Audit records, newest first.
    async fn list_audit(&self, limit: Option<usize>) -> Result<Vec<AuditRecord>>;
}

/// Sort definitions the way every listing returns them.
pub fn sort_definitions(defs: &mut [FieldDefinition]) {
    defs.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| crate::filter::natural_cmp(&a.field_name, &b.field_name))
    });
}

/// Whether another definition of the same entity type already uses `def`'s name.
pub(crate) fn name_taken<'a>(
    mut existing: impl Iterator<Item = &'a FieldDefinition>,
    def: &FieldDefinition,
) -> bool {
    existing.any(|d| {
        d.id != def.id && d.entity_type == def.entity_type && d.field_name == def.field_name
    })
}

#[derive(Default)]
struct MemoryState {
    fields: HashMap<FieldId, FieldDefinition>,
    audit: Vec<AuditRecord>,
}

/// Store kept entirely in memory. Used by tests and by embedders that load
/// definitions from elsewhere.
#[derive(Default)]
pub struct InMemoryFieldStore {
    state: RwLock<MemoryState>,
}

impl InMemoryFieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing definitions.
    pub fn with_fields(fields: impl IntoIterator<Item = FieldDefinition>) -> Self {
        let fields = fields.into_iter().map(|d| (d.id, d)).collect();
        Self {
            state: RwLock::new(MemoryState {
                fields,
                audit: Vec::new(),
            }),
        }
    }
}

#[async_trait]
impl FieldStore for InMemoryFieldStore {
    async fn list_field_definitions(&self, entity_type: EntityType) -> Result<Vec<FieldDefinition>> {
        let state = self.state.read().await;
        let mut defs: Vec<FieldDefinition> = state
            .fields
            .values()
            .filter(|d| d.entity_type == entity_type)
            .cloned()
            .collect();
        sort_definitions(&mut defs);
        Ok(defs)
    }

    async fn get_field_definition(&self, id: &FieldId) -> Result<FieldDefinition> {
        let state = self.state.read().await;
        state
            .fields
            .get(id)
            .cloned()
            .ok_or_else(|| FieldsError::not_found(id))
    }

    async fn insert_field(&self, def: &FieldDefinition) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fields.contains_key(&def.id) || name_taken(state.fields.values(), def) {
            return Err(FieldsError::Conflict {
                entity_type: def.entity_type.to_string(),
                name: def.field_name.clone(),
            });
        }
        state.fields.insert(def.id, def.clone());
        Ok(())
    }

    async fn update_field(&self, def: &FieldDefinition) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.fields.contains_key(&def.id) {
            return Err(FieldsError::not_found(def.id));
        }
        if name_taken(state.fields.values(), def) {
            return Err(FieldsError::Conflict {
                entity_type: def.entity_type.to_string(),
                name: def.field_name.clone(),
            });
        }
        state.fields.insert(def.id, def.clone());
        Ok(())
    }

    async fn delete_field(&self, id: &FieldId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .fields
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| FieldsError::not_found(id))
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<()> {
        self.state.write().await.audit.push(record.clone());
        Ok(())
    }

    async fn list_audit(&self, limit: Option<usize>) -> Result<Vec<AuditRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<AuditRecord> = state.audit.iter().rev().cloned().collect();
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}
