//! Builders shared by unit and integration tests.

use chrono::{TimeZone, Utc};

use crate::types::{EntityType, FieldDefinition, FieldId, FieldType};

/// A visible, optional field of the `job` entity type.
pub fn field(name: &str, label: &str, field_type: FieldType) -> FieldDefinition {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    FieldDefinition {
        id: FieldId::new(),
        entity_type: EntityType::Job,
        field_name: name.to_string(),
        field_label: label.to_string(),
        field_type,
        is_required: false,
        is_hidden: false,
        is_read_only: false,
        sort_order: 0,
        options: Vec::new(),
        placeholder: None,
        default_value: None,
        lookup_type: None,
        sub_field_ids: Vec::new(),
        dependent_on_field_id: None,
        role: None,
        created_at: at,
        updated_at: at,
        created_by: "test".to_string(),
        updated_by: "test".to_string(),
    }
}

/// Same as [`field`] but required.
pub fn required(name: &str, label: &str, field_type: FieldType) -> FieldDefinition {
    FieldDefinition {
        is_required: true,
        ..field(name, label, field_type)
    }
}

/// A composite grouping the given sub-fields.
pub fn composite(name: &str, label: &str, subs: &[&FieldDefinition]) -> FieldDefinition {
    FieldDefinition {
        sub_field_ids: subs.iter().map(|d| d.id).collect(),
        ..field(name, label, FieldType::Composite)
    }
}
