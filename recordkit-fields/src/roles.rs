//! Role tags and the values they pre-fill on new records.

use tracing::debug;

use crate::registry::FieldTypeRegistry;
use crate::types::{FieldDefinition, FieldRole};
use crate::values::FieldValues;

/// Who is filling in the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleContext {
    pub current_user: String,
}

impl RoleContext {
    pub fn new(current_user: impl Into<String>) -> Self {
        Self {
            current_user: current_user.into(),
        }
    }
}

/// The first field carrying `role`, in display order.
pub fn field_with_role(defs: &[FieldDefinition], role: FieldRole) -> Option<&FieldDefinition> {
    defs.iter()
        .filter(|d| d.role == Some(role))
        .min_by_key(|d| d.sort_order)
}

/// Fill empty values for a new record.
///
/// The owner field gets the current user; every other empty field with a
/// `default_value` gets that default. Composites hold no value and are
/// skipped. Returns the names of the fields that were filled.
pub fn populate_role_defaults(
    defs: &[FieldDefinition],
    values: &mut FieldValues,
    ctx: &RoleContext,
) -> Vec<String> {
    let owner = field_with_role(defs, FieldRole::Owner).map(|d| d.id);
    let mut filled = Vec::new();
    for def in defs.iter().filter(|d| !d.is_composite()) {
        if FieldTypeRegistry::is_present(def.field_type, values.value_of(def)) {
            continue;
        }
        let value = if Some(def.id) == owner && !ctx.current_user.trim().is_empty() {
            Some(ctx.current_user.clone())
        } else {
            def.default_value.clone().filter(|v| !v.trim().is_empty())
        };
        if let Some(value) = value {
            debug!(field = %def.field_name, "pre-filled value");
            values.insert(def.field_name.clone(), value);
            filled.push(def.field_name.clone());
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{composite, field};
    use crate::types::FieldType;
    use crate::values::FieldValue;

    #[test]
    fn owner_gets_current_user_and_others_get_defaults() {
        let mut owner = field("Field_1", "Owner", FieldType::Text);
        owner.role = Some(FieldRole::Owner);
        let mut status = field("Field_2", "Status", FieldType::Select);
        status.role = Some(FieldRole::Status);
        status.default_value = Some("Open".into());
        let notes = field("Field_3", "Notes", FieldType::Textarea);
        let defs = vec![owner, status, notes];

        let mut values = FieldValues::new();
        let filled = populate_role_defaults(&defs, &mut values, &RoleContext::new("Dana Reyes"));

        assert_eq!(filled, vec!["Field_1", "Field_2"]);
        assert_eq!(values.get("Field_1"), Some(&FieldValue::from("Dana Reyes")));
        assert_eq!(values.get("Field_2"), Some(&FieldValue::from("Open")));
        assert!(values.get("Field_3").is_none());
    }

    #[test]
    fn existing_values_are_kept() {
        let mut owner = field("Field_1", "Owner", FieldType::Text);
        owner.role = Some(FieldRole::Owner);
        let mut values = FieldValues::new().with("Field_1", "Someone Else");
        let filled = populate_role_defaults(
            std::slice::from_ref(&owner),
            &mut values,
            &RoleContext::new("Dana Reyes"),
        );
        assert!(filled.is_empty());
        assert_eq!(values.get("Field_1"), Some(&FieldValue::from("Someone Else")));
    }

    #[test]
    fn role_lookup_prefers_display_order() {
        let mut late = field("Field_1", "Primary Email", FieldType::Email);
        late.role = Some(FieldRole::Email);
        late.sort_order = 20;
        let mut early = field("Field_2", "Work Email", FieldType::Email);
        early.role = Some(FieldRole::Email);
        early.sort_order = 10;
        let street = field("Field_3", "Street", FieldType::Text);
        let mut address = composite("Field_4", "Address", &[&street]);
        address.role = Some(FieldRole::Address);
        let defs = vec![late, early, street, address];

        assert_eq!(
            field_with_role(&defs, FieldRole::Email).map(|d| d.field_name.as_str()),
            Some("Field_2")
        );
        assert_eq!(
            field_with_role(&defs, FieldRole::Address).map(|d| d.field_name.as_str()),
            Some("Field_4")
        );
        assert!(field_with_role(&defs, FieldRole::Phone).is_none());
    }
}
