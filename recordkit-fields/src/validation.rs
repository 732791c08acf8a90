//! Single-field and whole-form validation.
//!
//! Nothing here touches storage or fails with an error: malformed input is
//! expected, so every outcome is a [`FieldValidation`] with a display reason.

use serde::{Deserialize, Serialize};

use crate::registry::FieldTypeRegistry;
use crate::resolver::{layout, LayoutEntry};
use crate::types::FieldDefinition;
use crate::values::{FieldValue, FieldValues};

/// Outcome of a validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FieldValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// One problem found by [`ValidationEngine::validate_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIssue {
    pub field_name: String,
    pub field_label: String,
    pub reason: String,
}

/// Validation entry points consumed by forms.
pub struct ValidationEngine;

impl ValidationEngine {
    /// Validate one value against one definition.
    ///
    /// A missing value is valid unless the field is required and visible.
    pub fn validate_field(def: &FieldDefinition, value: Option<&FieldValue>) -> FieldValidation {
        if !FieldTypeRegistry::is_present(def.field_type, value) {
            if def.is_required && !def.is_hidden {
                return FieldValidation::invalid(required_reason(def));
            }
            return FieldValidation::valid();
        }
        match FieldTypeRegistry::check(def, value) {
            Ok(()) => FieldValidation::valid(),
            Err(reason) => FieldValidation::invalid(format!("{}: {reason}", def.display_label())),
        }
    }

    /// Whether the form may be submitted.
    ///
    /// A field is satisfied when hidden, when not required, or when its value
    /// is valid. A composite group is satisfied when every required sub-field
    /// is valid; hiding a required sub-field does not excuse it. The first
    /// unmet field in display order is reported.
    pub fn validate_form(defs: &[FieldDefinition], values: &FieldValues) -> FieldValidation {
        for entry in layout(defs, true) {
            if let Some(reason) = first_unmet(&entry, values) {
                return FieldValidation::invalid(reason);
            }
        }
        FieldValidation::valid()
    }

    /// Every problem in the form: unmet required fields and malformed values
    /// of visible fields, in display order.
    pub fn validate_all(defs: &[FieldDefinition], values: &FieldValues) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        for entry in layout(defs, true) {
            let fields: Vec<&FieldDefinition> = match &entry {
                LayoutEntry::Standalone { field } => vec![*field],
                LayoutEntry::CompositeGroup { sub_fields, .. } => sub_fields.clone(),
            };
            for def in fields {
                let value = values.value_of(def);
                let required = match &entry {
                    LayoutEntry::Standalone { .. } => def.is_required && !def.is_hidden,
                    LayoutEntry::CompositeGroup { composite, .. } => {
                        required_in_group(composite, def)
                    }
                };
                let present = FieldTypeRegistry::is_present(def.field_type, value);
                let reason = if !present {
                    required.then(|| required_reason(def))
                } else if def.is_hidden && !required {
                    None
                } else {
                    FieldTypeRegistry::check(def, value)
                        .err()
                        .map(|r| format!("{}: {r}", def.display_label()))
                };
                if let Some(reason) = reason {
                    issues.push(FieldIssue {
                        field_name: def.field_name.clone(),
                        field_label: def.field_label.clone(),
                        reason,
                    });
                }
            }
        }
        issues
    }
}

fn first_unmet(entry: &LayoutEntry<'_>, values: &FieldValues) -> Option<String> {
    match entry {
        LayoutEntry::Standalone { field } => {
            let satisfied = field.is_hidden
                || !field.is_required
                || FieldTypeRegistry::is_valid(field, values.value_of(field));
            (!satisfied).then(|| unmet_reason(field, values))
        }
        LayoutEntry::CompositeGroup {
            composite,
            sub_fields,
        } => {
            if composite.is_hidden {
                return None;
            }
            sub_fields
                .iter()
                .filter(|sub| required_in_group(composite, sub))
                .find(|sub| !FieldTypeRegistry::is_valid(sub, values.value_of(sub)))
                .map(|sub| format!("{}: {}", composite.display_label(), unmet_reason(sub, values)))
        }
    }
}

/// A sub-field counts toward its group when it is required itself, or when
/// the composite is required and the sub-field is visible.
fn required_in_group(composite: &FieldDefinition, sub: &FieldDefinition) -> bool {
    sub.is_required || (composite.is_required && !sub.is_hidden)
}

fn unmet_reason(def: &FieldDefinition, values: &FieldValues) -> String {
    let value = values.value_of(def);
    if FieldTypeRegistry::is_present(def.field_type, value) {
        match FieldTypeRegistry::check(def, value) {
            Err(reason) => format!("{}: {reason}", def.display_label()),
            Ok(()) => required_reason(def),
        }
    } else {
        required_reason(def)
    }
}

fn required_reason(def: &FieldDefinition) -> String {
    format!("{} is required", def.display_label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{composite, field, required};
    use crate::types::FieldType;

    #[test]
    fn missing_optional_value_is_valid() {
        let def = field("Field_1", "Email", FieldType::Email);
        assert!(ValidationEngine::validate_field(&def, None).is_valid);
    }

    #[test]
    fn missing_required_value_names_the_field() {
        let def = required("Field_1", "Email", FieldType::Email);
        let result = ValidationEngine::validate_field(&def, None);
        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some("Email is required"));
    }

    #[test]
    fn malformed_value_reports_reason() {
        let def = field("Field_1", "Email", FieldType::Email);
        let result = ValidationEngine::validate_field(&def, Some(&"nope".into()));
        assert_eq!(
            result,
            FieldValidation::invalid("Email: must be a valid email address")
        );
    }

    #[test]
    fn form_reports_first_unmet_in_display_order() {
        let mut first = required("Field_2", "Title", FieldType::Text);
        first.sort_order = 10;
        let mut second = required("Field_1", "Phone", FieldType::Phone);
        second.sort_order = 20;
        let defs = vec![second, first];

        let result = ValidationEngine::validate_form(&defs, &FieldValues::new());
        assert_eq!(result.reason.as_deref(), Some("Title is required"));

        let values = FieldValues::new()
            .with("Field_2", "Engineer")
            .with("Field_1", "(555) 555-0100");
        let result = ValidationEngine::validate_form(&defs, &values);
        assert!(!result.is_valid);
        assert!(result.reason.unwrap().starts_with("Phone: area code 555"));

        let values = values.with("Field_1", "(212) 555-0100");
        assert!(ValidationEngine::validate_form(&defs, &values).is_valid);
    }

    #[test]
    fn hidden_and_optional_fields_do_not_block_submission() {
        let mut hidden = required("Field_1", "Secret", FieldType::Text);
        hidden.is_hidden = true;
        let optional = field("Field_2", "Email", FieldType::Email);
        let defs = vec![hidden, optional];
        let values = FieldValues::new().with("Field_2", "not-an-email");
        assert!(ValidationEngine::validate_form(&defs, &values).is_valid);
    }

    #[test]
    fn composite_needs_every_required_sub_field() {
        let street = required("Field_1", "Street", FieldType::Text);
        let zip = required("Field_2", "Zip", FieldType::Text);
        let unit = field("Field_3", "Unit", FieldType::Text);
        let address = composite("Field_4", "Address", &[&street, &zip, &unit]);
        let defs = vec![street, zip, unit, address];

        let values = FieldValues::new().with("Field_1", "1 Main St");
        let result = ValidationEngine::validate_form(&defs, &values);
        assert_eq!(result.reason.as_deref(), Some("Address: Zip is required"));

        let values = values.with("Field_2", "1234");
        let result = ValidationEngine::validate_form(&defs, &values);
        assert_eq!(
            result.reason.as_deref(),
            Some("Address: Zip: must be exactly 5 digits")
        );

        let values = values.with("Field_2", "12345");
        assert!(ValidationEngine::validate_form(&defs, &values).is_valid);
    }

    #[test]
    fn hidden_sub_field_only_excused_when_not_required() {
        let street = required("Field_1", "Street", FieldType::Text);
        let mut city = field("Field_2", "City", FieldType::Text);
        city.is_hidden = true;
        let address = composite("Field_3", "Address", &[&street, &city]);
        let values = FieldValues::new().with("Field_1", "1 Main St");

        let defs = vec![street.clone(), city.clone(), address.clone()];
        assert!(ValidationEngine::validate_form(&defs, &values).is_valid);

        // A definition built outside the mutation service can carry both flags.
        city.is_required = true;
        let defs = vec![street, city, address];
        let result = ValidationEngine::validate_form(&defs, &values);
        assert_eq!(result.reason.as_deref(), Some("Address: City is required"));
    }

    #[test]
    fn required_composite_requires_visible_sub_fields() {
        let street = field("Field_1", "Street", FieldType::Text);
        let mut address = composite("Field_2", "Address", &[&street]);
        address.is_required = true;
        let defs = vec![street, address];
        let result = ValidationEngine::validate_form(&defs, &FieldValues::new());
        assert_eq!(result.reason.as_deref(), Some("Address: Street is required"));
    }

    #[test]
    fn validate_all_collects_every_issue() {
        let title = required("Field_1", "Title", FieldType::Text);
        let email = field("Field_2", "Email", FieldType::Email);
        let site = field("Field_3", "Website", FieldType::Url);
        let defs = vec![title, email, site];
        let values = FieldValues::new()
            .with("Field_2", "bad")
            .with("Field_3", "https://ok.example");

        let issues = ValidationEngine::validate_all(&defs, &values);
        let names: Vec<_> = issues.iter().map(|i| i.field_name.as_str()).collect();
        assert_eq!(names, vec!["Field_1", "Field_2"]);
    }

    #[test]
    fn validation_result_serializes_for_display() {
        let json = serde_json::to_value(FieldValidation::invalid("Title is required")).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["reason"], "Title is required");
        let json = serde_json::to_value(FieldValidation::valid()).unwrap();
        assert!(json.get("reason").is_none());
    }
}
