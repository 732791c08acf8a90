//! Core field definition types.
//!
//! A [`FieldDefinition`] describes one administrator-defined custom field of an
//! [`EntityType`]. All types serialize with camelCase keys so the same shapes
//! travel through YAML on disk, the audit log and the consuming UI.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ulid::Ulid;

use crate::error::FieldsError;

/// The kinds of business record that own custom fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Organization,
    JobSeeker,
    HiringManager,
    Job,
    Lead,
    Task,
    Placement,
}

impl EntityType {
    pub const ALL: [EntityType; 7] = [
        EntityType::Organization,
        EntityType::JobSeeker,
        EntityType::HiringManager,
        EntityType::Job,
        EntityType::Lead,
        EntityType::Task,
        EntityType::Placement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Organization => "organization",
            EntityType::JobSeeker => "jobSeeker",
            EntityType::HiringManager => "hiringManager",
            EntityType::Job => "job",
            EntityType::Lead => "lead",
            EntityType::Task => "task",
            EntityType::Placement => "placement",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = FieldsError;

    /// Accepts the camelCase name, case-insensitively, with `-`/`_` ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = fold_key(s);
        EntityType::ALL
            .into_iter()
            .find(|e| fold_key(e.as_str()) == key)
            .ok_or_else(|| FieldsError::InvalidEntityType {
                value: s.to_string(),
            })
    }
}

/// The closed set of field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    Email,
    Phone,
    Number,
    Percentage,
    Date,
    Currency,
    Datetime,
    Textarea,
    Select,
    Multiselect,
    Multicheckbox,
    Checkbox,
    Radio,
    Url,
    Link,
    File,
    Lookup,
    MultiselectLookup,
    Composite,
}

impl FieldType {
    pub const ALL: [FieldType; 20] = [
        FieldType::Text,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Number,
        FieldType::Percentage,
        FieldType::Date,
        FieldType::Currency,
        FieldType::Datetime,
        FieldType::Textarea,
        FieldType::Select,
        FieldType::Multiselect,
        FieldType::Multicheckbox,
        FieldType::Checkbox,
        FieldType::Radio,
        FieldType::Url,
        FieldType::Link,
        FieldType::File,
        FieldType::Lookup,
        FieldType::MultiselectLookup,
        FieldType::Composite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Number => "number",
            FieldType::Percentage => "percentage",
            FieldType::Date => "date",
            FieldType::Currency => "currency",
            FieldType::Datetime => "datetime",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Multiselect => "multiselect",
            FieldType::Multicheckbox => "multicheckbox",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Url => "url",
            FieldType::Link => "link",
            FieldType::File => "file",
            FieldType::Lookup => "lookup",
            FieldType::MultiselectLookup => "multiselectLookup",
            FieldType::Composite => "composite",
        }
    }

    /// Types that carry an `options` list.
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::Radio | FieldType::Multiselect | FieldType::Multicheckbox
        )
    }

    /// Types that carry a `lookupType`.
    pub fn is_lookup(&self) -> bool {
        matches!(self, FieldType::Lookup | FieldType::MultiselectLookup)
    }

    /// Types whose value is a list of strings.
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            FieldType::Multiselect | FieldType::Multicheckbox | FieldType::MultiselectLookup
        )
    }

    pub fn is_date(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::Datetime)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Number | FieldType::Currency | FieldType::Percentage
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = FieldsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = fold_key(s);
        FieldType::ALL
            .into_iter()
            .find(|t| fold_key(t.as_str()) == key)
            .ok_or_else(|| FieldsError::InvalidFieldType {
                value: s.to_string(),
            })
    }
}

/// The entity collection a lookup field points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LookupType {
    Organizations,
    HiringManagers,
    JobSeekers,
    Jobs,
    Owner,
}

impl FromStr for LookupType {
    type Err = FieldsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_key(s).as_str() {
            "organizations" => Ok(LookupType::Organizations),
            "hiringmanagers" => Ok(LookupType::HiringManagers),
            "jobseekers" => Ok(LookupType::JobSeekers),
            "jobs" => Ok(LookupType::Jobs),
            "owner" => Ok(LookupType::Owner),
            _ => Err(FieldsError::invalid_reference(s, "unknown lookup type")),
        }
    }
}

/// Semantic tag for fields the application treats specially, e.g. the owner
/// field that is filled with the current user on new records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldRole {
    Owner,
    Status,
    Email,
    Phone,
    Address,
    Website,
}

impl FromStr for FieldRole {
    type Err = FieldsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_key(s).as_str() {
            "owner" => Ok(FieldRole::Owner),
            "status" => Ok(FieldRole::Status),
            "email" => Ok(FieldRole::Email),
            "phone" => Ok(FieldRole::Phone),
            "address" => Ok(FieldRole::Address),
            "website" => Ok(FieldRole::Website),
            _ => Err(FieldsError::invalid_reference(s, "unknown field role")),
        }
    }
}

/// Opaque, immutable field identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(Ulid);

impl FieldId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for FieldId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FieldId {
    type Err = FieldsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim())
            .map(FieldId)
            .map_err(|_| FieldsError::not_found(s))
    }
}

/// One custom field belonging to one entity type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: FieldId,
    pub entity_type: EntityType,
    pub field_name: String,
    pub field_label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_type: Option<LookupType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_field_ids: Vec<FieldId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependent_on_field_id: Option<FieldId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<FieldRole>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

impl FieldDefinition {
    pub fn is_composite(&self) -> bool {
        self.field_type == FieldType::Composite
    }

    /// Label for messages, falling back to the machine name.
    pub fn display_label(&self) -> &str {
        if self.field_label.trim().is_empty() {
            &self.field_name
        } else {
            &self.field_label
        }
    }

    /// Numeric suffix of an auto-generated `Field_<n>` name.
    pub fn name_number(&self) -> Option<u64> {
        self.field_name
            .strip_prefix("Field_")
            .and_then(|n| n.parse().ok())
    }
}

/// A proposed definition passed to `SchemaService::create_field`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDraft {
    pub field_name: Option<String>,
    pub field_label: String,
    pub field_type: Option<FieldType>,
    pub is_required: bool,
    pub is_hidden: bool,
    pub is_read_only: bool,
    pub sort_order: Option<i64>,
    pub options: Vec<String>,
    pub placeholder: Option<String>,
    pub default_value: Option<String>,
    pub lookup_type: Option<LookupType>,
    pub sub_field_ids: Vec<FieldId>,
    pub dependent_on_field_id: Option<FieldId>,
    pub role: Option<FieldRole>,
}

impl FieldDraft {
    pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field_label: label.into(),
            field_type: Some(field_type),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }

    pub fn required(mut self, value: bool) -> Self {
        self.is_required = value;
        self
    }

    pub fn hidden(mut self, value: bool) -> Self {
        self.is_hidden = value;
        self
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.is_read_only = value;
        self
    }

    pub fn with_sort_order(mut self, order: i64) -> Self {
        self.sort_order = Some(order);
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_lookup(mut self, lookup: LookupType) -> Self {
        self.lookup_type = Some(lookup);
        self
    }

    pub fn with_sub_fields(mut self, ids: Vec<FieldId>) -> Self {
        self.sub_field_ids = ids;
        self
    }

    pub fn depends_on(mut self, id: FieldId) -> Self {
        self.dependent_on_field_id = Some(id);
        self
    }

    pub fn with_role(mut self, role: FieldRole) -> Self {
        self.role = Some(role);
        self
    }
}

/// Partial changes for `SchemaService::update_field`.
///
/// `None` leaves an attribute untouched. Clearable attributes use
/// `Option<Option<_>>`: `Some(None)` clears, `Some(Some(x))` sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldChanges {
    pub field_name: Option<String>,
    pub field_label: Option<String>,
    pub field_type: Option<FieldType>,
    pub is_required: Option<bool>,
    pub is_hidden: Option<bool>,
    pub is_read_only: Option<bool>,
    pub sort_order: Option<i64>,
    pub options: Option<Vec<String>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<Option<String>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Option<String>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub lookup_type: Option<Option<LookupType>>,
    pub sub_field_ids: Option<Vec<FieldId>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub dependent_on_field_id: Option<Option<FieldId>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub role: Option<Option<FieldRole>>,
}

impl FieldChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.field_label = Some(label.into());
        self
    }

    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn required(mut self, value: bool) -> Self {
        self.is_required = Some(value);
        self
    }

    pub fn hidden(mut self, value: bool) -> Self {
        self.is_hidden = Some(value);
        self
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.is_read_only = Some(value);
        self
    }

    pub fn with_sort_order(mut self, order: i64) -> Self {
        self.sort_order = Some(order);
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_placeholder(mut self, placeholder: Option<String>) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn with_default_value(mut self, value: Option<String>) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_lookup(mut self, lookup: Option<LookupType>) -> Self {
        self.lookup_type = Some(lookup);
        self
    }

    pub fn with_sub_fields(mut self, ids: Vec<FieldId>) -> Self {
        self.sub_field_ids = Some(ids);
        self
    }

    pub fn depends_on(mut self, id: Option<FieldId>) -> Self {
        self.dependent_on_field_id = Some(id);
        self
    }

    pub fn with_role(mut self, role: Option<FieldRole>) -> Self {
        self.role = Some(role);
        self
    }
}

/// Maps an explicit `null` to `Some(None)` so callers can clear an attribute.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn fold_key(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_' && *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_field() -> FieldDefinition {
        let now = Utc::now();
        FieldDefinition {
            id: FieldId::new(),
            entity_type: EntityType::HiringManager,
            field_name: "Field_4".into(),
            field_label: "Status".into(),
            field_type: FieldType::Select,
            is_required: true,
            is_hidden: false,
            is_read_only: false,
            sort_order: 40,
            options: vec!["Active".into(), "".into(), "Inactive".into()],
            placeholder: None,
            default_value: Some("Active".into()),
            lookup_type: None,
            sub_field_ids: Vec::new(),
            dependent_on_field_id: None,
            role: Some(FieldRole::Status),
            created_at: now,
            updated_at: now,
            created_by: "admin".into(),
            updated_by: "admin".into(),
        }
    }

    #[test]
    fn field_definition_yaml_round_trip_keeps_blank_options() {
        let field = sample_field();
        let yaml = serde_yaml_ng::to_string(&field).unwrap();
        let parsed: FieldDefinition = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(field, parsed);
        assert_eq!(parsed.options[1], "");
    }

    #[test]
    fn field_definition_uses_camel_case_keys() {
        let json = serde_json::to_value(sample_field()).unwrap();
        assert_eq!(json["fieldName"], "Field_4");
        assert_eq!(json["entityType"], "hiringManager");
        assert_eq!(json["isRequired"], true);
        assert!(json.get("subFieldIds").is_none());
        assert!(json.get("dependentOnFieldId").is_none());
    }

    #[test]
    fn field_type_parses_loosely() {
        assert_eq!(
            "multiselectLookup".parse::<FieldType>().unwrap(),
            FieldType::MultiselectLookup
        );
        assert_eq!(
            "multiselect_lookup".parse::<FieldType>().unwrap(),
            FieldType::MultiselectLookup
        );
        assert_eq!("DateTime".parse::<FieldType>().unwrap(), FieldType::Datetime);
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        let err = "signature".parse::<FieldType>().unwrap_err();
        assert!(matches!(err, FieldsError::InvalidFieldType { .. }));
    }

    #[test]
    fn unknown_field_type_fails_deserialization() {
        let result: std::result::Result<FieldType, _> = serde_json::from_str("\"signature\"");
        assert!(result.is_err());
    }

    #[test]
    fn entity_type_parses_variants() {
        assert_eq!(
            "job-seeker".parse::<EntityType>().unwrap(),
            EntityType::JobSeeker
        );
        assert_eq!("JOB".parse::<EntityType>().unwrap(), EntityType::Job);
        assert!("invoice".parse::<EntityType>().is_err());
    }

    #[test]
    fn name_number_only_for_generated_names() {
        let mut field = sample_field();
        assert_eq!(field.name_number(), Some(4));
        field.field_name = "custom".into();
        assert_eq!(field.name_number(), None);
        field.field_name = "Field_x".into();
        assert_eq!(field.name_number(), None);
    }

    #[test]
    fn display_label_falls_back_to_name() {
        let mut field = sample_field();
        field.field_label = "  ".into();
        assert_eq!(field.display_label(), "Field_4");
    }

    #[test]
    fn field_changes_distinguish_clear_from_untouched() {
        let changes: FieldChanges =
            serde_json::from_str(r#"{"dependentOnFieldId": null, "isHidden": true}"#).unwrap();
        assert_eq!(changes.is_hidden, Some(true));
        assert_eq!(changes.dependent_on_field_id, Some(None));
        assert_eq!(changes.placeholder, None);
    }
}
