//! Custom field schema and validation engine
//!
//! `recordkit-fields` owns the definitions of the user-defined fields attached
//! to business records (organizations, job seekers, hiring managers, jobs,
//! leads, tasks, placements) and the rules that apply to their values.
//!
//! # Architecture
//!
//! - **Pure core**: type registry, validation, layout resolution and filter
//!   matching are synchronous functions over definitions and values
//! - **Store boundary**: schema mutations go through the async [`FieldStore`]
//!   trait; [`InMemoryFieldStore`] and the YAML-on-disk [`YamlFieldStore`] ship
//!   with the crate
//! - **One value map**: forms work with fieldName-keyed [`FieldValues`]; the
//!   label-keyed persisted form is converted at the storage edge only
//! - **Audited**: every schema change appends an [`AuditRecord`]

pub mod area_codes;
pub mod audit;
pub mod config;
pub mod error;
pub mod filter;
pub mod registry;
pub mod resolver;
pub mod roles;
pub mod schema;
pub mod store;
pub mod types;
pub mod validation;
pub mod values;
pub mod yaml_store;

#[cfg(test)]
mod test_support;

pub use audit::{AuditAction, AuditRecord};
pub use config::FieldsConfig;
pub use error::{FieldsError, Result};
pub use filter::{
    compare_values, matches_criterion, matches_field, natural_cmp, Criterion, Operator, TriState,
};
pub use registry::{FieldTypeRegistry, SemanticKind};
pub use resolver::{
    composite_owner, dependency_targets, detect_cycle, is_editable, resolve_layout, LayoutEntry,
};
pub use roles::{field_with_role, populate_role_defaults, RoleContext};
pub use schema::{coerce_flags, FieldFlags, FlagChanges, SchemaService};
pub use store::{FieldStore, InMemoryFieldStore};
pub use types::{
    EntityType, FieldChanges, FieldDefinition, FieldDraft, FieldId, FieldRole, FieldType,
    LookupType,
};
pub use validation::{FieldIssue, FieldValidation, ValidationEngine};
pub use values::{
    from_label_keyed, load_runtime_values, to_label_keyed, EntityValueSource, FieldValue,
    FieldValues, LabelKeyedValues,
};
pub use yaml_store::{FieldDefaults, YamlFieldStore, YamlFieldStoreBuilder};
