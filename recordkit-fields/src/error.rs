//! Error types for the field schema engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors raised by schema mutations and the store.
///
/// Validation of user-entered values never produces one of these; it reports
/// through [`crate::validation::FieldValidation`] instead.
#[derive(Debug, Error)]
pub enum FieldsError {
    /// Another field of the same entity type already uses this name
    #[error("duplicate field name '{name}' for entity type {entity_type}")]
    DuplicateFieldName { entity_type: String, name: String },

    /// Referenced id does not exist, belongs to another entity type, or is
    /// not an acceptable target
    #[error("invalid reference to field {id}: {reason}")]
    InvalidReference { id: String, reason: String },

    /// Assigning the dependency would make a field depend on itself
    #[error("cyclic dependency: {path}")]
    CyclicDependency { path: String },

    /// Field would end up both read-only and required
    #[error("field '{name}' cannot be both read-only and required")]
    ReadOnlyConflict { name: String },

    /// Field not found by id
    #[error("field not found: {id}")]
    NotFound { id: String },

    /// Unknown field type name
    #[error("invalid field type: {value}")]
    InvalidFieldType { value: String },

    /// Unknown entity type name
    #[error("invalid entity type: {value}")]
    InvalidEntityType { value: String },

    /// Store rejected a write because of a uniqueness constraint
    #[error("store conflict on {entity_type}.{name}")]
    Conflict { entity_type: String, name: String },

    /// Schema directory missing
    #[error("schema directory not found: {path}")]
    NotInitialized { path: PathBuf },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FieldsError {
    /// Create an invalid reference error
    pub fn invalid_reference(id: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// Store conflicts can be retried with freshly computed state
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FieldsError::NotFound { id: "abc".into() };
        assert_eq!(err.to_string(), "field not found: abc");
    }

    #[test]
    fn test_invalid_reference() {
        let err = FieldsError::invalid_reference("01H", "belongs to entity type job");
        assert!(err.to_string().contains("01H"));
        assert!(err.to_string().contains("belongs to entity type job"));
    }

    #[test]
    fn test_retryable() {
        let conflict = FieldsError::Conflict {
            entity_type: "job".into(),
            name: "Field_3".into(),
        };
        assert!(conflict.is_retryable());
        assert!(!FieldsError::not_found("x").is_retryable());
    }
}
