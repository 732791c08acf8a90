//! `recordkit validate`: check a stored record against the current schema.

use std::path::Path;

use anyhow::Context as _;
use comfy_table::Cell;
use recordkit_fields::{
    from_label_keyed, populate_role_defaults, EntityType, FieldIssue, FieldValidation,
    LabelKeyedValues, RoleContext, ValidationEngine,
};
use serde::Serialize;
use tracing::debug;

use super::CommandContext;
use crate::cli::OutputFormat;
use crate::output::{emit, new_table};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Verdict of the form submission check.
    pub form: FieldValidation,
    /// Every per-field problem, including optional values that are malformed.
    pub issues: Vec<FieldIssue>,
    /// Fields pre-filled from role defaults.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filled: Vec<String>,
}

/// Returns whether the form would be accepted.
pub async fn run_validate(
    ctx: &CommandContext,
    entity: EntityType,
    values_path: &Path,
    user: Option<&str>,
) -> anyhow::Result<bool> {
    let raw = tokio::fs::read_to_string(values_path)
        .await
        .with_context(|| format!("reading {}", values_path.display()))?;
    let stored: LabelKeyedValues = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON object of values", values_path.display()))?;

    let defs = ctx.service().await?.list_fields(entity).await?;
    let mut values = from_label_keyed(&stored, &defs);
    let filled = match user {
        Some(user) => populate_role_defaults(&defs, &mut values, &RoleContext::new(user)),
        None => Vec::new(),
    };
    debug!(entity = %entity, values = values.len(), "validating record");

    let report = ValidationReport {
        form: ValidationEngine::validate_form(&defs, &values),
        issues: ValidationEngine::validate_all(&defs, &values),
        filled,
    };

    if ctx.format == OutputFormat::Table {
        match &report.form.reason {
            Some(reason) => println!("Invalid: {reason}"),
            None => println!("Valid"),
        }
        if report.issues.is_empty() {
            return Ok(report.form.is_valid);
        }
    }
    emit(ctx.format, &report, || {
        let mut table = new_table();
        table.set_header(vec!["Field", "Label", "Problem"]);
        for issue in &report.issues {
            table.add_row(vec![
                Cell::new(&issue.field_name),
                Cell::new(&issue.field_label),
                Cell::new(&issue.reason),
            ]);
        }
        table
    })?;

    Ok(report.form.is_valid)
}
