//! Rendering of command results as tables, JSON or YAML.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use recordkit_fields::{AuditRecord, FieldDefinition};
use serde::Serialize;

use crate::cli::OutputFormat;

/// A table with the preset every command uses.
pub fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print `value` as JSON or YAML, or print the table built by `table`.
pub fn emit<T, F>(format: OutputFormat, value: &T, table: F) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> Table,
{
    match format {
        OutputFormat::Table => println!("{}", table()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml_ng::to_string(value)?),
    }
    Ok(())
}

/// Comma-separated flags of a field.
pub fn flags(def: &FieldDefinition) -> String {
    let mut parts = Vec::new();
    if def.is_required {
        parts.push("required");
    }
    if def.is_hidden {
        parts.push("hidden");
    }
    if def.is_read_only {
        parts.push("read-only");
    }
    parts.join(", ")
}

pub fn fields_table(defs: &[FieldDefinition]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Order", "Name", "Label", "Type", "Flags", "ID"]);
    for def in defs {
        table.add_row(vec![
            Cell::new(def.sort_order),
            Cell::new(&def.field_name),
            Cell::new(&def.field_label),
            Cell::new(def.field_type),
            Cell::new(flags(def)),
            Cell::new(def.id),
        ]);
    }
    table
}

pub fn field_table(def: &FieldDefinition) -> Table {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let ids = |ids: &[recordkit_fields::FieldId]| {
        ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
    };

    let mut table = new_table();
    table.set_header(vec!["Attribute", "Value"]);
    let rows = [
        ("ID", def.id.to_string()),
        ("Entity", def.entity_type.to_string()),
        ("Name", def.field_name.clone()),
        ("Label", def.field_label.clone()),
        ("Type", def.field_type.to_string()),
        ("Flags", flags(def)),
        ("Sort order", def.sort_order.to_string()),
        ("Options", def.options.join(" | ")),
        ("Placeholder", opt(&def.placeholder)),
        ("Default", opt(&def.default_value)),
        (
            "Lookup",
            def.lookup_type.map(|l| format!("{l:?}")).unwrap_or_default(),
        ),
        ("Sub-fields", ids(&def.sub_field_ids)),
        (
            "Depends on",
            def.dependent_on_field_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ),
        ("Role", def.role.map(|r| format!("{r:?}")).unwrap_or_default()),
        ("Updated", format!("{} by {}", def.updated_at.to_rfc3339(), def.updated_by)),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    table
}

pub fn audit_table(records: &[AuditRecord]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Time", "Action", "Entity", "Field", "Changed", "Actor"]);
    for record in records {
        let changed = record
            .changed_attributes
            .as_ref()
            .map(|attrs| attrs.iter().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(record.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(format!("{:?}", record.action)),
            Cell::new(record.entity_type),
            Cell::new(record.field_id),
            Cell::new(changed),
            Cell::new(&record.actor),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_renders_header() {
        let rendered = fields_table(&[]).to_string();
        assert!(rendered.contains("Label"));
        assert!(rendered.contains("Flags"));
    }
}
