//! CLI definition for the `recordkit` command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use recordkit_fields::{
    EntityType, FieldChanges, FieldDraft, FieldId, FieldRole, FieldType, LookupType, Operator,
    TriState,
};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

/// recordkit - administer custom field schemas.
///
/// Field definitions live in a schema directory, one YAML file per field
/// under `definitions/<entityType>/`, with an append-only `audit.jsonl`.
#[derive(Parser, Debug)]
#[command(name = "recordkit")]
#[command(version)]
#[command(about = "Custom field schema administration, validation and filtering")]
#[command(long_about = "
recordkit manages the custom fields of organizations, job seekers, hiring
managers, jobs, leads, tasks and placements. Definitions are validated on
every change and each change is written to the audit log.

Configuration is read from recordkit.toml / recordkit.yaml in the schema
directory and from RECORDKIT_* environment variables.

Example usage:
  recordkit init
  recordkit field create --entity job --label Title --type text --required
  recordkit --format json field list --entity job
  recordkit validate --entity job --values record.json
  recordkit match --type date --op after --operand 2024-03-10 03/15/2024
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Schema directory
    #[arg(long, global = true, value_name = "DIR", default_value = ".recordkit")]
    pub root: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Global output format
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the schema directory
    Init,

    /// Manage field definitions
    Field {
        #[command(subcommand)]
        action: FieldAction,
    },

    /// Show the form layout of an entity type
    Layout {
        #[arg(long)]
        entity: EntityType,
    },

    /// Validate a record's label-keyed values against the schema
    #[command(long_about = "
Validate a record's custom values. VALUES is a JSON object keyed by field
label, the way records store them. Exits with status 1 when the form would
be rejected.")]
    Validate {
        #[arg(long)]
        entity: EntityType,

        /// JSON file of label-keyed values
        #[arg(long, value_name = "FILE")]
        values: PathBuf,

        /// Pre-fill role defaults for this user before validating
        #[arg(long)]
        user: Option<String>,
    },

    /// Test a value against an advanced-filter criterion
    #[command(long_about = "
Test a value against one filter criterion. No VALUE means the value is
missing; several make a multi-valued value. Exits with status 1 when the
value does not match.")]
    Match {
        /// Column type
        #[arg(long = "type", value_name = "TYPE")]
        field_type: FieldType,

        /// Comparison operator (equals, notEquals, contains, after, ...)
        #[arg(long, required_unless_present = "flag")]
        op: Option<Operator>,

        /// Operand for the comparison
        #[arg(long, default_value = "")]
        operand: String,

        /// Yes/no/any filter for boolean columns
        #[arg(long, conflicts_with_all = ["op", "operand"])]
        flag: Option<TriState>,

        /// Value(s) to test
        values: Vec<String>,
    },

    /// Show recent schema changes, newest first
    Audit {
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum FieldAction {
    /// List the fields of an entity type in display order
    List {
        #[arg(long)]
        entity: EntityType,
    },

    /// Show one field definition
    Show { id: FieldId },

    /// Create a field definition
    Create(CreateArgs),

    /// Change attributes of a field definition
    Update(UpdateArgs),

    /// Delete a field and release references to it
    Delete { id: FieldId },

    /// Put fields in the given order; unlisted fields follow
    Reorder {
        #[arg(long)]
        entity: EntityType,

        #[arg(required = true)]
        ids: Vec<FieldId>,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub entity: EntityType,

    #[arg(long)]
    pub label: String,

    #[arg(long = "type", value_name = "TYPE")]
    pub field_type: FieldType,

    /// Explicit field name (default: next Field_<n>)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub required: bool,

    #[arg(long)]
    pub hidden: bool,

    #[arg(long)]
    pub read_only: bool,

    #[arg(long)]
    pub sort_order: Option<i64>,

    /// Choice option, repeatable
    #[arg(long = "option", value_name = "OPTION")]
    pub options: Vec<String>,

    #[arg(long)]
    pub placeholder: Option<String>,

    #[arg(long)]
    pub default_value: Option<String>,

    #[arg(long)]
    pub lookup: Option<LookupType>,

    /// Sub-field of a composite, repeatable
    #[arg(long = "sub-field", value_name = "ID")]
    pub sub_fields: Vec<FieldId>,

    #[arg(long, value_name = "ID")]
    pub depends_on: Option<FieldId>,

    #[arg(long)]
    pub role: Option<FieldRole>,
}

impl CreateArgs {
    pub fn into_draft(self) -> FieldDraft {
        let mut draft = FieldDraft::new(self.label, self.field_type)
            .required(self.required)
            .hidden(self.hidden)
            .read_only(self.read_only)
            .with_options(self.options)
            .with_sub_fields(self.sub_fields);
        if let Some(name) = self.name {
            draft = draft.with_name(name);
        }
        if let Some(order) = self.sort_order {
            draft = draft.with_sort_order(order);
        }
        if let Some(placeholder) = self.placeholder {
            draft = draft.with_placeholder(placeholder);
        }
        if let Some(value) = self.default_value {
            draft = draft.with_default_value(value);
        }
        if let Some(lookup) = self.lookup {
            draft = draft.with_lookup(lookup);
        }
        if let Some(id) = self.depends_on {
            draft = draft.depends_on(id);
        }
        if let Some(role) = self.role {
            draft = draft.with_role(role);
        }
        draft
    }
}

/// Attributes left out are unchanged. An empty `--placeholder` or
/// `--default-value` clears it.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: FieldId,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub label: Option<String>,

    #[arg(long = "type", value_name = "TYPE")]
    pub field_type: Option<FieldType>,

    #[arg(long, value_name = "BOOL")]
    pub required: Option<bool>,

    #[arg(long, value_name = "BOOL")]
    pub hidden: Option<bool>,

    #[arg(long, value_name = "BOOL")]
    pub read_only: Option<bool>,

    #[arg(long)]
    pub sort_order: Option<i64>,

    /// Replace the choice options, repeatable
    #[arg(long = "option", value_name = "OPTION")]
    pub options: Vec<String>,

    #[arg(long, conflicts_with = "options")]
    pub clear_options: bool,

    #[arg(long)]
    pub placeholder: Option<String>,

    #[arg(long)]
    pub default_value: Option<String>,

    #[arg(long)]
    pub lookup: Option<LookupType>,

    #[arg(long, conflicts_with = "lookup")]
    pub clear_lookup: bool,

    /// Replace the sub-fields of a composite, repeatable
    #[arg(long = "sub-field", value_name = "ID")]
    pub sub_fields: Vec<FieldId>,

    #[arg(long, conflicts_with = "sub_fields")]
    pub clear_sub_fields: bool,

    #[arg(long, value_name = "ID")]
    pub depends_on: Option<FieldId>,

    #[arg(long, conflicts_with = "depends_on")]
    pub clear_depends_on: bool,

    #[arg(long)]
    pub role: Option<FieldRole>,

    #[arg(long, conflicts_with = "role")]
    pub clear_role: bool,
}

impl UpdateArgs {
    pub fn into_changes(self) -> (FieldId, FieldChanges) {
        let blank_clears = |v: String| Some(v).filter(|v| !v.trim().is_empty());
        let changes = FieldChanges {
            field_name: self.name,
            field_label: self.label,
            field_type: self.field_type,
            is_required: self.required,
            is_hidden: self.hidden,
            is_read_only: self.read_only,
            sort_order: self.sort_order,
            options: (self.clear_options || !self.options.is_empty()).then_some(self.options),
            placeholder: self.placeholder.map(blank_clears),
            default_value: self.default_value.map(blank_clears),
            lookup_type: clearable(self.lookup, self.clear_lookup),
            sub_field_ids: (self.clear_sub_fields || !self.sub_fields.is_empty())
                .then_some(self.sub_fields),
            dependent_on_field_id: clearable(self.depends_on, self.clear_depends_on),
            role: clearable(self.role, self.clear_role),
        };
        (self.id, changes)
    }
}

fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}
