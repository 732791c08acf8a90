use recordkit_fields::{matches_criterion, Criterion, FieldType, FieldValue, Operator, TriState};
use serde::Serialize;

use super::CommandContext;
use crate::cli::OutputFormat;
use crate::output::{emit, new_table};

#[derive(Debug, Serialize)]
struct MatchResult {
    criterion: Criterion,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<FieldValue>,
    matches: bool,
}

/// Returns whether the value satisfies the criterion.
pub fn run_match(
    ctx: &CommandContext,
    field_type: FieldType,
    op: Option<Operator>,
    operand: String,
    flag: Option<TriState>,
    values: Vec<String>,
) -> anyhow::Result<bool> {
    let criterion = match (flag, op) {
        (Some(state), _) => Criterion::flag(state),
        (None, Some(op)) => Criterion::new(op, operand),
        (None, None) => anyhow::bail!("either --op or --flag is required"),
    };
    let value = value_from_args(field_type, values);
    let matches = matches_criterion(value.as_ref(), field_type, &criterion);

    let result = MatchResult {
        criterion,
        value,
        matches,
    };
    match ctx.format {
        OutputFormat::Table => println!("{}", if matches { "match" } else { "no match" }),
        format => emit(format, &result, new_table)?,
    }
    Ok(matches)
}

/// No arguments is a missing value; several, or any for a multi-valued
/// type, are one list value.
fn value_from_args(field_type: FieldType, mut values: Vec<String>) -> Option<FieldValue> {
    match values.len() {
        0 => None,
        1 if !field_type.is_multi_valued() => values.pop().map(FieldValue::from),
        _ => Some(FieldValue::List(values)),
    }
}
