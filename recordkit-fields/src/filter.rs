//! Advanced-filter matching and column sorting for list pages.
//!
//! The matcher only sees `(value, field type, criterion)`, so every entity's
//! list page filters the same way.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::registry::{
    parse_amount, parse_bool, parse_date, parse_number, FieldTypeRegistry, SemanticKind,
};
use crate::types::{fold_key, FieldDefinition, FieldType};
use crate::values::FieldValue;

/// Comparison operators offered by the advanced filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Before,
    After,
    On,
    GreaterThan,
    LessThan,
    IsEmpty,
    IsNotEmpty,
}

impl Operator {
    pub const ALL: [Operator; 13] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Before,
        Operator::After,
        Operator::On,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::IsEmpty,
        Operator::IsNotEmpty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Contains => "contains",
            Operator::NotContains => "notContains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::On => "on",
            Operator::GreaterThan => "greaterThan",
            Operator::LessThan => "lessThan",
            Operator::IsEmpty => "isEmpty",
            Operator::IsNotEmpty => "isNotEmpty",
        }
    }

    /// `notEquals` and `notContains`.
    pub fn is_negated(&self) -> bool {
        matches!(self, Operator::NotEquals | Operator::NotContains)
    }

    fn positive(self) -> Operator {
        match self {
            Operator::NotEquals => Operator::Equals,
            Operator::NotContains => Operator::Contains,
            other => other,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = fold_key(s);
        Operator::ALL
            .into_iter()
            .find(|op| fold_key(op.as_str()) == key)
            .ok_or_else(|| format!("unknown filter operator: {s}"))
    }
}

/// Yes / no / don't care, for boolean-style columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriState {
    #[default]
    Any,
    Yes,
    No,
}

impl TriState {
    fn accepts(self, truthy: bool) -> bool {
        match self {
            TriState::Any => true,
            TriState::Yes => truthy,
            TriState::No => !truthy,
        }
    }
}

impl FromStr for TriState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if fold_key(s) == "any" {
            return Ok(TriState::Any);
        }
        match parse_bool(s) {
            Some(true) => Ok(TriState::Yes),
            Some(false) => Ok(TriState::No),
            None => Err(format!("expected yes, no or any, got {s}")),
        }
    }
}

/// One filter condition on one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Criterion {
    Compare {
        operator: Operator,
        #[serde(default)]
        operand: String,
    },
    Flag {
        state: TriState,
    },
}

impl Criterion {
    pub fn new(operator: Operator, operand: impl Into<String>) -> Self {
        Criterion::Compare {
            operator,
            operand: operand.into(),
        }
    }

    pub fn flag(state: TriState) -> Self {
        Criterion::Flag { state }
    }
}

/// How a column's values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Boolean,
    Date,
    Numeric,
    Text,
}

impl Column {
    fn from_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Checkbox => Column::Boolean,
            t if t.is_date() => Column::Date,
            t if t.is_numeric() => Column::Numeric,
            _ => Column::Text,
        }
    }

    fn from_kind(kind: SemanticKind) -> Self {
        match kind {
            SemanticKind::Boolean => Column::Boolean,
            SemanticKind::Date | SemanticKind::DateTime => Column::Date,
            SemanticKind::Number | SemanticKind::Count => Column::Numeric,
            _ => Column::Text,
        }
    }
}

/// Whether `value` satisfies `criterion` for a column of `field_type`.
///
/// An empty operand matches everything. A missing value fails every positive
/// operator and passes the negated ones. For multi-valued values a positive
/// operator needs one matching element; a negated one needs every element to
/// pass.
pub fn matches_criterion(
    value: Option<&FieldValue>,
    field_type: FieldType,
    criterion: &Criterion,
) -> bool {
    matches_column(value, field_type, Column::from_type(field_type), criterion)
}

/// Like [`matches_criterion`], using the definition's semantic
/// classification, so a text field labelled "Employees" compares numerically.
pub fn matches_field(def: &FieldDefinition, value: Option<&FieldValue>, criterion: &Criterion) -> bool {
    let column = Column::from_kind(FieldTypeRegistry::classify(def));
    matches_column(value, def.field_type, column, criterion)
}

fn matches_column(
    value: Option<&FieldValue>,
    field_type: FieldType,
    column: Column,
    criterion: &Criterion,
) -> bool {
    let (operator, operand) = match criterion {
        Criterion::Flag { state } => return state.accepts(value.is_some_and(is_truthy)),
        Criterion::Compare { operator, operand } => (*operator, operand.trim()),
    };

    let present = FieldTypeRegistry::is_present(field_type, value);
    match operator {
        Operator::IsEmpty => return !present,
        Operator::IsNotEmpty => return present,
        _ => {}
    }
    if operand.is_empty() {
        return true;
    }

    // Unchecked and missing are the same answer for a checkbox.
    if column == Column::Boolean && matches!(operator.positive(), Operator::Equals) {
        if let Some(wanted) = parse_bool(operand) {
            let equal = value.is_some_and(is_truthy) == wanted;
            return equal != operator.is_negated();
        }
    }

    let Some(value) = value.filter(|_| present) else {
        return operator.is_negated();
    };
    let items = value.items();
    let mut items = items.iter().filter(|item| !item.trim().is_empty());
    let positive = operator.positive();
    if operator.is_negated() {
        items.all(|item| !item_matches(item, operand, positive, column))
    } else {
        items.any(|item| item_matches(item, operand, positive, column))
    }
}

fn item_matches(item: &str, operand: &str, operator: Operator, column: Column) -> bool {
    let item = item.trim();
    match operator {
        Operator::Contains => item.to_lowercase().contains(&operand.to_lowercase()),
        Operator::StartsWith => item.to_lowercase().starts_with(&operand.to_lowercase()),
        Operator::EndsWith => item.to_lowercase().ends_with(&operand.to_lowercase()),
        Operator::Equals | Operator::On => ordering(item, operand, column) == Some(Ordering::Equal),
        Operator::Before | Operator::LessThan => {
            ordering(item, operand, column) == Some(Ordering::Less)
        }
        Operator::After | Operator::GreaterThan => {
            ordering(item, operand, column) == Some(Ordering::Greater)
        }
        Operator::NotEquals | Operator::NotContains | Operator::IsEmpty | Operator::IsNotEmpty => {
            false
        }
    }
}

/// Compare two raw strings the way `column` does. Date columns only compare
/// parseable calendar dates.
fn ordering(a: &str, b: &str, column: Column) -> Option<Ordering> {
    match column {
        Column::Date => Some(parse_date(a)?.cmp(&parse_date(b)?)),
        Column::Boolean => match (parse_bool(a), parse_bool(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(natural_cmp(a, b)),
        },
        Column::Numeric => match (parse_amount(a), parse_amount(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(natural_cmp(a, b)),
        },
        Column::Text => match (parse_number(a), parse_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(natural_cmp(a, b)),
        },
    }
}

fn is_truthy(value: &FieldValue) -> bool {
    match value {
        FieldValue::Bool(b) => *b,
        FieldValue::Number(n) => *n != 0.0,
        FieldValue::Text(s) => parse_bool(s) == Some(true),
        FieldValue::List(items) => items.iter().any(|s| parse_bool(s) == Some(true)),
    }
}

/// Ordering for sorting a column ascending. Empty values sort last.
pub fn compare_values(a: Option<&FieldValue>, b: Option<&FieldValue>, field_type: FieldType) -> Ordering {
    let column = Column::from_type(field_type);
    if column == Column::Boolean {
        return a.is_some_and(is_truthy).cmp(&b.is_some_and(is_truthy));
    }
    let a = a.filter(|v| FieldTypeRegistry::is_present(field_type, Some(*v)));
    let b = b.filter(|v| FieldTypeRegistry::is_present(field_type, Some(*v)));
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let (a, b) = (a.as_text(), b.as_text());
            let (a, b) = (a.trim(), b.trim());
            ordering(a, b, column).unwrap_or_else(|| {
                // Parseable dates ahead of free text.
                match (parse_date(a).is_some(), parse_date(b).is_some()) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => natural_cmp(a, b),
                }
            })
        }
    }
}

/// Case-insensitive comparison that orders digit runs by numeric value, so
/// `Field_9` sorts before `Field_10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().flat_map(char::to_lowercase).peekable();
    let mut b = b.chars().flat_map(char::to_lowercase).peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let ord = cmp_digit_runs(&take_digits(&mut a), &take_digits(&mut b));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits<I: Iterator<Item = char>>(chars: &mut Peekable<I>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
