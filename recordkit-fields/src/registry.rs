//! FieldTypeRegistry: what counts as a present value and what counts as a
//! valid one, for every field type.
//!
//! Everything here is pure. Entity type and storage never matter; only the
//! definition (type, label, name) and the raw value do.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::area_codes::is_valid_area_code;
use crate::types::{FieldDefinition, FieldType};
use crate::values::FieldValue;

/// Placeholder text a select renders before the user picks anything.
pub const SELECT_PLACEHOLDER: &str = "select an option";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\d{3}\) \d{3}-\d{4}$").expect("phone pattern compiles"));
static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(?:[T ](\d{2}):(\d{2})(?::(\d{2}))?)?$")
        .expect("iso date pattern compiles")
});
static US_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})/(\d{2})/(\d{4})(?:[T ](\d{2}):(\d{2})(?::(\d{2}))?)?$")
        .expect("us date pattern compiles")
});

const ZIP_MARKERS: &[&str] = &["zip", "postal code"];
const COUNT_MARKERS: &[&str] = &["employees", "offices", "oasis key"];
const URL_MARKERS: &[&str] = &["website", "url", "linkedin"];

/// The validator a definition is checked with, derived from its type and,
/// for free-form types, from its label and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SemanticKind {
    Choice,
    Date,
    DateTime,
    Zip,
    Count,
    Phone,
    Email,
    Url,
    Number,
    Boolean,
    MultiValued,
    Text,
}

/// Registry of per-type presence and validity rules.
pub struct FieldTypeRegistry;

impl FieldTypeRegistry {
    /// Classify a definition.
    pub fn classify(def: &FieldDefinition) -> SemanticKind {
        match def.field_type {
            FieldType::Select | FieldType::Radio => SemanticKind::Choice,
            FieldType::Date => SemanticKind::Date,
            FieldType::Datetime => SemanticKind::DateTime,
            FieldType::Phone => SemanticKind::Phone,
            FieldType::Email => SemanticKind::Email,
            FieldType::Url | FieldType::Link => SemanticKind::Url,
            FieldType::Checkbox => SemanticKind::Boolean,
            FieldType::Multiselect | FieldType::Multicheckbox | FieldType::MultiselectLookup => {
                SemanticKind::MultiValued
            }
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Number
            | FieldType::Currency
            | FieldType::Percentage => {
                if mentions(def, ZIP_MARKERS) {
                    SemanticKind::Zip
                } else if mentions(def, COUNT_MARKERS) {
                    SemanticKind::Count
                } else if mentions(def, URL_MARKERS) {
                    SemanticKind::Url
                } else if def.field_type.is_numeric() {
                    SemanticKind::Number
                } else {
                    SemanticKind::Text
                }
            }
            FieldType::File | FieldType::Lookup | FieldType::Composite => SemanticKind::Text,
        }
    }

    /// Whether the value counts as filled in at all.
    ///
    /// Blank strings, lists with no non-blank item, the select placeholder and
    /// an unchecked checkbox are not present.
    pub fn is_present(field_type: FieldType, value: Option<&FieldValue>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match value {
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => n.is_finite(),
            FieldValue::List(items) => items.iter().any(|s| !s.trim().is_empty()),
            FieldValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return false;
                }
                match field_type {
                    FieldType::Select | FieldType::Radio => {
                        !s.eq_ignore_ascii_case(SELECT_PLACEHOLDER)
                    }
                    FieldType::Checkbox => parse_bool(s).unwrap_or(true),
                    _ => true,
                }
            }
        }
    }

    /// Whether the value is present and valid for the definition.
    pub fn is_valid(def: &FieldDefinition, value: Option<&FieldValue>) -> bool {
        Self::check(def, value).is_ok()
    }

    /// Like [`Self::is_valid`] but with the reason for rejection.
    pub fn check(def: &FieldDefinition, value: Option<&FieldValue>) -> Result<(), String> {
        if !Self::is_present(def.field_type, value) {
            return Err(match Self::classify(def) {
                SemanticKind::Choice => "select an option".to_string(),
                _ => "is required".to_string(),
            });
        }
        let Some(value) = value else {
            return Err("is required".to_string());
        };
        let kind = Self::classify(def);
        if kind == SemanticKind::MultiValued || kind == SemanticKind::Boolean {
            return Ok(());
        }
        if let FieldValue::List(_) = value {
            return Err("expects a single value".to_string());
        }
        let text = value.as_text();
        let text = text.trim();
        match kind {
            SemanticKind::Choice | SemanticKind::Text => Ok(()),
            SemanticKind::Date => parse_date(text)
                .map(|_| ())
                .ok_or_else(|| "must be a valid date (YYYY-MM-DD or MM/DD/YYYY)".to_string()),
            SemanticKind::DateTime => parse_datetime(text)
                .map(|_| ())
                .ok_or_else(|| "must be a valid date (YYYY-MM-DD or MM/DD/YYYY)".to_string()),
            SemanticKind::Zip => check_zip(text),
            SemanticKind::Count => match parse_number(text) {
                Some(n) if n >= 0.0 => Ok(()),
                _ => Err("must be a number of 0 or more".to_string()),
            },
            SemanticKind::Phone => check_phone(text),
            SemanticKind::Email => {
                if EMAIL_RE.is_match(text) {
                    Ok(())
                } else {
                    Err("must be a valid email address".to_string())
                }
            }
            SemanticKind::Url => check_url(text).map(|_| ()),
            SemanticKind::Number => parse_amount(text)
                .map(|_| ())
                .ok_or_else(|| "must be a number".to_string()),
            SemanticKind::MultiValued | SemanticKind::Boolean => Ok(()),
        }
    }

    /// Normalized form of a valid value; `None` when the value is invalid.
    pub fn normalize(def: &FieldDefinition, value: &FieldValue) -> Option<FieldValue> {
        Self::check(def, Some(value)).ok()?;
        let normalized = match (Self::classify(def), value) {
            (_, FieldValue::List(items)) => FieldValue::List(
                items
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            (SemanticKind::Boolean, v) => FieldValue::Bool(match v {
                FieldValue::Bool(b) => *b,
                other => parse_bool(other.as_text().trim()).unwrap_or(true),
            }),
            (SemanticKind::Date, v) => {
                FieldValue::Text(parse_date(v.as_text().trim())?.format("%Y-%m-%d").to_string())
            }
            (SemanticKind::DateTime, v) => {
                FieldValue::Text(format_datetime(&parse_datetime(v.as_text().trim())?))
            }
            (SemanticKind::Url, v) => FieldValue::Text(check_url(v.as_text().trim()).ok()?),
            (SemanticKind::Number, v) => FieldValue::Number(parse_amount(v.as_text().trim())?),
            (SemanticKind::Count, v) => FieldValue::Number(parse_number(v.as_text().trim())?),
            (_, FieldValue::Number(n)) => FieldValue::Number(*n),
            (_, v) => FieldValue::Text(v.as_text().trim().to_string()),
        };
        Some(normalized)
    }
}

fn mentions(def: &FieldDefinition, markers: &[&str]) -> bool {
    let label = def.field_label.to_lowercase();
    let name = def.field_name.to_lowercase();
    markers
        .iter()
        .any(|m| label.contains(m) || name.contains(m))
}

fn check_zip(text: &str) -> Result<(), String> {
    if text.len() == 5 && text.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err("must be exactly 5 digits".to_string())
    }
}

fn check_phone(text: &str) -> Result<(), String> {
    if !PHONE_RE.is_match(text) {
        return Err("must be in the format (XXX) XXX-XXXX".to_string());
    }
    let digits: Vec<u8> = text
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();
    if digits.len() != 10 {
        return Err("must contain exactly 10 digits".to_string());
    }
    if digits[0] < 2 {
        return Err("area code cannot start with 0 or 1".to_string());
    }
    if digits[3] < 2 {
        return Err("exchange code cannot start with 0 or 1".to_string());
    }
    let area = u16::from(digits[0]) * 100 + u16::from(digits[1]) * 10 + u16::from(digits[2]);
    if !is_valid_area_code(area) {
        return Err(format!("area code {area} is not a valid area code"));
    }
    Ok(())
}

/// Validates a web address and returns it with a leading `www.` expanded to
/// `https://www.`.
fn check_url(text: &str) -> Result<String, String> {
    const REASON: &str = "must be a valid URL starting with http://, https:// or www.";
    let lower = text.to_ascii_lowercase();
    let normalized = if lower.starts_with("http://") || lower.starts_with("https://") {
        text.to_string()
    } else if lower.starts_with("www.") {
        format!("https://{text}")
    } else {
        return Err(REASON.to_string());
    };
    let parsed = Url::parse(&normalized).map_err(|_| REASON.to_string())?;
    let host = parsed.host_str().ok_or_else(|| REASON.to_string())?;
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(REASON.to_string());
    }
    Ok(normalized)
}

/// Parse a `YYYY-MM-DD` or `MM/DD/YYYY` calendar date. Impossible dates such
/// as `02/30/2024` are rejected. A time suffix is ignored.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    parse_datetime(text).map(|dt| dt.date())
}

/// Parse a date with an optional `THH:MM[:SS]` or ` HH:MM[:SS]` suffix.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let (year, month, day, time) = if let Some(c) = ISO_DATE_RE.captures(text) {
        (c.get(1)?, c.get(2)?, c.get(3)?, (c.get(4), c.get(5), c.get(6)))
    } else if let Some(c) = US_DATE_RE.captures(text) {
        (c.get(3)?, c.get(1)?, c.get(2)?, (c.get(4), c.get(5), c.get(6)))
    } else {
        return None;
    };
    let date = NaiveDate::from_ymd_opt(
        year.as_str().parse().ok()?,
        month.as_str().parse().ok()?,
        day.as_str().parse().ok()?,
    )?;
    let time = match time {
        (Some(h), Some(m), s) => NaiveTime::from_hms_opt(
            h.as_str().parse().ok()?,
            m.as_str().parse().ok()?,
            s.map_or(Some(0), |s| s.as_str().parse().ok())?,
        )?,
        _ => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.time() == NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Parse a plain number.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a currency or percentage amount: `$`, `,` and a trailing `%` are
/// tolerated.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    parse_number(&cleaned)
}

/// Parse a boolean-like string: `yes`/`true`/`1` and `no`/`false`/`0`.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Progressive `(XXX) XXX-XXXX` formatting of whatever digits were typed so far.
pub fn format_phone(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).take(10).collect();
    match digits.len() {
        0 => String::new(),
        1..=3 => format!("({digits}"),
        4..=6 => format!("({}) {}", &digits[..3], &digits[3..]),
        _ => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
    }
}
