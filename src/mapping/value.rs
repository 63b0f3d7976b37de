//! Value kinds and converted field values
//!
//! Every column mapping declares one [`ValueKind`]. The kind owns the parse
//! logic for raw text, and [`Value::render`] is its inverse for canonical input.

use crate::constants::{
    CANONICAL_DATETIME_FORMAT, DATE_FORMAT, NAIVE_DATETIME_FORMATS, OFFSET_DATETIME_FORMATS,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of converting one raw field; the error carries a human-readable reason.
pub type ConversionResult = std::result::Result<Value, String>;

/// Supported destination value kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    #[default]
    String,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    /// Same conversion as the inner kind; blank input is always null anyway
    Nullable(Box<ValueKind>),
}

impl ValueKind {
    /// Wrap a kind as nullable
    pub fn nullable(inner: ValueKind) -> Self {
        ValueKind::Nullable(Box::new(inner))
    }

    /// The kind that actually drives conversion, with every nullable layer removed
    pub fn underlying(&self) -> &ValueKind {
        match self {
            ValueKind::Nullable(inner) => inner.underlying(),
            other => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueKind::Nullable(_))
    }

    /// Convert a non-blank raw string into a value of this kind.
    ///
    /// Numbers are parsed with invariant formatting (`.` as decimal separator),
    /// date-times are normalized to UTC. Offset-less timestamps are taken as UTC.
    pub fn parse(&self, raw: &str) -> ConversionResult {
        match self {
            ValueKind::String => Ok(Value::String(raw.to_string())),
            ValueKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| e.to_string()),
            ValueKind::Decimal => parse_decimal(raw.trim()).map(Value::Decimal),
            ValueKind::Boolean => parse_boolean(raw.trim()).map(Value::Boolean),
            ValueKind::DateTime => parse_datetime(raw.trim()).map(Value::DateTime),
            ValueKind::Nullable(inner) => inner.parse(raw),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::String => write!(f, "string"),
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Decimal => write!(f, "decimal"),
            ValueKind::Boolean => write!(f, "boolean"),
            ValueKind::DateTime => write!(f, "date-time"),
            ValueKind::Nullable(inner) => write!(f, "nullable<{}>", inner),
        }
    }
}

/// A converted field value, or the explicit null marker
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render the value back to text using the inverse of its kind's parser.
    ///
    /// Returns `None` for the null marker.
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::DateTime(dt) => Some(dt.format(CANONICAL_DATETIME_FORMAT).to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

fn parse_decimal(value: &str) -> std::result::Result<Decimal, String> {
    Decimal::from_str(value)
        .or_else(|e| {
            if value.contains(['e', 'E']) {
                Decimal::from_scientific(value)
            } else {
                Err(e)
            }
        })
        .map_err(|e| e.to_string())
}

fn parse_boolean(value: &str) -> std::result::Result<bool, String> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err("expected 'true' or 'false'".to_string())
    }
}

/// Parse a timestamp in one of the accepted layouts and normalize it to UTC
pub fn parse_datetime(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err("unrecognized date-time layout".to_string())
}
