//! Dynamically typed cell values.
//!
//! Every value read from or written to a registered table travels as a
//! [`FieldValue`]. The [`ColumnKind`] of the target column decides how form
//! input is parsed into one.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::ColumnKind;

/// Display format for dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Display format for timestamps.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row, keyed by column name (or relation alias) in SELECT order.
pub type Record = IndexMap<String, FieldValue>;

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Text, and also decimals and UUIDs in their canonical text form.
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Render the value the way it appears in tables and exports.
    ///
    /// `Null` renders as an empty string.
    pub fn to_display_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            FieldValue::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
            FieldValue::Json(v) => v.to_string(),
        }
    }

    /// Numeric view used by number formatters.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Parse a non-empty raw string into a value of the given kind.
    pub fn parse(kind: ColumnKind, raw: &str) -> Result<FieldValue, String> {
        let trimmed = raw.trim();
        match kind {
            ColumnKind::Integer => trimmed
                .parse::<i64>()
                .map(FieldValue::Int)
                .map_err(|_| format!("'{trimmed}' is not an integer")),
            ColumnKind::Float => match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(FieldValue::Float(f)),
                _ => Err(format!("'{trimmed}' is not a number")),
            },
            ColumnKind::Decimal => match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(FieldValue::Text(trimmed.to_string())),
                _ => Err(format!("'{trimmed}' is not a decimal number")),
            },
            ColumnKind::Text => Ok(FieldValue::Text(raw.to_string())),
            ColumnKind::Boolean => parse_bool(trimmed)
                .map(FieldValue::Bool)
                .ok_or_else(|| format!("'{trimmed}' is not a boolean")),
            ColumnKind::Date => parse_date(trimmed)
                .map(FieldValue::Date)
                .ok_or_else(|| format!("'{trimmed}' is not a date (expected YYYY-MM-DD)")),
            ColumnKind::DateTime => parse_datetime(trimmed)
                .map(FieldValue::DateTime)
                .ok_or_else(|| format!("'{trimmed}' is not a date-time")),
            ColumnKind::Uuid => uuid::Uuid::parse_str(trimmed)
                .map(|u| FieldValue::Text(u.hyphenated().to_string()))
                .map_err(|_| format!("'{trimmed}' is not a UUID")),
            ColumnKind::Json => serde_json::from_str(raw)
                .map(FieldValue::Json)
                .map_err(|e| format!("invalid JSON: {e}")),
        }
    }

    /// Parse submitted form input for a column.
    ///
    /// Blank input becomes `Null` for nullable non-text columns, an empty
    /// string for text columns, and an error otherwise.
    pub fn parse_form(kind: ColumnKind, raw: &str, nullable: bool) -> Result<FieldValue, String> {
        if raw.trim().is_empty() {
            return match kind {
                ColumnKind::Text => Ok(FieldValue::Text(raw.to_string())),
                ColumnKind::Boolean if !nullable => Ok(FieldValue::Bool(false)),
                _ if nullable => Ok(FieldValue::Null),
                _ => Err("a value is required".to_string()),
            };
        }
        FieldValue::parse(kind, raw)
    }
}

/// Accept the spellings browsers and users send for booleans.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" | "y" | "t" => Some(true),
        "false" | "0" | "off" | "no" | "n" | "f" => Some(false),
        _ => None,
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, the `datetime-local` input
/// format, or a bare date (midnight). Naive inputs are taken as UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    parse_date(raw)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn display_strings() {
        assert_eq!(FieldValue::Null.to_display_string(), "");
        assert_eq!(FieldValue::Bool(true).to_display_string(), "true");
        assert_eq!(FieldValue::Int(42).to_display_string(), "42");
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 8, 5, 9).unwrap();
        assert_eq!(
            FieldValue::DateTime(dt).to_display_string(),
            "2024-03-01 08:05:09"
        );
        assert_eq!(
            FieldValue::Json(serde_json::json!({"a": 1})).to_display_string(),
            r#"{"a":1}"#
        );
    }

    #[test]
    fn parse_integer_and_float() {
        assert_eq!(
            FieldValue::parse(ColumnKind::Integer, " 7 ").unwrap(),
            FieldValue::Int(7)
        );
        assert_matches!(FieldValue::parse(ColumnKind::Integer, "seven"), Err(_));
        assert_matches!(FieldValue::parse(ColumnKind::Float, "NaN"), Err(_));
        assert_eq!(
            FieldValue::parse(ColumnKind::Decimal, "12.50").unwrap(),
            FieldValue::Text("12.50".into())
        );
    }

    #[test]
    fn parse_booleans() {
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_datetimes_in_several_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 0).unwrap();
        assert_eq!(parse_datetime("2024-05-06T07:08"), Some(expected));
        assert_eq!(parse_datetime("2024-05-06 07:08:00"), Some(expected));
        assert_eq!(parse_datetime("2024-05-06T07:08:00Z"), Some(expected));
        assert_eq!(
            parse_datetime("2024-05-06"),
            Some(Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn uuid_is_canonicalized() {
        let parsed =
            FieldValue::parse(ColumnKind::Uuid, "67E55044-10B1-426F-9247-BB680E5FE0C8").unwrap();
        assert_eq!(
            parsed,
            FieldValue::Text("67e55044-10b1-426f-9247-bb680e5fe0c8".into())
        );
    }

    #[test]
    fn blank_form_input() {
        assert_eq!(
            FieldValue::parse_form(ColumnKind::Integer, "", true).unwrap(),
            FieldValue::Null
        );
        assert_matches!(FieldValue::parse_form(ColumnKind::Integer, " ", false), Err(_));
        assert_eq!(
            FieldValue::parse_form(ColumnKind::Text, "", false).unwrap(),
            FieldValue::Text(String::new())
        );
        assert_eq!(
            FieldValue::parse_form(ColumnKind::Boolean, "", false).unwrap(),
            FieldValue::Bool(false)
        );
    }
}
