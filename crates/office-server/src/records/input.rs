//! Loose input parsing shared by the record payloads
//!
//! Form submissions send numbers as JSON numbers or as typed text ("6,000",
//! "１０％"); dates arrive in a handful of layouts. Everything is converted
//! here into typed values or a [`ValidationError`] naming the field.

use crate::error::ValidationError;
use crate::store::Document;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Whether a payload creates a record or patches one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Storage layout of session date-times
pub const DATETIME_STORAGE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Whole, non-negative yen from a number or typed text
pub fn validate_amount(field: &str, value: &Value) -> Result<i64, ValidationError> {
    let amount = match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => f as i64,
            _ => return Err(ValidationError::new(field, "整数で入力してください")),
        },
        Value::String(s) => ja_text::parse_amount(s)
            .map_err(|_| ValidationError::new(field, "数値で入力してください"))?,
        _ => return Err(ValidationError::new(field, "数値で入力してください")),
    };
    if amount < 0 {
        return Err(ValidationError::new(field, "0以上で入力してください"));
    }
    Ok(amount)
}

/// Non-negative percentage from a number or typed text
pub fn validate_tax_rate(field: &str, value: &Value) -> Result<f64, ValidationError> {
    let rate = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ValidationError::new(field, "数値で入力してください"))?,
        Value::String(s) => ja_text::parse_rate(s)
            .map_err(|_| ValidationError::new(field, "数値で入力してください"))?,
        _ => return Err(ValidationError::new(field, "数値で入力してください")),
    };
    if !rate.is_finite() || rate < 0.0 {
        return Err(ValidationError::new(field, "0以上で入力してください"));
    }
    Ok(rate)
}

/// Trimmed text; numbers are accepted as their decimal form, `null` as empty
pub fn text(field: &str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(ValidationError::new(field, "文字列で入力してください")),
    }
}

pub fn date(field: &str, value: &Value) -> Result<NaiveDate, ValidationError> {
    let invalid = || ValidationError::new(field, "日付の形式が正しくありません");
    let raw = value.as_str().map(str::trim).ok_or_else(invalid)?;

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
        .ok_or_else(invalid)
}

/// Date and time of day; a bare date means midnight
pub fn datetime(field: &str, value: &Value) -> Result<NaiveDateTime, ValidationError> {
    let invalid = || ValidationError::new(field, "日時の形式が正しくありません");
    let raw = value.as_str().map(str::trim).ok_or_else(invalid)?;

    parse_datetime(raw)
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok_or_else(invalid)
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    // Offsets keep the wall-clock time the person entered
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Positive whole number
pub fn count(field: &str, value: &Value) -> Result<u32, ValidationError> {
    let invalid = || ValidationError::new(field, "1以上の整数で入力してください");
    let n = match value {
        Value::Number(n) => n.as_u64().ok_or_else(invalid)?,
        Value::String(s) => ja_text::parse_amount(s)
            .ok()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };
    match u32::try_from(n) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid()),
    }
}

/// Collects validated fields and every error seen on the way
#[derive(Debug, Default)]
pub(crate) struct Fields {
    pub(crate) doc: Document,
    errors: Vec<ValidationError>,
}

impl Fields {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put(&mut self, key: &str, value: impl Into<Value>) {
        self.doc.insert(key.to_string(), value.into());
    }

    pub(crate) fn error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Validate `value` with `parse` and store the result under `key`
    pub(crate) fn parse<T, F>(&mut self, key: &str, value: Option<&Value>, parse: F) -> Option<T>
    where
        T: Clone + Into<Value>,
        F: FnOnce(&str, &Value) -> Result<T, ValidationError>,
    {
        let value = value?;
        match parse(key, value) {
            Ok(parsed) => {
                self.put(key, parsed.clone());
                Some(parsed)
            }
            Err(e) => {
                self.error(e);
                None
            }
        }
    }

    /// Text field; a required one must be present and non-empty on create and
    /// non-empty whenever present
    pub(crate) fn text(&mut self, key: &str, value: Option<&Value>, required: bool, mode: Mode) {
        match value {
            None if required && mode == Mode::Create => self.error(ValidationError::required(key)),
            None => {}
            Some(value) => match text(key, value) {
                Ok(s) if required && s.is_empty() => self.error(ValidationError::required(key)),
                Ok(s) => self.put(key, s),
                Err(e) => self.error(e),
            },
        }
    }

    pub(crate) fn finish(self) -> Result<Document, Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(self.doc)
        } else {
            Err(self.errors)
        }
    }
}

/// Present and not `null`
pub(crate) fn given(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| !v.is_null())
}

/// Read-side tolerance for stored records
pub(crate) mod lenient {
    use super::*;
    use serde::de::Error;

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Value::deserialize(deserializer)?;
        super::text("", &value).map_err(|_| D::Error::custom("expected text"))
    }

    pub fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        validate_amount("", &value)
            .map_err(|_| D::Error::custom(format!("non-numeric amount {value}")))
    }

    pub fn rate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        validate_tax_rate("", &value)
            .map_err(|_| D::Error::custom(format!("non-numeric rate {value}")))
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let s = text(deserializer)?;
        Ok(Some(s).filter(|s| !s.is_empty()))
    }
}
