//! Scalar values stored in table cells
//!
//! `Value::Null` is the absent-value marker. It is a different thing from
//! `Value::Float64(f64::NAN)`: a null never compares, never matches a join key
//! and propagates through arithmetic, while NaN is an ordinary float that sorts
//! after every other number and equals itself.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;

use crate::core::column::ColumnType;
use crate::error::{Error, Result};

/// Text layout used for naive timestamps when they leave the process
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Text layout used for dates when they leave the process
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single, possibly null, cell value
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(JsonValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True only for a non-null float holding NaN
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Float64(v) if v.is_nan())
    }

    /// Column type this value belongs to (`ColumnType::Null` for nulls)
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Int64(_) => ColumnType::Int64,
            Value::Float64(_) => ColumnType::Float64,
            Value::Utf8(_) => ColumnType::Utf8,
            Value::Date(_) => ColumnType::Date,
            Value::Timestamp(_) => ColumnType::Timestamp,
            Value::TimestampTz(_) => ColumnType::TimestampTz,
            Value::Json(_) => ColumnType::Json,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers are widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// SQL-style ordering between two values.
    ///
    /// Returns `None` when either side is null or the two values have no common
    /// ordering (e.g. a string against a date, or any JSON value). Integers and
    /// floats compare numerically. NaN is equal to NaN and greater than every
    /// other number, the convention PostgreSQL uses.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Float64(a), Value::Float64(b)) => Some(cmp_f64(*a, *b)),
            (Value::Int64(a), Value::Float64(b)) => Some(cmp_f64(*a as f64, *b)),
            (Value::Float64(a), Value::Int64(b)) => Some(cmp_f64(*a, *b as f64)),
            (Value::Utf8(a), Value::Utf8(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::TimestampTz(a), Value::TimestampTz(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// SQL-style equality: `None` if either side is null.
    ///
    /// JSON values compare structurally; everything else follows `sql_cmp`.
    pub fn sql_eq(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Json(a), Value::Json(b)) => Some(a == b),
            _ => self.sql_cmp(other).map(|ord| ord == Ordering::Equal),
        }
    }

    /// Whether `sql_cmp`/`sql_eq` are meaningful between the two column types
    pub fn comparable_types(a: ColumnType, b: ColumnType) -> bool {
        a == b || a == ColumnType::Null || b == ColumnType::Null || (a.is_numeric() && b.is_numeric())
    }

    /// Convert to a JSON value for column-oriented serialization.
    ///
    /// Temporal values become strings; non-finite floats become the strings
    /// `"NaN"`, `"inf"` and `"-inf"` since JSON has no literal for them.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(v) => JsonValue::Bool(*v),
            Value::Int64(v) => JsonValue::from(*v),
            Value::Float64(v) => match serde_json::Number::from_f64(*v) {
                Some(n) => JsonValue::Number(n),
                None => JsonValue::String(format_non_finite(*v).to_string()),
            },
            Value::Utf8(v) => JsonValue::String(v.clone()),
            Value::Date(v) => JsonValue::String(v.format(DATE_FORMAT).to_string()),
            Value::Timestamp(v) => JsonValue::String(v.format(TIMESTAMP_FORMAT).to_string()),
            Value::TimestampTz(v) => {
                JsonValue::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Json(v) => v.clone(),
        }
    }

    /// Read a JSON value back as a value of the given column type.
    ///
    /// JSON `null` is a null cell for every type except `Json`, where it stays a
    /// JSON null (the difference between SQL NULL and the JSON literal `null`).
    pub fn from_json(json: &JsonValue, column_type: ColumnType) -> Result<Value> {
        if json.is_null() && column_type != ColumnType::Json {
            return Ok(Value::Null);
        }
        let mismatch = || {
            Error::InvalidValue(format!(
                "cannot read {} as {}",
                json,
                column_type.name()
            ))
        };
        match column_type {
            ColumnType::Null => Err(mismatch()),
            ColumnType::Boolean => json.as_bool().map(Value::Boolean).ok_or_else(mismatch),
            ColumnType::Int64 => json.as_i64().map(Value::Int64).ok_or_else(mismatch),
            ColumnType::Float64 => match json {
                JsonValue::Number(n) => n.as_f64().map(Value::Float64).ok_or_else(mismatch),
                JsonValue::String(s) => parse_non_finite(s).map(Value::Float64).ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
            ColumnType::Utf8 => json
                .as_str()
                .map(|s| Value::Utf8(s.to_string()))
                .ok_or_else(mismatch),
            ColumnType::Date => {
                let text = json.as_str().ok_or_else(mismatch)?;
                parse_date(text).map(Value::Date)
            }
            ColumnType::Timestamp => {
                let text = json.as_str().ok_or_else(mismatch)?;
                parse_timestamp(text).map(Value::Timestamp)
            }
            ColumnType::TimestampTz => {
                let text = json.as_str().ok_or_else(mismatch)?;
                parse_timestamp_tz(text).map(Value::TimestampTz)
            }
            ColumnType::Json => Ok(Value::Json(json.clone())),
        }
    }
}

/// Float ordering with NaN equal to itself and above every number.
///
/// `-0.0` and `0.0` are equal, matching `==`.
pub(crate) fn cmp_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn format_non_finite(v: f64) -> &'static str {
    if v.is_nan() {
        "NaN"
    } else if v > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn parse_non_finite(text: &str) -> Option<f64> {
    match text {
        "NaN" | "nan" => Some(f64::NAN),
        "inf" | "Infinity" => Some(f64::INFINITY),
        "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

pub(crate) fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| Error::InvalidValue(format!("invalid date '{}': {}", text, e)))
}

pub(crate) fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| Error::InvalidValue(format!("invalid timestamp '{}': {}", text, e)))
}

pub(crate) fn parse_timestamp_tz(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidValue(format!("invalid timestamp with time zone '{}': {}", text, e)))
}

/// Structural equality: null equals null and NaN equals NaN.
///
/// This is the equality used to compare whole tables and to group join keys,
/// not the SQL comparison used by expressions (see `sql_eq`).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => cmp_f64(*a, *b) == Ordering::Equal,
            (Value::Utf8(a), Value::Utf8(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::TimestampTz(a), Value::TimestampTz(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Float64(v) => {
                // keep hashing consistent with eq: one NaN, one zero
                let canonical = if v.is_nan() {
                    f64::NAN
                } else if *v == 0.0 {
                    0.0
                } else {
                    *v
                };
                canonical.to_bits().hash(state)
            }
            Value::Utf8(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Timestamp(v) => v.hash(state),
            Value::TimestampTz(v) => v.hash(state),
            Value::Json(v) => hash_json(v, state),
        }
    }
}

/// Hashes a JSON document so that objects equal as maps hash alike
/// whatever their key order.
fn hash_json<H: Hasher>(value: &JsonValue, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        JsonValue::Null => {}
        JsonValue::Bool(b) => b.hash(state),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => 0.0_f64.to_bits().hash(state),
            Some(f) => f.to_bits().hash(state),
            None => n.to_string().hash(state),
        },
        JsonValue::String(s) => s.hash(state),
        JsonValue::Array(items) => {
            items.len().hash(state);
            for item in items {
                hash_json(item, state);
            }
        }
        JsonValue::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            entries.len().hash(state);
            for (key, item) in entries {
                key.hash(state);
                hash_json(item, state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) if !v.is_finite() => write!(f, "{}", format_non_finite(*v)),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Utf8(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v),
            Value::TimestampTz(v) => write!(f, "{}", v),
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

/// Rust types that map onto exactly one column type
pub trait Scalar: Into<Value> {
    const COLUMN_TYPE: ColumnType;
}

macro_rules! impl_scalar {
    ($t:ty, $variant:ident, $column_type:ident) => {
        impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::$variant(value.into())
            }
        }

        impl Scalar for $t {
            const COLUMN_TYPE: ColumnType = ColumnType::$column_type;
        }
    };
}

impl_scalar!(bool, Boolean, Boolean);
impl_scalar!(i64, Int64, Int64);
impl_scalar!(i32, Int64, Int64);
impl_scalar!(f64, Float64, Float64);
impl_scalar!(String, Utf8, Utf8);
impl_scalar!(NaiveDate, Date, Date);
impl_scalar!(NaiveDateTime, Timestamp, Timestamp);
impl_scalar!(DateTime<Utc>, TimestampTz, TimestampTz);
impl_scalar!(JsonValue, Json, Json);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Utf8(value.to_string())
    }
}

impl Scalar for &str {
    const COLUMN_TYPE: ColumnType = ColumnType::Utf8;
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_not_nan() {
        let nan = Value::Float64(f64::NAN);
        assert!(!nan.is_null());
        assert!(nan.is_nan());
        assert!(Value::Null.is_null());
        assert!(!Value::Null.is_nan());
    }

    #[test]
    fn sql_comparisons_with_null_are_unknown() {
        assert_eq!(Value::Null.sql_eq(&Value::Null), None);
        assert_eq!(Value::Int64(1).sql_cmp(&Value::Null), None);
        assert_eq!(Value::Int64(1).sql_eq(&Value::Float64(1.0)), Some(true));
    }

    #[test]
    fn nan_sorts_last_and_equals_itself() {
        let nan = Value::Float64(f64::NAN);
        assert_eq!(nan.sql_cmp(&Value::Float64(f64::INFINITY)), Some(Ordering::Greater));
        assert_eq!(nan.sql_eq(&Value::Float64(f64::NAN)), Some(true));
        assert_eq!(Value::Float64(-0.0), Value::Float64(0.0));
    }

    #[test]
    fn json_round_trip_keeps_non_finite_floats() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1.5] {
            let json = Value::Float64(v).to_json();
            let back = Value::from_json(&json, ColumnType::Float64).unwrap();
            assert_eq!(back, Value::Float64(v));
        }
    }

    fn hash_of(value: &Value) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn json_objects_hash_alike_regardless_of_key_order() {
        let a: Value = serde_json::json!({"a": 1, "b": {"x": [1, 2], "y": null}}).into();
        let b: Value = serde_json::json!({"b": {"y": null, "x": [1, 2]}, "a": 1}).into();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn json_null_differs_from_sql_null_in_json_columns() {
        let back = Value::from_json(&JsonValue::Null, ColumnType::Json).unwrap();
        assert_eq!(back, Value::Json(JsonValue::Null));
        let back = Value::from_json(&JsonValue::Null, ColumnType::Utf8).unwrap();
        assert_eq!(back, Value::Null);
    }
}
