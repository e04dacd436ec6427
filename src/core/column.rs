use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::data_value::{Scalar, Value};
use crate::error::{Error, Result};

/// Logical type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Only nulls, no declared type
    Null,
    Boolean,
    Int64,
    Float64,
    Utf8,
    Date,
    Timestamp,
    TimestampTz,
    Json,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Null => "null",
            ColumnType::Boolean => "boolean",
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::Utf8 => "utf8",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampTz => "timestamptz",
            ColumnType::Json => "json",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int64 | ColumnType::Float64)
    }

    /// Whether values of this type have a total order usable as an as-of key
    pub fn is_orderable(&self) -> bool {
        matches!(
            self,
            ColumnType::Int64
                | ColumnType::Float64
                | ColumnType::Utf8
                | ColumnType::Date
                | ColumnType::Timestamp
                | ColumnType::TimestampTz
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "null" => Ok(ColumnType::Null),
            "bool" | "boolean" => Ok(ColumnType::Boolean),
            "int" | "int64" | "integer" | "bigint" => Ok(ColumnType::Int64),
            "float" | "float64" | "double" => Ok(ColumnType::Float64),
            "str" | "string" | "utf8" | "text" => Ok(ColumnType::Utf8),
            "date" => Ok(ColumnType::Date),
            "timestamp" | "datetime" => Ok(ColumnType::Timestamp),
            "timestamptz" => Ok(ColumnType::TimestampTz),
            "json" | "jsonb" => Ok(ColumnType::Json),
            other => Err(Error::InvalidInput(format!("unknown column type '{}'", other))),
        }
    }
}

/// A named, typed sequence of nullable values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Create a column of a declared type; every value must be null or of that type
    pub fn new(name: impl Into<String>, column_type: ColumnType, values: Vec<Value>) -> Result<Self> {
        let name = name.into();
        for value in &values {
            check_value_type(&name, column_type, value)?;
        }
        Ok(Column {
            name,
            column_type,
            values,
        })
    }

    /// Create a column whose type is taken from its first non-null value.
    ///
    /// Integers mixed with floats are widened to `Float64`; any other mix is an
    /// error. A column with no non-null values gets `ColumnType::Null`.
    pub fn from_values(name: impl Into<String>, values: Vec<Value>) -> Result<Self> {
        let name = name.into();
        let column_type = infer_column_type(&name, &values)?;
        let values = if column_type == ColumnType::Float64 {
            values
                .into_iter()
                .map(|v| match v {
                    Value::Int64(i) => Value::Float64(i as f64),
                    other => other,
                })
                .collect()
        } else {
            values
        };
        Ok(Column {
            name,
            column_type,
            values,
        })
    }

    /// Build a column from plain Rust values
    pub fn from_vec<T: Scalar>(name: impl Into<String>, values: Vec<T>) -> Self {
        Column {
            name: name.into(),
            column_type: T::COLUMN_TYPE,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a column from optional Rust values, `None` becoming null
    pub fn from_options<T: Scalar>(name: impl Into<String>, values: Vec<Option<T>>) -> Self {
        Column {
            name: name.into(),
            column_type: T::COLUMN_TYPE,
            values: values.into_iter().map(Value::from).collect(),
        }
    }

    /// A column of `len` nulls
    pub fn nulls(name: impl Into<String>, column_type: ColumnType, len: usize) -> Self {
        Column {
            name: name.into(),
            column_type,
            values: vec![Value::Null; len],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.values.get(index).map_or(false, Value::is_null)
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append a value, checking its type
    pub fn push(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        check_value_type(&self.name, self.column_type, &value)?;
        self.values.push(value);
        Ok(())
    }

    /// Gather rows by position; `None` positions produce nulls.
    ///
    /// Callers pass indices they obtained from this column's own table, so an
    /// out-of-range index is reported rather than silently nulled.
    pub fn take(&self, indices: &[Option<usize>]) -> Result<Column> {
        let mut values = Vec::with_capacity(indices.len());
        for index in indices {
            match index {
                Some(i) => {
                    let value = self.values.get(*i).ok_or(Error::IndexOutOfBounds {
                        index: *i,
                        size: self.values.len(),
                    })?;
                    values.push(value.clone());
                }
                None => values.push(Value::Null),
            }
        }
        Ok(Column {
            name: self.name.clone(),
            column_type: self.column_type,
            values,
        })
    }

    /// Concatenate another column of a compatible type onto this one
    pub fn extend(&mut self, other: &Column) -> Result<()> {
        let merged = merge_types(&self.name, self.column_type, other.column_type)?;
        if merged != self.column_type {
            for value in self.values.iter_mut() {
                *value = widen(std::mem::replace(value, Value::Null), merged);
            }
            self.column_type = merged;
        }
        self.values
            .extend(other.values.iter().cloned().map(|v| widen(v, merged)));
        Ok(())
    }
}

fn check_value_type(name: &str, column_type: ColumnType, value: &Value) -> Result<()> {
    let found = value.column_type();
    if found == ColumnType::Null || found == column_type {
        Ok(())
    } else {
        Err(Error::ColumnTypeMismatch {
            name: name.to_string(),
            expected: column_type,
            found,
        })
    }
}

fn infer_column_type(name: &str, values: &[Value]) -> Result<ColumnType> {
    let mut column_type = ColumnType::Null;
    for value in values {
        column_type = merge_types(name, column_type, value.column_type())?;
    }
    Ok(column_type)
}

/// Common type of two columns, if there is one
pub(crate) fn merge_types(name: &str, a: ColumnType, b: ColumnType) -> Result<ColumnType> {
    match (a, b) {
        (a, b) if a == b => Ok(a),
        (ColumnType::Null, other) | (other, ColumnType::Null) => Ok(other),
        (ColumnType::Int64, ColumnType::Float64) | (ColumnType::Float64, ColumnType::Int64) => {
            Ok(ColumnType::Float64)
        }
        (expected, found) => Err(Error::ColumnTypeMismatch {
            name: name.to_string(),
            expected,
            found,
        }),
    }
}

fn widen(value: Value, target: ColumnType) -> Value {
    match (value, target) {
        (Value::Int64(i), ColumnType::Float64) => Value::Float64(i as f64),
        (other, _) => other,
    }
}
