//! JSON forms of a table
//!
//! Two layouts are supported. The typed layout carries each column's type and
//! round-trips every value, including nulls, NaN and timestamps:
//!
//! ```json
//! {"columns": [{"name": "time", "type": "timestamp", "values": ["1989-01-01 00:00:00"]}]}
//! ```
//!
//! The column-object layout is the plain `{"name": [values...]}` shape; types
//! are inferred from the JSON values when no schema is given.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::core::column::{Column, ColumnType};
use crate::core::data_value::Value;
use crate::error::{Error, Result};
use crate::table::base::Table;

#[derive(Debug, Serialize, Deserialize)]
struct TableRecord {
    columns: Vec<ColumnRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnRecord {
    name: String,
    #[serde(rename = "type")]
    column_type: ColumnType,
    values: Vec<JsonValue>,
}

impl Table {
    /// Serialize to the typed JSON layout
    pub fn to_json_string(&self) -> Result<String> {
        let record = TableRecord {
            columns: self
                .columns()
                .iter()
                .map(|c| ColumnRecord {
                    name: c.name().to_string(),
                    column_type: c.column_type(),
                    values: c.values().iter().map(Value::to_json).collect(),
                })
                .collect(),
        };
        Ok(serde_json::to_string(&record)?)
    }

    /// Parse the typed JSON layout
    pub fn from_json_str(text: &str) -> Result<Table> {
        let record: TableRecord = serde_json::from_str(text)?;
        let columns = record
            .columns
            .into_iter()
            .map(|c| {
                let values = c
                    .values
                    .iter()
                    .map(|v| Value::from_json(v, c.column_type))
                    .collect::<Result<Vec<_>>>()?;
                Column::new(c.name, c.column_type, values)
            })
            .collect::<Result<Vec<_>>>()?;
        Table::from_columns(columns)
    }

    /// Column-object layout, `{"name": [values...]}`, in column order
    pub fn to_column_object(&self) -> JsonValue {
        let mut map = Map::new();
        for column in self.columns() {
            map.insert(
                column.name().to_string(),
                JsonValue::Array(column.values().iter().map(Value::to_json).collect()),
            );
        }
        JsonValue::Object(map)
    }

    /// Build a table from the column-object layout.
    ///
    /// Columns listed in `schema` are read with that type; the others are
    /// inferred (booleans, integers, floats, strings, and JSON for nested
    /// values). Strings are never guessed to be dates or timestamps.
    pub fn from_column_object(json: &JsonValue, schema: &[(&str, ColumnType)]) -> Result<Table> {
        let object = json.as_object().ok_or_else(|| {
            Error::InvalidInput("expected a JSON object of column arrays".to_string())
        })?;
        let mut table = Table::new();
        for (name, values) in object {
            let values = values.as_array().ok_or_else(|| {
                Error::InvalidInput(format!("column '{}' is not a JSON array", name))
            })?;
            let column_type = match schema.iter().find(|(n, _)| *n == name.as_str()) {
                Some((_, t)) => *t,
                None => infer_json_type(name, values)?,
            };
            let values = values
                .iter()
                .map(|v| Value::from_json(v, column_type))
                .collect::<Result<Vec<_>>>()?;
            table.add_column(Column::new(name.as_str(), column_type, values)?)?;
        }
        Ok(table)
    }
}

fn infer_json_type(name: &str, values: &[JsonValue]) -> Result<ColumnType> {
    let mut column_type = ColumnType::Null;
    for value in values {
        let found = match value {
            JsonValue::Null => continue,
            JsonValue::Bool(_) => ColumnType::Boolean,
            JsonValue::Number(n) if n.is_i64() => ColumnType::Int64,
            JsonValue::Number(_) => ColumnType::Float64,
            JsonValue::String(_) => ColumnType::Utf8,
            JsonValue::Array(_) | JsonValue::Object(_) => ColumnType::Json,
        };
        column_type = crate::core::column::merge_types(name, column_type, found)?;
    }
    Ok(column_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn typed_layout_round_trips() {
        let time = NaiveDate::from_ymd_opt(1989, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let table = Table::from_columns(vec![
            Column::from_vec("time", vec![time]),
            Column::from_options("value", vec![Some(f64::NAN)]),
            Column::from_options::<String>("name", vec![None]),
        ])
        .unwrap();
        let text = table.to_json_string().unwrap();
        assert_eq!(Table::from_json_str(&text).unwrap(), table);
    }

    #[test]
    fn column_object_infers_and_keeps_order() {
        let json = json!({"id": [1, null, 3], "score": [1, 2.5, null], "tag": ["a", "b", "c"]});
        let table = Table::from_column_object(&json, &[]).unwrap();
        assert_eq!(table.column_names(), vec!["id", "score", "tag"]);
        assert_eq!(table.column("id").unwrap().column_type(), ColumnType::Int64);
        assert_eq!(table.column("score").unwrap().column_type(), ColumnType::Float64);
        assert_eq!(table.to_column_object()["id"], json!([1, null, 3]));
    }

    #[test]
    fn column_object_uses_schema_for_temporal_columns() {
        let json = json!({"day": ["2023-01-01", null]});
        let table = Table::from_column_object(&json, &[("day", ColumnType::Date)]).unwrap();
        assert_eq!(table.column("day").unwrap().column_type(), ColumnType::Date);
        assert!(table.column("day").unwrap().is_null(1));
    }
}
