//! Column type mapping between tables and SQL engines

use crate::core::column::ColumnType;
use crate::error::{Error, Result};

/// Quote an identifier for either engine (`"name"`, inner quotes doubled)
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Declared column type in the embedded engine.
///
/// The engine only has storage classes, so temporal and JSON values are kept
/// as text and the logical type lives in the schema catalog.
pub fn embedded_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Boolean | ColumnType::Int64 => "INTEGER",
        ColumnType::Float64 => "REAL",
        ColumnType::Null
        | ColumnType::Utf8
        | ColumnType::Date
        | ColumnType::Timestamp
        | ColumnType::TimestampTz
        | ColumnType::Json => "TEXT",
    }
}

/// Declared column type on a PostgreSQL server.
///
/// A column with no values of any type is created as `TEXT`.
pub fn postgres_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::Int64 => "BIGINT",
        ColumnType::Float64 => "DOUBLE PRECISION",
        ColumnType::Null | ColumnType::Utf8 => "TEXT",
        ColumnType::Date => "DATE",
        ColumnType::Timestamp => "TIMESTAMP",
        ColumnType::TimestampTz => "TIMESTAMPTZ",
        ColumnType::Json => "JSONB",
    }
}

/// Map an `information_schema.columns.data_type` value back to a column type
pub fn from_postgres_type(data_type: &str) -> Result<ColumnType> {
    let column_type = match data_type.to_ascii_lowercase().as_str() {
        "boolean" => ColumnType::Boolean,
        "smallint" | "integer" | "bigint" => ColumnType::Int64,
        "real" | "double precision" => ColumnType::Float64,
        "text" | "character varying" | "character" | "name" => ColumnType::Utf8,
        "date" => ColumnType::Date,
        "timestamp without time zone" => ColumnType::Timestamp,
        "timestamp with time zone" => ColumnType::TimestampTz,
        "json" | "jsonb" => ColumnType::Json,
        other => {
            return Err(Error::Backend(format!(
                "unsupported PostgreSQL column type '{}'",
                other
            )))
        }
    };
    Ok(column_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_quotes() {
        assert_eq!(quote_ident("time"), "\"time\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn postgres_types_map_back() {
        for column_type in [
            ColumnType::Boolean,
            ColumnType::Int64,
            ColumnType::Float64,
            ColumnType::Utf8,
            ColumnType::Date,
            ColumnType::Timestamp,
            ColumnType::TimestampTz,
            ColumnType::Json,
        ] {
            let declared = match postgres_type(column_type) {
                "BIGINT" => "bigint",
                "DOUBLE PRECISION" => "double precision",
                "TIMESTAMP" => "timestamp without time zone",
                "TIMESTAMPTZ" => "timestamp with time zone",
                other => other,
            }
            .to_lowercase();
            assert_eq!(from_postgres_type(&declared).unwrap(), column_type);
        }
        assert!(from_postgres_type("bytea").is_err());
    }
}
