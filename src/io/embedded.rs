//! Embedded in-process engine
//!
//! Tables live in a SQLite database, in memory unless a file is given. The
//! engine's own column affinities are too loose to bring types back, so every
//! stored table is recorded in a catalog table with the logical type of each
//! column. NaN is stored as the text `'NaN'` because the engine turns a NaN
//! real into NULL.

use std::path::Path;

use chrono::SecondsFormat;
use log::{debug, info, warn};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::core::column::{Column, ColumnType};
use crate::core::data_value::{
    parse_date, parse_timestamp, parse_timestamp_tz, Value, DATE_FORMAT, TIMESTAMP_FORMAT,
};
use crate::error::{Error, Result};
use crate::io::backend::{check_storable, Backend, BackendKind, TableHandle};
use crate::io::sql_types::{embedded_type, quote_ident};
use crate::table::base::Table;

const CATALOG: &str = "__asofframe_schema";

/// Backend running on an in-process SQLite connection
pub struct EmbeddedBackend {
    conn: Connection,
}

impl EmbeddedBackend {
    /// Fresh, empty in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::BackendUnavailable(format!("cannot open in-memory database: {}", e)))?;
        info!("opened in-memory embedded backend");
        EmbeddedBackend::with_connection(conn)
    }

    /// Database stored in a file, created if missing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            Error::BackendUnavailable(format!("cannot open database {}: {}", path.display(), e))
        })?;
        info!("opened embedded backend at {}", path.display());
        EmbeddedBackend::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                table_name TEXT NOT NULL,
                column_name TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                column_type TEXT NOT NULL,
                PRIMARY KEY (table_name, ordinal)
            )",
            CATALOG
        ))?;
        Ok(EmbeddedBackend { conn })
    }

    fn exists(&self, name: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE table_name = ?1 LIMIT 1", CATALOG),
                params![name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn schema(&self, name: &str) -> Result<Vec<(String, ColumnType)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT column_name, column_type FROM {} WHERE table_name = ?1 ORDER BY ordinal",
            CATALOG
        ))?;
        let rows = stmt.query_map(params![name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut schema = Vec::new();
        for row in rows {
            let (column, type_name) = row?;
            schema.push((column, type_name.parse()?));
        }
        Ok(schema)
    }
}

impl Backend for EmbeddedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Embedded
    }

    fn create_table(&mut self, name: &str, table: &Table, overwrite: bool) -> Result<TableHandle> {
        check_storable(name, table)?;
        let replacing = self.exists(name)?;
        if replacing && !overwrite {
            return Err(Error::TableExists(name.to_string()));
        }

        let tx = self.conn.transaction()?;
        if replacing {
            warn!("overwriting table '{}' in the embedded backend", name);
            tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)), [])?;
            tx.execute(
                &format!("DELETE FROM {} WHERE table_name = ?1", CATALOG),
                params![name],
            )?;
        }

        let definitions: Vec<String> = table
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name()), embedded_type(c.column_type())))
            .collect();
        tx.execute(
            &format!("CREATE TABLE {} ({})", quote_ident(name), definitions.join(", ")),
            [],
        )?;
        for (ordinal, column) in table.columns().iter().enumerate() {
            tx.execute(
                &format!(
                    "INSERT INTO {} (table_name, column_name, ordinal, column_type) VALUES (?1, ?2, ?3, ?4)",
                    CATALOG
                ),
                params![name, column.name(), ordinal as i64, column.column_type().name()],
            )?;
        }

        {
            let names: Vec<String> = table.columns().iter().map(|c| quote_ident(c.name())).collect();
            let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(name),
                names.join(", "),
                placeholders.join(", ")
            ))?;
            for row in table.rows() {
                let values = table.columns().iter().map(|c| encode(&c.values()[row.index()]));
                insert.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        info!(
            "created table '{}' ({} rows x {} columns) in the embedded backend",
            name,
            table.row_count(),
            table.column_count()
        );
        Ok(TableHandle::new(
            name,
            table
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), c.column_type()))
                .collect(),
        ))
    }

    fn table(&self, name: &str) -> Result<TableHandle> {
        let schema = self.schema(name)?;
        if schema.is_empty() {
            return Err(Error::TableNotFound(name.to_string()));
        }
        Ok(TableHandle::new(name, schema))
    }

    fn materialize(&self, handle: &TableHandle) -> Result<Table> {
        if !self.exists(handle.name())? {
            return Err(Error::TableNotFound(handle.name().to_string()));
        }
        let names: Vec<String> = handle.column_names().iter().map(|n| quote_ident(n)).collect();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY rowid",
            names.join(", "),
            quote_ident(handle.name())
        ))?;

        let schema = handle.schema();
        let mut values: Vec<Vec<Value>> = vec![Vec::new(); schema.len()];
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (position, (column, column_type)) in schema.iter().enumerate() {
                let value = decode(row.get_ref(position)?, *column_type)
                    .map_err(|e| Error::Backend(format!("column '{}': {}", column, e)))?;
                values[position].push(value);
            }
        }

        let columns = schema
            .iter()
            .zip(values)
            .map(|((name, column_type), values)| Column::new(name.as_str(), *column_type, values))
            .collect::<Result<Vec<_>>>()?;
        let table = Table::from_columns(columns)?;
        debug!(
            "materialized '{}' from the embedded backend: {} rows",
            handle.name(),
            table.row_count()
        );
        Ok(table)
    }

    fn drop_table(&mut self, name: &str) -> Result<()> {
        if !self.exists(name)? {
            return Err(Error::TableNotFound(name.to_string()));
        }
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)), [])?;
        tx.execute(
            &format!("DELETE FROM {} WHERE table_name = ?1", CATALOG),
            params![name],
        )?;
        tx.commit()?;
        info!("dropped table '{}' from the embedded backend", name);
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT table_name FROM {} ORDER BY table_name",
            CATALOG
        ))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }
}

fn encode(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Integer(*b as i64),
        Value::Int64(i) => SqlValue::Integer(*i),
        Value::Float64(f) if f.is_nan() => SqlValue::Text("NaN".to_string()),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::Utf8(s) => SqlValue::Text(s.clone()),
        Value::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
        Value::Timestamp(t) => SqlValue::Text(t.format(TIMESTAMP_FORMAT).to_string()),
        Value::TimestampTz(t) => SqlValue::Text(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Json(j) => SqlValue::Text(j.to_string()),
    }
}

fn decode(value: ValueRef<'_>, column_type: ColumnType) -> Result<Value> {
    let decoded = match (column_type, value) {
        (_, ValueRef::Null) => Value::Null,
        (ColumnType::Boolean, ValueRef::Integer(i)) => Value::Boolean(i != 0),
        (ColumnType::Int64, ValueRef::Integer(i)) => Value::Int64(i),
        (ColumnType::Float64, ValueRef::Real(f)) => Value::Float64(f),
        (ColumnType::Float64, ValueRef::Integer(i)) => Value::Float64(i as f64),
        (ColumnType::Float64, ValueRef::Text(b"NaN")) => Value::Float64(f64::NAN),
        (ColumnType::Utf8, ValueRef::Text(bytes)) => Value::Utf8(text(bytes)?.to_string()),
        (ColumnType::Date, ValueRef::Text(bytes)) => Value::Date(parse_date(text(bytes)?)?),
        (ColumnType::Timestamp, ValueRef::Text(bytes)) => {
            Value::Timestamp(parse_timestamp(text(bytes)?)?)
        }
        (ColumnType::TimestampTz, ValueRef::Text(bytes)) => {
            Value::TimestampTz(parse_timestamp_tz(text(bytes)?)?)
        }
        (ColumnType::Json, ValueRef::Text(bytes)) => Value::Json(serde_json::from_str(text(bytes)?)?),
        (column_type, other) => {
            return Err(Error::InvalidValue(format!(
                "cannot read stored {} as {}",
                other.data_type(),
                column_type
            )))
        }
    };
    Ok(decoded)
}

fn text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::InvalidValue(format!("invalid UTF-8 text: {}", e)))
}
