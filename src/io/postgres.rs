//! PostgreSQL backend
//!
//! The driver is async; this backend owns a small tokio runtime and blocks on
//! it, so it offers the same synchronous [`Backend`] interface as the embedded
//! engine. Tables live in the connection's current schema.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, info, warn};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use tokio::runtime::Runtime;

use crate::config::DatabaseSettings;
use crate::core::column::{Column, ColumnType};
use crate::core::data_value::Value;
use crate::error::{Error, Result};
use crate::io::backend::{check_storable, Backend, BackendKind, TableHandle};
use crate::io::sql_types::{from_postgres_type, postgres_type, quote_ident};
use crate::table::base::Table;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Backend on a PostgreSQL server
pub struct PostgresBackend {
    runtime: Runtime,
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect with the settings' connection string
    ///
    /// The backend blocks on its own runtime, so it must not be opened or used
    /// from async code; inside a tokio runtime this returns
    /// `BackendUnavailable`.
    pub fn connect(settings: &DatabaseSettings) -> Result<Self> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(Error::BackendUnavailable(
                "the postgres backend blocks and cannot be opened inside an async runtime".to_string(),
            ));
        }
        let options = PgConnectOptions::from_str(settings.connection_string())
            .map_err(|e| Error::Config(format!("invalid connection string: {}", e)))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::BackendUnavailable(format!("cannot start runtime: {}", e)))?;
        let pool = runtime
            .block_on(PgPoolOptions::new().max_connections(2).connect_with(options))
            .map_err(|e| Error::BackendUnavailable(format!("cannot connect to {}: {}", settings, e)))?;
        info!("connected to postgres backend at {}", settings);
        Ok(PostgresBackend { runtime, pool })
    }

    fn exists(&self, name: &str) -> Result<bool> {
        let found = self.runtime.block_on(
            sqlx::query(
                "SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1",
            )
            .bind(name)
            .fetch_optional(&self.pool),
        )?;
        Ok(found.is_some())
    }
}

impl Backend for PostgresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn create_table(&mut self, name: &str, table: &Table, overwrite: bool) -> Result<TableHandle> {
        check_storable(name, table)?;
        let replacing = self.exists(name)?;
        if replacing && !overwrite {
            return Err(Error::TableExists(name.to_string()));
        }
        if replacing {
            warn!("overwriting table '{}' in the postgres backend", name);
        }

        let definitions: Vec<String> = table
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name()), postgres_type(c.column_type())))
            .collect();
        let names: Vec<String> = table.columns().iter().map(|c| quote_ident(c.name())).collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("${}", i)).collect();
        let create = format!("CREATE TABLE {} ({})", quote_ident(name), definitions.join(", "));
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(name),
            names.join(", "),
            placeholders.join(", ")
        );

        self.runtime.block_on(async {
            let mut tx = self.pool.begin().await?;
            if replacing {
                sqlx::query(&format!("DROP TABLE {}", quote_ident(name)))
                    .execute(&mut *tx)
                    .await?;
            }
            sqlx::query(&create).execute(&mut *tx).await?;
            for row in table.rows() {
                let mut query = sqlx::query(&insert);
                for column in table.columns() {
                    query = bind_value(query, &column.values()[row.index()], column.column_type());
                }
                query.execute(&mut *tx).await?;
            }
            tx.commit().await?;
            Ok::<(), Error>(())
        })?;

        info!(
            "created table '{}' ({} rows x {} columns) in the postgres backend",
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
        let rows = self.runtime.block_on(
            sqlx::query(
                "SELECT column_name::TEXT AS column_name, data_type::TEXT AS data_type \
                 FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 ORDER BY ordinal_position",
            )
            .bind(name)
            .fetch_all(&self.pool),
        )?;
        if rows.is_empty() {
            return Err(Error::TableNotFound(name.to_string()));
        }
        let mut schema = Vec::with_capacity(rows.len());
        for row in &rows {
            let column: String = row.try_get("column_name")?;
            let data_type: String = row.try_get("data_type")?;
            schema.push((column, from_postgres_type(&data_type)?));
        }
        Ok(TableHandle::new(name, schema))
    }

    fn materialize(&self, handle: &TableHandle) -> Result<Table> {
        if !self.exists(handle.name())? {
            return Err(Error::TableNotFound(handle.name().to_string()));
        }
        // cast so narrower server types (INTEGER, REAL, JSON) decode as the logical type
        let selected: Vec<String> = handle
            .schema()
            .iter()
            .map(|(name, column_type)| {
                format!("{}::{}", quote_ident(name), postgres_type(*column_type))
            })
            .collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY ctid",
            selected.join(", "),
            quote_ident(handle.name())
        );
        let rows = self.runtime.block_on(sqlx::query(&sql).fetch_all(&self.pool))?;

        let mut columns = Vec::with_capacity(handle.schema().len());
        for (position, (name, column_type)) in handle.schema().iter().enumerate() {
            // a column stored without any typed values comes back as text
            let read_type = match column_type {
                ColumnType::Null => ColumnType::Utf8,
                other => *other,
            };
            let values = rows
                .iter()
                .map(|row| decode(row, position, read_type))
                .collect::<Result<Vec<_>>>()?;
            columns.push(Column::new(name.as_str(), read_type, values)?);
        }
        let table = Table::from_columns(columns)?;
        debug!(
            "materialized '{}' from the postgres backend: {} rows",
            handle.name(),
            table.row_count()
        );
        Ok(table)
    }

    fn drop_table(&mut self, name: &str) -> Result<()> {
        if !self.exists(name)? {
            return Err(Error::TableNotFound(name.to_string()));
        }
        let sql = format!("DROP TABLE {}", quote_ident(name));
        self.runtime.block_on(sqlx::query(&sql).execute(&self.pool))?;
        info!("dropped table '{}' from the postgres backend", name);
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self.runtime.block_on(
            sqlx::query(
                "SELECT table_name::TEXT AS table_name FROM information_schema.tables \
                 WHERE table_schema = current_schema() ORDER BY table_name",
            )
            .fetch_all(&self.pool),
        )?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(Error::from))
            .collect()
    }
}

fn bind_value<'q>(query: PgQuery<'q>, value: &Value, column_type: ColumnType) -> PgQuery<'q> {
    match (value, column_type) {
        (Value::Boolean(b), _) => query.bind(*b),
        (Value::Int64(i), _) => query.bind(*i),
        (Value::Float64(f), _) => query.bind(*f),
        (Value::Utf8(s), _) => query.bind(s.clone()),
        (Value::Date(d), _) => query.bind(*d),
        (Value::Timestamp(t), _) => query.bind(*t),
        (Value::TimestampTz(t), _) => query.bind(*t),
        (Value::Json(j), _) => query.bind(j.clone()),
        (Value::Null, ColumnType::Boolean) => query.bind(None::<bool>),
        (Value::Null, ColumnType::Int64) => query.bind(None::<i64>),
        (Value::Null, ColumnType::Float64) => query.bind(None::<f64>),
        (Value::Null, ColumnType::Date) => query.bind(None::<NaiveDate>),
        (Value::Null, ColumnType::Timestamp) => query.bind(None::<NaiveDateTime>),
        (Value::Null, ColumnType::TimestampTz) => query.bind(None::<DateTime<Utc>>),
        (Value::Null, ColumnType::Json) => query.bind(None::<JsonValue>),
        (Value::Null, ColumnType::Null | ColumnType::Utf8) => query.bind(None::<String>),
    }
}

fn decode(row: &PgRow, position: usize, column_type: ColumnType) -> Result<Value> {
    let value: Value = match column_type {
        ColumnType::Boolean => row.try_get::<Option<bool>, _>(position)?.into(),
        ColumnType::Int64 => row.try_get::<Option<i64>, _>(position)?.into(),
        ColumnType::Float64 => row.try_get::<Option<f64>, _>(position)?.into(),
        ColumnType::Null | ColumnType::Utf8 => row.try_get::<Option<String>, _>(position)?.into(),
        ColumnType::Date => row.try_get::<Option<NaiveDate>, _>(position)?.into(),
        ColumnType::Timestamp => row.try_get::<Option<NaiveDateTime>, _>(position)?.into(),
        ColumnType::TimestampTz => row.try_get::<Option<DateTime<Utc>>, _>(position)?.into(),
        ColumnType::Json => row.try_get::<Option<JsonValue>, _>(position)?.into(),
    };
    Ok(value)
}
