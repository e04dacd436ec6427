//! Storage backends
//!
//! A [`Backend`] stores tables under a name and materializes them back into
//! memory. Two engines are available: an embedded in-process engine that
//! needs no setup, and a PostgreSQL server (feature `postgres`).

use std::fmt;
use std::str::FromStr;

use crate::config::DatabaseSettings;
use crate::core::column::ColumnType;
use crate::error::{Error, Result};
use crate::io::embedded::EmbeddedBackend;
use crate::table::base::Table;

/// Which engine a backend runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process engine, addressed as `"duckdb"`
    Embedded,
    /// Networked PostgreSQL server, addressed as `"postgres"`
    Postgres,
}

impl BackendKind {
    pub fn tag(&self) -> &'static str {
        match self {
            BackendKind::Embedded => "duckdb",
            BackendKind::Postgres => "postgres",
        }
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "duckdb" | "embedded" => Ok(BackendKind::Embedded),
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            other => Err(Error::UnsupportedBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A stored table: its name and the schema it had when the handle was taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    name: String,
    schema: Vec<(String, ColumnType)>,
}

impl TableHandle {
    pub fn new(name: impl Into<String>, schema: Vec<(String, ColumnType)>) -> Self {
        TableHandle {
            name: name.into(),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &[(String, ColumnType)] {
        &self.schema
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Table storage capability shared by every engine
pub trait Backend: Send {
    fn kind(&self) -> BackendKind;

    /// Store `table` under `name`.
    ///
    /// An existing table of that name is replaced when `overwrite` is set and
    /// is an error (`TableExists`) otherwise.
    fn create_table(&mut self, name: &str, table: &Table, overwrite: bool) -> Result<TableHandle>;

    /// Look up a stored table
    fn table(&self, name: &str) -> Result<TableHandle>;

    /// Read a stored table back into memory, with the handle's schema
    fn materialize(&self, handle: &TableHandle) -> Result<Table>;

    fn drop_table(&mut self, name: &str) -> Result<()>;

    /// Names of the stored tables, sorted
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Store `table`, replacing any table of the same name
    fn write_table(&mut self, name: &str, table: &Table) -> Result<TableHandle> {
        self.create_table(name, table, true)
    }

    /// Look up and materialize in one step
    fn read_table(&self, name: &str) -> Result<Table> {
        let handle = self.table(name)?;
        self.materialize(&handle)
    }
}

/// Open a backend of the given kind.
///
/// The embedded engine ignores `settings`; it starts empty and in memory.
pub fn connect(kind: BackendKind, settings: &DatabaseSettings) -> Result<Box<dyn Backend>> {
    match kind {
        BackendKind::Embedded => Ok(Box::new(EmbeddedBackend::open_in_memory()?)),
        BackendKind::Postgres => connect_postgres(settings),
    }
}

/// Open a backend from its tag (`"duckdb"` or `"postgres"`)
pub fn connect_tag(tag: &str, settings: &DatabaseSettings) -> Result<Box<dyn Backend>> {
    connect(tag.parse()?, settings)
}

#[cfg(feature = "postgres")]
fn connect_postgres(settings: &DatabaseSettings) -> Result<Box<dyn Backend>> {
    Ok(Box::new(crate::io::postgres::PostgresBackend::connect(settings)?))
}

#[cfg(not(feature = "postgres"))]
fn connect_postgres(_settings: &DatabaseSettings) -> Result<Box<dyn Backend>> {
    Err(Error::BackendUnavailable(
        "built without the `postgres` feature".to_string(),
    ))
}

/// Check that every column of a table can be stored, before touching the engine
pub(crate) fn check_storable(name: &str, table: &Table) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("table name must not be empty".to_string()));
    }
    if table.column_count() == 0 {
        return Err(Error::InvalidInput(format!(
            "table '{}' has no columns to store",
            name
        )));
    }
    Ok(())
}
