use thiserror::Error;

use crate::core::column::ColumnType;

/// Error type shared by tables, joins, settings and backends
#[derive(Error, Debug)]
pub enum Error {
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("column type mismatch: column {name}, expected {expected:?}, found {found:?}")]
    ColumnTypeMismatch {
        name: String,
        expected: ColumnType,
        found: ColumnType,
    },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table already exists: {0}")]
    TableExists(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("duplicate column name: {0}")]
    DuplicateColumnName(String),

    #[error("inconsistent row count: expected {expected}, found {found}")]
    InconsistentRowCount { expected: usize, found: usize },

    #[error("index out of bounds: index {index}, size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error")]
    Io(#[source] std::io::Error),

    #[error("JSON error")]
    Json(#[source] serde_json::Error),

    #[error("TOML error")]
    Toml(#[source] toml::de::Error),

    #[error("URL error")]
    Url(#[source] url::ParseError),

    #[error("embedded engine error")]
    Sqlite(#[source] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("postgres error")]
    Postgres(#[source] sqlx::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Url(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Sqlite(err)
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Postgres(err)
    }
}
