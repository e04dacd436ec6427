pub mod backend;
pub mod embedded;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sql_types;

// Re-export commonly used items
pub use backend::{connect, connect_tag, Backend, BackendKind, TableHandle};
pub use embedded::EmbeddedBackend;
#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
