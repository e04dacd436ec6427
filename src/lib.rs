//! Typed in-memory tables with a backward as-of join evaluator.
//!
//! The evaluator in [`join::asof`] is the reference for what an as-of join
//! should return; the [`io`] backends store and materialize tables so that
//! engine results can be compared against it.

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod join;
pub mod table;

// Re-export commonly used types
pub use config::{ConnectionParams, DatabaseSettings};
pub use crate::core::{Column, ColumnType, Scalar, Value};
pub use error::{Error, Result};
pub use io::{connect, Backend, BackendKind, EmbeddedBackend, TableHandle};
pub use join::{asof_join, equi_join, ChainSuffix, JoinChain, JoinHow, JoinSpec, Suffix};
pub use table::{col, left, lit, right, Expr, SortKey, Table};
