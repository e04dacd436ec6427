// Table implementation modules
pub mod base;
pub mod query;
pub mod serialize;
pub mod sort;
pub mod transform;

pub use base::{RowRef, Table};
pub use query::{coalesce, col, left, lit, right, BinaryOp, Expr, SchemaScope, Scope, UnaryOp};
pub use sort::SortKey;
