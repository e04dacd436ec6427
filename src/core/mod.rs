// Core data structures shared by tables, joins and backends
pub mod column;
pub mod data_value;

pub use column::{Column, ColumnType};
pub use data_value::{Scalar, Value};
