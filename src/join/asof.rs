//! Backward as-of join
//!
//! Every left row is matched with at most one right row: among the right rows
//! whose temporal key is not greater than the left row's, that agree on all
//! equality keys and satisfy all predicates, the one with the greatest key.
//! Rows without such a candidate keep their place with nulls on the right.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::debug;

use crate::core::column::{Column, ColumnType};
use crate::core::data_value::Value;
use crate::error::{Error, Result};
use crate::join::naming::{ColumnNamer, Suffix};
use crate::table::base::Table;
use crate::table::query::{Expr, SchemaScope, Scope};

/// An equality key, possibly named differently on each side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityKey {
    pub left: String,
    pub right: String,
}

/// Description of one as-of join
#[derive(Debug, Clone)]
pub struct JoinSpec {
    key: String,
    equality_keys: Vec<EqualityKey>,
    predicates: Vec<Expr>,
    order_by: Vec<String>,
    suffix: Suffix,
    keep_right_keys: bool,
}

impl JoinSpec {
    /// Join on the temporal column `key`, present on both sides
    pub fn new(key: impl Into<String>) -> Self {
        JoinSpec {
            key: key.into(),
            equality_keys: Vec::new(),
            predicates: Vec::new(),
            order_by: Vec::new(),
            suffix: Suffix::Escalating,
            keep_right_keys: false,
        }
    }

    /// Also require equality on a column with the same name on both sides
    pub fn on(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.on_renamed(name.clone(), name)
    }

    /// Also require `left[left_name] == right[right_name]`
    pub fn on_renamed(mut self, left_name: impl Into<String>, right_name: impl Into<String>) -> Self {
        self.equality_keys.push(EqualityKey {
            left: left_name.into(),
            right: right_name.into(),
        });
        self
    }

    /// Also require a predicate over the left and right rows
    pub fn predicate(mut self, predicate: Expr) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Sort the output by this column (repeatable; earlier calls sort first)
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(column.into());
        self
    }

    /// Replace the escalating `_right` suffix with a fixed token
    pub fn suffix(mut self, token: impl Into<String>) -> Self {
        self.suffix = Suffix::Token(token.into());
        self
    }

    /// Keep the right-side equality-key columns (suffixed) in the output
    pub fn keep_right_keys(mut self, keep: bool) -> Self {
        self.keep_right_keys = keep;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

#[derive(Debug)]
struct OutputColumn {
    name: String,
    side: Side,
    position: usize,
}

/// Join spec checked against two concrete tables
struct BoundJoin<'a> {
    spec: &'a JoinSpec,
    left_key: &'a Column,
    right_key: &'a Column,
    left_eq: Vec<&'a Column>,
    right_eq: Vec<&'a Column>,
    layout: Vec<OutputColumn>,
}

/// Run a backward as-of join of `left` against `right`
pub fn asof_join(left: &Table, right: &Table, spec: &JoinSpec) -> Result<Table> {
    let bound = BoundJoin::bind(left, right, spec)?;
    let matches = bound.match_rows(left, right)?;
    debug!(
        "asof join on '{}' with {} equality keys and {} predicates matched {} of {} rows",
        spec.key,
        spec.equality_keys.len(),
        spec.predicates.len(),
        matches.iter().filter(|m| m.is_some()).count(),
        matches.len()
    );
    let output = bound.assemble(left, right, &matches)?;
    if spec.order_by.is_empty() {
        Ok(output)
    } else {
        let order: Vec<&str> = spec.order_by.iter().map(String::as_str).collect();
        output.sort_by_columns(&order)
    }
}

impl Table {
    /// Backward as-of join against `right`; see [`asof_join`]
    pub fn asof_join(&self, right: &Table, spec: &JoinSpec) -> Result<Table> {
        asof_join(self, right, spec)
    }
}

fn side_column<'a>(table: &'a Table, name: &str, side: &str) -> Result<&'a Column> {
    table.get_column(name).ok_or_else(|| {
        Error::SchemaMismatch(format!("column '{}' is missing from the {} table", name, side))
    })
}

impl<'a> BoundJoin<'a> {
    fn bind(left: &'a Table, right: &'a Table, spec: &'a JoinSpec) -> Result<Self> {
        let left_key = side_column(left, &spec.key, "left")?;
        let right_key = side_column(right, &spec.key, "right")?;
        for column in [left_key, right_key] {
            let column_type = column.column_type();
            if column_type != ColumnType::Null && !column_type.is_orderable() {
                return Err(Error::TypeMismatch(format!(
                    "as-of key '{}' has non-orderable type {}",
                    spec.key, column_type
                )));
            }
        }
        let (lt, rt) = (left_key.column_type(), right_key.column_type());
        if lt != rt && lt != ColumnType::Null && rt != ColumnType::Null {
            return Err(Error::TypeMismatch(format!(
                "as-of key '{}' is {} on the left but {} on the right",
                spec.key, lt, rt
            )));
        }

        let mut left_eq = Vec::with_capacity(spec.equality_keys.len());
        let mut right_eq = Vec::with_capacity(spec.equality_keys.len());
        for key in &spec.equality_keys {
            let l = side_column(left, &key.left, "left")?;
            let r = side_column(right, &key.right, "right")?;
            let (lt, rt) = (l.column_type(), r.column_type());
            if lt != rt && lt != ColumnType::Null && rt != ColumnType::Null {
                return Err(Error::TypeMismatch(format!(
                    "equality key '{}' = '{}' compares {} with {}",
                    key.left, key.right, lt, rt
                )));
            }
            left_eq.push(l);
            right_eq.push(r);
        }

        for predicate in &spec.predicates {
            predicate.validate(SchemaScope::Pair { left, right })?;
        }

        let layout = output_layout(left, right, spec)?;
        for column in &spec.order_by {
            if !layout.iter().any(|c| &c.name == column) {
                return Err(Error::SchemaMismatch(format!(
                    "cannot order by '{}': not an output column",
                    column
                )));
            }
        }

        Ok(BoundJoin {
            spec,
            left_key,
            right_key,
            left_eq,
            right_eq,
            layout,
        })
    }

    /// Position of the matched right row for every left row
    fn match_rows(&self, left: &Table, right: &Table) -> Result<Vec<Option<usize>>> {
        let right_keys = self.right_key.values();

        // right rows that can ever match, grouped by equality-key tuple,
        // each group stably sorted by temporal key
        let mut partitions: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for row in 0..right.row_count() {
            if !usable_key(&right_keys[row]) {
                continue;
            }
            if let Some(tuple) = key_tuple(&self.right_eq, row) {
                partitions.entry(tuple).or_default().push(row);
            }
        }
        for rows in partitions.values_mut() {
            rows.sort_by(|&a, &b| cmp_keys(&right_keys[a], &right_keys[b]));
        }

        let mut matches = Vec::with_capacity(left.row_count());
        for row in 0..left.row_count() {
            let left_key = &self.left_key.values()[row];
            let candidates = match key_tuple(&self.left_eq, row) {
                Some(tuple) if usable_key(left_key) => partitions.get(&tuple),
                _ => None,
            };
            let found = match candidates {
                Some(rows) => self.best_candidate(left, right, row, left_key, rows)?,
                None => None,
            };
            matches.push(found);
        }
        Ok(matches)
    }

    /// Scan a sorted partition backwards from the last row with key <= `left_key`.
    ///
    /// Among rows sharing the greatest qualifying key the one that comes first
    /// in the right table wins.
    fn best_candidate(
        &self,
        left: &Table,
        right: &Table,
        left_row: usize,
        left_key: &Value,
        rows: &[usize],
    ) -> Result<Option<usize>> {
        let right_keys = self.right_key.values();
        let upper = rows.partition_point(|&r| cmp_keys(&right_keys[r], left_key) != Ordering::Greater);

        let mut best: Option<usize> = None;
        for &candidate in rows[..upper].iter().rev() {
            if let Some(current) = best {
                if cmp_keys(&right_keys[candidate], &right_keys[current]) != Ordering::Equal {
                    break;
                }
            }
            if self.predicates_hold(left, right, left_row, candidate)? {
                best = Some(candidate);
            }
        }
        Ok(best)
    }

    fn predicates_hold(&self, left: &Table, right: &Table, left_row: usize, right_row: usize) -> Result<bool> {
        if self.spec.predicates.is_empty() {
            return Ok(true);
        }
        let scope = Scope::Pair {
            left: left.row(left_row)?,
            right: right.row(right_row)?,
        };
        for predicate in &self.spec.predicates {
            if !predicate.holds(&scope)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn assemble(&self, left: &Table, right: &Table, matches: &[Option<usize>]) -> Result<Table> {
        let mut output = Table::new();
        for column in &self.layout {
            let built = match column.side {
                Side::Left => left.columns()[column.position].clone(),
                Side::Right => right.columns()[column.position].take(matches)?,
            };
            output.add_column(built.with_name(column.name.as_str()))?;
        }
        Ok(output)
    }
}

/// Left columns, then right columns minus equality keys (unless kept)
fn output_layout(left: &Table, right: &Table, spec: &JoinSpec) -> Result<Vec<OutputColumn>> {
    let mut namer = ColumnNamer::new();
    let mut layout = Vec::with_capacity(left.column_count() + right.column_count());
    for (position, column) in left.columns().iter().enumerate() {
        layout.push(OutputColumn {
            name: namer.claim(column.name())?,
            side: Side::Left,
            position,
        });
    }
    for (position, column) in right.columns().iter().enumerate() {
        let is_equality_key = spec.equality_keys.iter().any(|k| k.right == column.name());
        if is_equality_key && !spec.keep_right_keys {
            continue;
        }
        layout.push(OutputColumn {
            name: namer.claim_right(column.name(), &spec.suffix)?,
            side: Side::Right,
            position,
        });
    }
    Ok(layout)
}

// null and NaN temporal keys never take part in matching
fn usable_key(value: &Value) -> bool {
    !value.is_null() && !value.is_nan()
}

fn key_tuple(columns: &[&Column], row: usize) -> Option<Vec<Value>> {
    columns
        .iter()
        .map(|c| {
            let value = &c.values()[row];
            if value.is_null() {
                None
            } else {
                Some(value.clone())
            }
        })
        .collect()
}

fn cmp_keys(a: &Value, b: &Value) -> Ordering {
    a.sql_cmp(b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::query::{left, right};

    fn table(columns: Vec<Column>) -> Table {
        Table::from_columns(columns).unwrap()
    }

    #[test]
    fn ties_resolve_to_first_right_row() {
        let l = table(vec![Column::from_vec("t", vec![5_i64])]);
        let r = table(vec![
            Column::from_vec("t", vec![3_i64, 3, 1]),
            Column::from_vec("v", vec!["first", "second", "old"]),
        ]);
        let out = asof_join(&l, &r, &JoinSpec::new("t")).unwrap();
        assert_eq!(out.column("v").unwrap().values()[0], Value::from("first"));
        assert_eq!(out.column("t_right").unwrap().values()[0], Value::Int64(3));
    }

    #[test]
    fn predicate_failure_falls_back_to_older_row() {
        let l = table(vec![
            Column::from_vec("t", vec![10_i64]),
            Column::from_vec("owner", vec!["a"]),
        ]);
        let r = table(vec![
            Column::from_vec("t", vec![1_i64, 5, 9]),
            Column::from_vec("run", vec!["a", "a", "b"]),
        ]);
        let spec = JoinSpec::new("t").predicate(left("owner").eq(right("run")));
        let out = asof_join(&l, &r, &spec).unwrap();
        assert_eq!(out.column("t_right").unwrap().values()[0], Value::Int64(5));
    }

    #[test]
    fn nan_keys_never_match() {
        let l = table(vec![Column::from_vec("t", vec![f64::NAN, 2.0])]);
        let r = table(vec![Column::from_vec("t", vec![f64::NAN, 1.0])]);
        let out = asof_join(&l, &r, &JoinSpec::new("t")).unwrap();
        let matched = out.column("t_right").unwrap().values();
        assert_eq!(matched, &[Value::Null, Value::Float64(1.0)]);
    }

    #[test]
    fn boolean_key_is_a_type_error() {
        let l = table(vec![Column::from_vec("t", vec![true])]);
        let r = table(vec![Column::from_vec("t", vec![false])]);
        assert!(matches!(
            asof_join(&l, &r, &JoinSpec::new("t")),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn renamed_equality_key_is_dropped_from_output() {
        let l = table(vec![
            Column::from_vec("t", vec![2_i64]),
            Column::from_vec("sym", vec!["x"]),
        ]);
        let r = table(vec![
            Column::from_vec("t", vec![1_i64]),
            Column::from_vec("symbol", vec!["x"]),
            Column::from_vec("px", vec![1.5]),
        ]);
        let out = asof_join(&l, &r, &JoinSpec::new("t").on_renamed("sym", "symbol")).unwrap();
        assert_eq!(out.column_names(), vec!["t", "sym", "t_right", "px"]);
        assert_eq!(out.column("px").unwrap().values()[0], Value::Float64(1.5));
    }
}
