//! Pairwise equality joins

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::core::column::ColumnType;
use crate::core::data_value::Value;
use crate::error::{Error, Result};
use crate::join::naming::{ColumnNamer, Suffix};
use crate::table::base::Table;

/// Which unmatched rows an equality join keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinHow {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinHow {
    fn keeps_unmatched_left(self) -> bool {
        matches!(self, JoinHow::Left | JoinHow::Outer)
    }

    fn keeps_unmatched_right(self) -> bool {
        matches!(self, JoinHow::Right | JoinHow::Outer)
    }
}

impl fmt::Display for JoinHow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinHow::Inner => "inner",
            JoinHow::Left => "left",
            JoinHow::Right => "right",
            JoinHow::Outer => "outer",
        };
        write!(f, "{}", name)
    }
}

/// Output of an equality join plus where each right key column ended up
pub(crate) struct EquiJoinOutput {
    pub(crate) table: Table,
    /// Output name of the right-side copy of each key, in `on` order
    pub(crate) right_key_names: Vec<Option<String>>,
}

/// Hash join on same-named key columns.
///
/// Rows come out as each left row followed by its matches in right order;
/// unmatched right rows (for `Right` and `Outer`) are appended at the end.
/// Nulls in a key never match, NaN matches NaN.
pub fn equi_join(left: &Table, right: &Table, on: &[&str], how: JoinHow, suffix: &Suffix) -> Result<Table> {
    equi_join_tracked(left, right, on, how, suffix).map(|output| output.table)
}

pub(crate) fn equi_join_tracked(
    left: &Table,
    right: &Table,
    on: &[&str],
    how: JoinHow,
    suffix: &Suffix,
) -> Result<EquiJoinOutput> {
    if on.is_empty() {
        return Err(Error::InvalidInput("equality join needs at least one key".to_string()));
    }
    let mut left_keys = Vec::with_capacity(on.len());
    let mut right_keys = Vec::with_capacity(on.len());
    for name in on {
        let l = left.get_column(name).ok_or_else(|| {
            Error::SchemaMismatch(format!("join key '{}' is missing from the left table", name))
        })?;
        let r = right.get_column(name).ok_or_else(|| {
            Error::SchemaMismatch(format!("join key '{}' is missing from the right table", name))
        })?;
        let (lt, rt) = (l.column_type(), r.column_type());
        if lt != rt && lt != ColumnType::Null && rt != ColumnType::Null {
            return Err(Error::TypeMismatch(format!(
                "join key '{}' is {} on the left but {} on the right",
                name, lt, rt
            )));
        }
        left_keys.push(l.values());
        right_keys.push(r.values());
    }

    let tuple = |columns: &[&[Value]], row: usize| -> Option<Vec<Value>> {
        columns
            .iter()
            .map(|values| match &values[row] {
                Value::Null => None,
                value => Some(value.clone()),
            })
            .collect()
    };

    let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
    for row in 0..right.row_count() {
        if let Some(key) = tuple(&right_keys, row) {
            index.entry(key).or_default().push(row);
        }
    }

    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();
    let mut right_matched = vec![false; right.row_count()];
    for row in 0..left.row_count() {
        let matches = tuple(&left_keys, row).and_then(|key| index.get(&key));
        match matches {
            Some(rows) => {
                for &r in rows {
                    left_rows.push(Some(row));
                    right_rows.push(Some(r));
                    right_matched[r] = true;
                }
            }
            None if how.keeps_unmatched_left() => {
                left_rows.push(Some(row));
                right_rows.push(None);
            }
            None => {}
        }
    }
    if how.keeps_unmatched_right() {
        for (r, matched) in right_matched.iter().enumerate() {
            if !matched {
                left_rows.push(None);
                right_rows.push(Some(r));
            }
        }
    }

    let mut namer = ColumnNamer::new();
    let mut output = Table::new();
    for column in left.columns() {
        let name = namer.claim(column.name())?;
        output.add_column(column.take(&left_rows)?.with_name(name))?;
    }
    let mut right_key_names = vec![None; on.len()];
    for column in right.columns() {
        let key_position = on.iter().position(|k| *k == column.name());
        if key_position.is_some() && how == JoinHow::Inner {
            continue;
        }
        let name = namer.claim_right(column.name(), suffix)?;
        if let Some(position) = key_position {
            right_key_names[position] = Some(name.clone());
        }
        output.add_column(column.take(&right_rows)?.with_name(name))?;
    }

    debug!(
        "{} join on {:?}: {} x {} rows -> {} rows",
        how,
        on,
        left.row_count(),
        right.row_count(),
        left_rows.len()
    );
    Ok(EquiJoinOutput {
        table: output,
        right_key_names,
    })
}

impl Table {
    /// Equality join against `right`; see [`equi_join`]
    pub fn join(&self, right: &Table, on: &[&str], how: JoinHow) -> Result<Table> {
        equi_join(self, right, on, how, &Suffix::Escalating)
    }
}
