use std::cmp::Ordering;

use crate::core::data_value::Value;
use crate::error::Result;
use crate::table::base::Table;

/// One column of a multi-column sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
    pub nulls_first: bool,
}

impl SortKey {
    /// Ascending, nulls last
    pub fn asc(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            descending: false,
            nulls_first: false,
        }
    }

    /// Descending, nulls last
    pub fn desc(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            descending: true,
            nulls_first: false,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls_first = true;
        self
    }
}

/// Ordering of two cells under a sort key.
///
/// Null placement does not flip with `descending`. Values without a common
/// order (which a well-typed column never holds) compare equal.
pub(crate) fn compare_cells(a: &Value, b: &Value, key: &SortKey) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) if key.nulls_first => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, true) if key.nulls_first => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.sql_cmp(b).unwrap_or(Ordering::Equal);
            if key.descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

impl Table {
    /// Row positions in sorted order; ties keep their original order
    pub fn sort_indices(&self, keys: &[SortKey]) -> Result<Vec<usize>> {
        let columns = keys
            .iter()
            .map(|key| self.column(&key.column))
            .collect::<Result<Vec<_>>>()?;
        let mut indices: Vec<usize> = (0..self.row_count()).collect();
        indices.sort_by(|&a, &b| {
            keys.iter()
                .zip(&columns)
                .map(|(key, column)| compare_cells(&column.values()[a], &column.values()[b], key))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        Ok(indices)
    }

    /// Stable sort by several keys
    pub fn sort_by(&self, keys: &[SortKey]) -> Result<Table> {
        let indices: Vec<Option<usize>> = self.sort_indices(keys)?.into_iter().map(Some).collect();
        self.take(&indices)
    }

    /// Stable ascending sort by the named columns, nulls last
    pub fn sort_by_columns(&self, columns: &[&str]) -> Result<Table> {
        let keys: Vec<SortKey> = columns.iter().map(|c| SortKey::asc(*c)).collect();
        self.sort_by(&keys)
    }
}
