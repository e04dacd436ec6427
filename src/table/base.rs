use std::collections::HashMap;
use std::fmt;

use crate::core::column::Column;
use crate::core::data_value::Value;
use crate::error::{Error, Result};

/// Ordered collection of equally long, uniquely named columns
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    column_indices: HashMap<String, usize>,
    row_count: usize,
}

/// Borrowed view of one row of a table
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Value of the named column in this row
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.table
            .get_column(name)
            .and_then(|column| column.get(self.index))
    }
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from columns, checking names and lengths
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut table = Table::new();
        for column in columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    /// Append a column.
    ///
    /// The first column fixes the row count of a table that has no columns yet.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.column_indices.contains_key(column.name()) {
            return Err(Error::DuplicateColumnName(column.name().to_string()));
        }
        if self.columns.is_empty() {
            self.row_count = column.len();
        } else if column.len() != self.row_count {
            return Err(Error::InconsistentRowCount {
                expected: self.row_count,
                found: column.len(),
            });
        }
        self.column_indices
            .insert(column.name().to_string(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    /// Replace a column with the same name in place, or append it
    pub fn replace_or_add_column(&mut self, column: Column) -> Result<()> {
        match self.column_indices.get(column.name()) {
            Some(&position) => {
                if column.len() != self.row_count {
                    return Err(Error::InconsistentRowCount {
                        expected: self.row_count,
                        found: column.len(),
                    });
                }
                self.columns[position] = column;
                Ok(())
            }
            None => self.add_column(column),
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.column_indices.contains_key(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_indices.get(name).copied()
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Column by name, failing with `ColumnNotFound`
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.get_column(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    pub fn column_by_index(&self, position: usize) -> Option<&Column> {
        self.columns.get(position)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn row(&self, index: usize) -> Result<RowRef<'_>> {
        if index >= self.row_count {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.row_count,
            });
        }
        Ok(RowRef { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        (0..self.row_count).map(move |index| RowRef { table: self, index })
    }

    /// Gather rows by position into a new table; `None` yields an all-null row
    pub fn take(&self, indices: &[Option<usize>]) -> Result<Table> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.take(indices))
            .collect::<Result<Vec<_>>>()?;
        Table::from_columns(columns).map(|t| t.with_row_count(indices.len()))
    }

    /// Keep only the named columns, in the given order
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|name| self.column(name).cloned())
            .collect::<Result<Vec<_>>>()?;
        Table::from_columns(columns).map(|t| t.with_row_count(self.row_count))
    }

    /// Remove the named columns; every name must exist
    pub fn drop(&self, names: &[&str]) -> Result<Table> {
        for name in names {
            self.column(name)?;
        }
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.name()))
            .cloned()
            .collect();
        Table::from_columns(columns).map(|t| t.with_row_count(self.row_count))
    }

    /// Rename columns given `(old, new)` pairs
    pub fn rename(&self, renames: &[(&str, &str)]) -> Result<Table> {
        for (old, _) in renames {
            self.column(old)?;
        }
        let columns = self
            .columns
            .iter()
            .map(|c| match renames.iter().find(|(old, _)| *old == c.name()) {
                Some((_, new)) => c.clone().with_name(*new),
                None => c.clone(),
            })
            .collect();
        Table::from_columns(columns).map(|t| t.with_row_count(self.row_count))
    }

    /// Column-wise structural equality ignoring column order.
    ///
    /// Nulls equal nulls and NaN equals NaN, which is what comparing two
    /// materialized results needs.
    pub fn same_content(&self, other: &Table) -> bool {
        self.row_count == other.row_count
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .all(|c| other.get_column(c.name()) == Some(c))
    }

    // A table without columns still has a row count (e.g. selecting nothing)
    fn with_row_count(mut self, row_count: usize) -> Self {
        if self.columns.is_empty() {
            self.row_count = row_count;
        }
        self
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.row_count == other.row_count && self.columns == other.columns
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| c.values().iter().map(|v| v.to_string()).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .zip(&cells)
            .map(|(c, values)| {
                values
                    .iter()
                    .map(|v| v.chars().count())
                    .chain(std::iter::once(c.name().chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for (c, width) in self.columns.iter().zip(&widths) {
            write!(f, "{:<width$}  ", c.name(), width = *width)?;
        }
        writeln!(f)?;
        for (c, width) in self.columns.iter().zip(&widths) {
            write!(f, "{:<width$}  ", c.column_type().name(), width = *width)?;
        }
        writeln!(f)?;
        for row in 0..self.row_count {
            for (values, width) in cells.iter().zip(&widths) {
                write!(f, "{:<width$}  ", values[row], width = *width)?;
            }
            writeln!(f)?;
        }
        write!(f, "[{} rows x {} columns]", self.row_count, self.columns.len())
    }
}
