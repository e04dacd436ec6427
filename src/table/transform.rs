use log::debug;

use crate::core::column::{merge_types, Column, ColumnType};
use crate::core::data_value::Value;
use crate::error::{Error, Result};
use crate::table::base::Table;
use crate::table::query::{result_type, Expr, SchemaScope, Scope};

impl Table {
    /// Keep the rows for which `predicate` holds
    pub fn filter(&self, predicate: &Expr) -> Result<Table> {
        predicate.validate(SchemaScope::Single(self))?;
        let mut keep = Vec::new();
        for row in self.rows() {
            if predicate.holds(&Scope::Row(row))? {
                keep.push(Some(row.index()));
            }
        }
        debug!("filter {} kept {} of {} rows", predicate, keep.len(), self.row_count());
        self.take(&keep)
    }

    /// Evaluate `expr` for every row into a new column
    pub fn evaluate_column(&self, name: &str, expr: &Expr) -> Result<Column> {
        expr.validate(SchemaScope::Single(self))?;
        let values = self
            .rows()
            .map(|row| expr.evaluate(&Scope::Row(row)))
            .collect::<Result<Vec<Value>>>()?;
        // a bare column reference keeps the declared type even when all null
        if let Expr::Column(source) = expr {
            let declared = self.column(source)?.column_type();
            return Column::new(name, declared, values);
        }
        if values.iter().all(Value::is_null) {
            return Ok(Column::nulls(name, result_type(&values), values.len()));
        }
        Column::from_values(name, values)
    }

    /// Add (or replace) a computed column
    pub fn with_column(&self, name: &str, expr: &Expr) -> Result<Table> {
        let column = self.evaluate_column(name, expr)?;
        let mut table = self.clone();
        table.replace_or_add_column(column)?;
        Ok(table)
    }

    /// Project to a new table of named expressions.
    ///
    /// Every expression needs an output name: a plain column reference or an
    /// `alias`.
    pub fn select_exprs(&self, exprs: &[Expr]) -> Result<Table> {
        let mut table = Table::new();
        for expr in exprs {
            let name = expr.output_name().ok_or_else(|| {
                Error::InvalidInput(format!("expression {} needs an alias", expr))
            })?;
            let inner = match expr {
                Expr::Alias(inner, _) => inner.as_ref(),
                other => other,
            };
            table.add_column(self.evaluate_column(name, inner)?)?;
        }
        Ok(table)
    }

    /// Add a column holding the same value on every row
    pub fn assign_constant(&self, name: &str, value: impl Into<Value>) -> Result<Table> {
        let value = value.into();
        let column = Column::new(name, value.column_type(), vec![value; self.row_count()])?;
        let mut table = self.clone();
        table.replace_or_add_column(column)?;
        Ok(table)
    }

    /// Write `coalesce(sources...)` into `target`.
    ///
    /// The first non-null source wins, scanning left to right. `target` is
    /// replaced in place when it exists and appended otherwise. Source types
    /// must agree (integers widen to floats, all-null columns fit anything).
    pub fn coalesce(&self, target: &str, sources: &[&str]) -> Result<Table> {
        if sources.is_empty() {
            return Err(Error::InvalidInput(format!(
                "coalesce into '{}' needs at least one source column",
                target
            )));
        }
        let columns = sources
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>>>()?;
        let mut column_type = columns[0].column_type();
        for column in &columns[1..] {
            column_type = merge_types(target, column_type, column.column_type())?;
        }
        let values = (0..self.row_count())
            .map(|row| {
                columns
                    .iter()
                    .map(|c| &c.values()[row])
                    .find(|v| !v.is_null())
                    .cloned()
                    .map(|v| match (v, column_type) {
                        (Value::Int64(i), ColumnType::Float64) => Value::Float64(i as f64),
                        (other, _) => other,
                    })
                    .unwrap_or(Value::Null)
            })
            .collect();
        let mut table = self.clone();
        table.replace_or_add_column(Column::new(target, column_type, values)?)?;
        Ok(table)
    }

    /// Stack tables vertically, matching columns by name.
    ///
    /// Every table must have the same set of column names; the first table
    /// decides the column order.
    pub fn concat(tables: &[Table]) -> Result<Table> {
        let first = match tables.first() {
            Some(first) => first,
            None => return Ok(Table::new()),
        };
        let mut columns: Vec<Column> = first.columns().to_vec();
        for table in &tables[1..] {
            if table.column_count() != first.column_count() {
                return Err(Error::SchemaMismatch(format!(
                    "cannot concat tables with columns {:?} and {:?}",
                    first.column_names(),
                    table.column_names()
                )));
            }
            for column in columns.iter_mut() {
                let other = table.get_column(column.name()).ok_or_else(|| {
                    Error::SchemaMismatch(format!(
                        "column '{}' missing from a table being concatenated",
                        column.name()
                    ))
                })?;
                column.extend(other)?;
            }
        }
        Table::from_columns(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::query::{col, lit};

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::from_vec("A", vec![1_i64, 2, 3]),
            Column::from_vec("B", vec![4_i64, 5, 6]),
        ])
        .unwrap()
    }

    #[test]
    fn filter_and_with_column() {
        let table = sample();
        let filtered = table.filter(&col("A").gt_eq(lit(2_i64))).unwrap();
        assert_eq!(filtered.row_count(), 2);

        let with_sum = table.with_column("C", &(col("A") + col("B"))).unwrap();
        assert_eq!(
            with_sum.column("C").unwrap().values(),
            &[Value::Int64(5), Value::Int64(7), Value::Int64(9)]
        );
    }

    #[test]
    fn literal_select_broadcasts() {
        let table = sample();
        let projected = table
            .select_exprs(&[lit(1.0).alias("one"), (lit(1.0) + col("A")).alias("shifted")])
            .unwrap();
        assert_eq!(projected.row_count(), 3);
        assert_eq!(projected.column("one").unwrap().values()[2], Value::Float64(1.0));
        assert_eq!(projected.column("shifted").unwrap().values()[2], Value::Float64(4.0));
        assert!(table.select_exprs(&[lit(1.0)]).is_err());
    }

    #[test]
    fn concat_with_parent_label() {
        let one = sample().assign_constant("parent", "one").unwrap();
        let two = sample().assign_constant("parent", "two").unwrap();
        let stacked = Table::concat(&[one, two]).unwrap();
        assert_eq!(stacked.row_count(), 6);
        assert_eq!(stacked.column("parent").unwrap().values()[3], Value::from("two"));
    }

    #[test]
    fn coalesce_takes_first_non_null() {
        let table = Table::from_columns(vec![
            Column::from_options("k", vec![Some(1_i64), None, None]),
            Column::from_options("k_right", vec![Some(9_i64), Some(2), None]),
            Column::nulls("k_rright", ColumnType::Null, 3),
        ])
        .unwrap();
        let merged = table.coalesce("k", &["k", "k_right", "k_rright"]).unwrap();
        assert_eq!(
            merged.column("k").unwrap().values(),
            &[Value::Int64(1), Value::Int64(2), Value::Null]
        );
        assert_eq!(merged.column_names(), vec!["k", "k_right", "k_rright"]);
    }
}
