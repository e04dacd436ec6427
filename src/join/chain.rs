//! Chained multi-table equality joins with key coalescing
//!
//! Every step of an outer chain leaves a right-side copy of each key
//! (`time_right`, or `time_1` with numbered suffixes). The copy is folded back
//! into the key column, first non-null value wins, before the next table is
//! joined, so a key first seen in table 2 still matches table 3.

use log::debug;

use crate::error::{Error, Result};
use crate::join::equi::{equi_join_tracked, JoinHow};
use crate::join::naming::Suffix;
use crate::table::base::Table;

/// How each step names the right-side copy of a colliding column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainSuffix {
    /// `_right`, `_rright`, ... as collisions pile up
    #[default]
    Escalating,
    /// `_1`, `_2`, ... after the position of the joined table
    Numbered,
}

/// Builder for a left-to-right fold of equality joins
#[derive(Debug, Clone)]
pub struct JoinChain {
    keys: Vec<String>,
    tables: Vec<Table>,
    suffix: ChainSuffix,
}

impl JoinChain {
    pub fn new<S: AsRef<str>>(keys: &[S]) -> Self {
        JoinChain {
            keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
            tables: Vec::new(),
            suffix: ChainSuffix::Escalating,
        }
    }

    pub fn push(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn suffix(mut self, suffix: ChainSuffix) -> Self {
        self.suffix = suffix;
        self
    }

    /// Number of tables pushed so far
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Run the joins, folding the key copies back after every step
    pub fn finish(self, how: JoinHow) -> Result<Table> {
        let mut tables = self.tables.into_iter();
        let mut joined = tables
            .next()
            .ok_or_else(|| Error::InvalidInput("join chain has no tables".to_string()))?;
        let on: Vec<&str> = self.keys.iter().map(String::as_str).collect();

        for (step, table) in tables.enumerate() {
            let suffix = match self.suffix {
                ChainSuffix::Escalating => Suffix::Escalating,
                ChainSuffix::Numbered => Suffix::Token(format!("_{}", step + 1)),
            };
            let output = equi_join_tracked(&joined, &table, &on, how, &suffix)?;
            joined = output.table;
            // the next step must see keys that only the right side had
            for (key, copy) in self.keys.iter().zip(&output.right_key_names) {
                if let Some(copy) = copy {
                    joined = joined.coalesce(key, &[key.as_str(), copy.as_str()])?;
                    joined = joined.drop(&[copy.as_str()])?;
                }
            }
        }

        debug!(
            "chained {} join on {:?} produced {} rows x {} columns",
            how,
            self.keys,
            joined.row_count(),
            joined.column_count()
        );
        Ok(joined)
    }
}
