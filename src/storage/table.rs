//! Table storage for Quarry
//!
//! A table pairs a definition with its rows, kept in insertion order.

use super::tuple::{Tuple, Value};
use crate::catalog::{Schema, TableDef};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// A table combining schema and rows
#[derive(Debug, Clone)]
pub struct Table {
    /// Table definition (metadata)
    def: Arc<TableDef>,
    /// Rows in insertion order
    rows: Vec<Tuple>,
    /// Primary key values seen so far
    keys: HashSet<Vec<Value>>,
}

impl Table {
    /// Create a new empty table
    pub fn new(def: Arc<TableDef>) -> Self {
        Self {
            def,
            rows: Vec::new(),
            keys: HashSet::new(),
        }
    }

    /// Get table name
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Get table schema
    pub fn schema(&self) -> &Schema {
        self.def.schema()
    }

    /// Get table definition
    pub fn definition(&self) -> &Arc<TableDef> {
        &self.def
    }

    /// Insert a row, coercing each value to its column type
    pub fn insert(&mut self, tuple: Tuple) -> Result<()> {
        let schema = self.def.schema();
        if tuple.len() != schema.column_count() {
            return Err(Error::RowArityMismatch {
                table: self.name().to_string(),
                expected: schema.column_count(),
                found: tuple.len(),
            });
        }

        let mut values = Vec::with_capacity(tuple.len());
        for (value, col) in tuple.into_values().into_iter().zip(schema.columns()) {
            // Check NOT NULL constraints
            if !col.nullable && value.is_null() {
                return Err(Error::NullNotAllowed(format!("{}.{}", self.name(), col.name)));
            }
            values.push(value.coerce_to(col.data_type)?);
        }

        let pk = schema.primary_key_indices();
        if !pk.is_empty() {
            let key: Vec<Value> = pk.iter().map(|&i| values[i].clone()).collect();
            if !self.keys.insert(key) {
                return Err(Error::PrimaryKeyViolation(self.name().to_string()));
            }
        }

        self.rows.push(Tuple::new(values));
        Ok(())
    }

    /// Scan all tuples in insertion order
    pub fn scan(&self) -> TableScan<'_> {
        TableScan {
            rows: &self.rows,
            position: 0,
        }
    }

    /// All rows as a slice
    pub fn rows(&self) -> &[Tuple] {
        &self.rows
    }

    /// Get tuple count
    pub fn tuple_count(&self) -> usize {
        self.rows.len()
    }
}

/// Iterator over the rows of a table.
///
/// Each call to [`Table::scan`] starts a fresh pass, so a scan can be
/// re-opened as many times as a correlated subquery needs.
#[derive(Debug, Clone)]
pub struct TableScan<'a> {
    rows: &'a [Tuple],
    position: usize,
}

impl<'a> Iterator for TableScan<'a> {
    type Item = &'a Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.get(self.position)?;
        self.position += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rows.len() - self.position;
        (remaining, Some(remaining))
    }
}
