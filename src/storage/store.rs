//! Relation store
//!
//! The immutable set of tables a query runs against. A store is assembled
//! once with [`StoreBuilder`], which validates every row, and is then shared
//! read-only (usually behind an `Arc`) by any number of concurrent queries.

use super::table::{Table, TableScan};
use super::tuple::Tuple;
use crate::catalog::{ForeignKey, TableDef};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Read-only collection of loaded tables
#[derive(Debug, Clone, Default)]
pub struct RelationStore {
    /// Tables keyed by lower-cased name, in load order
    tables: IndexMap<String, Table>,
}

impl RelationStore {
    /// Start assembling a store
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Get a table by name (case-insensitive)
    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Start a fresh scan over a table
    pub fn scan(&self, name: &str) -> Result<TableScan<'_>> {
        Ok(self.get_table(name)?.scan())
    }

    /// Table names in load order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.values().map(|t| t.name()).collect()
    }

    /// Iterate over all tables in load order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// The foreign key of `table` that references `ref_table`, if any
    pub fn foreign_key_between(&self, table: &str, ref_table: &str) -> Option<&ForeignKey> {
        let table = self.get_table(table).ok()?;
        table
            .definition()
            .foreign_keys
            .iter()
            .find(|fk| fk.ref_table.eq_ignore_ascii_case(ref_table))
    }

    /// Whether joining `left.left_column = right.right_column` follows a
    /// declared foreign key in either direction
    pub fn is_foreign_key_join(
        &self,
        left: &str,
        left_column: &str,
        right: &str,
        right_column: &str,
    ) -> bool {
        let follows = |from: &str, from_col: &str, to: &str, to_col: &str| {
            self.foreign_key_between(from, to).is_some_and(|fk| {
                fk.column.eq_ignore_ascii_case(from_col)
                    && fk.ref_column.eq_ignore_ascii_case(to_col)
            })
        };
        follows(left, left_column, right, right_column)
            || follows(right, right_column, left, left_column)
    }
}

/// Builder that validates tables and rows before freezing them into a
/// [`RelationStore`]
#[derive(Debug, Default)]
pub struct StoreBuilder {
    tables: IndexMap<String, Table>,
}

impl StoreBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table definition
    pub fn add_table(&mut self, def: TableDef) -> Result<()> {
        let key = def.name().to_ascii_lowercase();
        if self.tables.contains_key(&key) {
            return Err(Error::TableAlreadyExists(def.name().to_string()));
        }
        for fk in &def.foreign_keys {
            if !def.schema().has_column(&fk.column) {
                return Err(Error::SchemaError(format!(
                    "foreign key column '{}' is not a column of '{}'",
                    fk.column,
                    def.name()
                )));
            }
        }
        self.tables.insert(key, Table::new(Arc::new(def)));
        Ok(())
    }

    /// Append a row to a registered table
    pub fn insert(&mut self, table: &str, tuple: Tuple) -> Result<()> {
        self.tables
            .get_mut(&table.to_ascii_lowercase())
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?
            .insert(tuple)
    }

    /// Append many rows to a registered table
    pub fn insert_all<I>(&mut self, table: &str, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = Tuple>,
    {
        for row in rows {
            self.insert(table, row)?;
        }
        Ok(())
    }

    /// Check foreign-key targets and freeze the store
    pub fn build(self) -> Result<RelationStore> {
        for table in self.tables.values() {
            for fk in &table.definition().foreign_keys {
                let target = self
                    .tables
                    .get(&fk.ref_table.to_ascii_lowercase())
                    .ok_or_else(|| {
                        Error::SchemaError(format!(
                            "foreign key {}.{} references missing table '{}'",
                            table.name(),
                            fk.column,
                            fk.ref_table
                        ))
                    })?;
                if !target.schema().has_column(&fk.ref_column) {
                    return Err(Error::SchemaError(format!(
                        "foreign key {}.{} references missing column {}.{}",
                        table.name(),
                        fk.column,
                        fk.ref_table,
                        fk.ref_column
                    )));
                }
            }
        }

        for table in self.tables.values() {
            debug!(table = table.name(), rows = table.tuple_count(), "loaded table");
        }
        Ok(RelationStore {
            tables: self.tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DataType, TableBuilder};
    use crate::storage::Value;

    fn customers() -> TableDef {
        TableBuilder::new("customers")
            .primary_key("customer_id")
            .column("name", DataType::Text)
            .build()
    }

    fn orders() -> TableDef {
        TableBuilder::new("orders")
            .primary_key("order_id")
            .column("customer_id", DataType::Integer)
            .foreign_key("customer_id", "customers", "customer_id")
            .build()
    }

    fn sample_store() -> RelationStore {
        let mut builder = StoreBuilder::new();
        builder.add_table(customers()).unwrap();
        builder.add_table(orders()).unwrap();
        builder
            .insert_all(
                "customers",
                vec![
                    Tuple::new(vec![Value::Integer(7), Value::from("Ann")]),
                    Tuple::new(vec![Value::Integer(9), Value::from("Bo")]),
                ],
            )
            .unwrap();
        builder
            .insert("orders", Tuple::new(vec![Value::Integer(1), Value::Integer(7)]))
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_get_table() {
        let store = sample_store();
        assert_eq!(store.get_table("CUSTOMERS").unwrap().tuple_count(), 2);
        assert!(matches!(
            store.get_table("payments"),
            Err(Error::TableNotFound(_))
        ));
        assert_eq!(store.table_names(), vec!["customers", "orders"]);
    }

    #[test]
    fn test_independent_scans() {
        let store = sample_store();
        let mut outer = store.scan("customers").unwrap();
        let first = outer.next().unwrap();
        // a second scan starts from the beginning while the first is open
        let inner: Vec<_> = store.scan("customers").unwrap().collect();
        assert_eq!(inner.len(), 2);
        assert_eq!(inner[0], first);
        assert_eq!(outer.next(), Some(inner[1]));
    }

    #[test]
    fn test_foreign_key_metadata() {
        let store = sample_store();
        let fk = store.foreign_key_between("orders", "customers").unwrap();
        assert_eq!(fk.column, "customer_id");
        assert!(store.foreign_key_between("customers", "orders").is_none());
        assert!(store.is_foreign_key_join("customers", "customer_id", "orders", "customer_id"));
        assert!(!store.is_foreign_key_join("customers", "customer_id", "orders", "order_id"));
    }

    #[test]
    fn test_dangling_foreign_key_rejected() {
        let mut builder = StoreBuilder::new();
        builder.add_table(orders()).unwrap();
        assert!(matches!(builder.build(), Err(Error::SchemaError(_))));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut builder = StoreBuilder::new();
        builder.add_table(customers()).unwrap();
        assert!(matches!(
            builder.add_table(customers()),
            Err(Error::TableAlreadyExists(_))
        ));
    }

    #[test]
    fn test_store_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RelationStore>();
    }
}
