//! JSON dataset loader
//!
//! Reads table definitions and rows from a JSON document of the form
//!
//! ```json
//! { "tables": [ {
//!     "name": "orders",
//!     "columns": [ { "name": "order_id", "type": "integer", "primary_key": true },
//!                  { "name": "total_amount", "type": "decimal" } ],
//!     "foreign_keys": [ { "column": "customer_id",
//!                         "references": { "table": "customers", "column": "customer_id" } } ],
//!     "rows": [ [1, "150.00"] ]
//! } ] }
//! ```
//!
//! Decimal and temporal values are best written as strings; they are coerced
//! to the declared column type on insert.

use super::store::{RelationStore, StoreBuilder};
use super::tuple::{Tuple, Value};
use crate::catalog::{Column, DataType, ForeignKey, Schema, TableDef};
use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// A complete dataset
#[derive(Debug, Deserialize)]
pub struct Dataset {
    pub tables: Vec<TableSpec>,
}

/// One table of a dataset
#[derive(Debug, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySpec>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ForeignKeySpec {
    pub column: String,
    pub references: ReferenceSpec,
}

#[derive(Debug, Deserialize)]
pub struct ReferenceSpec {
    pub table: String,
    pub column: String,
}

impl TableSpec {
    fn definition(&self) -> TableDef {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Column::new(c.name.clone(), c.data_type, i)
                    .nullable(c.nullable)
                    .primary_key(c.primary_key)
            })
            .collect();
        let mut def = TableDef::new(self.name.clone(), Schema::from_columns(columns));
        def.foreign_keys = self
            .foreign_keys
            .iter()
            .map(|fk| ForeignKey::new(&fk.column, &fk.references.table, &fk.references.column))
            .collect();
        def
    }
}

/// Convert a JSON scalar into a value; column coercion happens on insert
fn json_to_value(json: &serde_json::Value) -> Result<Value> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Integer(i64::from(*b))),
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::Integer(i));
            }
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map(Value::Decimal)
                .map_err(|_| Error::InvalidLiteral {
                    value: text,
                    data_type: DataType::Decimal,
                })
        }
        other => Err(Error::SchemaError(format!(
            "row values must be scalars, found {}",
            other
        ))),
    }
}

/// Build a store from a parsed dataset
pub fn load_dataset(dataset: Dataset) -> Result<RelationStore> {
    let mut builder = StoreBuilder::new();
    for spec in &dataset.tables {
        builder.add_table(spec.definition())?;
    }
    for spec in &dataset.tables {
        for row in &spec.rows {
            let values = row.iter().map(json_to_value).collect::<Result<Vec<_>>>()?;
            builder.insert(&spec.name, Tuple::new(values))?;
        }
    }
    let store = builder.build()?;
    info!(tables = dataset.tables.len(), "dataset loaded");
    Ok(store)
}

/// Parse and load a dataset from a JSON string
pub fn load_from_str(json: &str) -> Result<RelationStore> {
    let dataset: Dataset = serde_json::from_str(json)?;
    load_dataset(dataset)
}

/// Read and load a dataset from a JSON file
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RelationStore> {
    let text = std::fs::read_to_string(path)?;
    load_from_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "tables": [
            {
                "name": "customers",
                "columns": [
                    { "name": "customer_id", "type": "integer", "primary_key": true },
                    { "name": "email", "type": "varchar" }
                ],
                "rows": [[1, "a@example.com"], [2, null]]
            },
            {
                "name": "orders",
                "columns": [
                    { "name": "order_id", "type": "int", "primary_key": true },
                    { "name": "customer_id", "type": "integer" },
                    { "name": "order_date", "type": "timestamp" },
                    { "name": "total_amount", "type": "decimal", "nullable": false }
                ],
                "foreign_keys": [
                    { "column": "customer_id", "references": { "table": "customers", "column": "customer_id" } }
                ],
                "rows": [[10, 1, "2024-01-15 10:30:00", "150.00"], [11, 2, "2024-01-16", 99.5]]
            }
        ]
    }"#;

    #[test]
    fn test_load_from_str() {
        let store = load_from_str(DATASET).unwrap();
        let orders = store.get_table("orders").unwrap();
        assert_eq!(orders.tuple_count(), 2);

        let first = &orders.rows()[0];
        assert!(matches!(first.get(2), Some(Value::Timestamp(_))));
        assert_eq!(first.get(3).unwrap().to_string(), "150.00");
        assert_eq!(
            orders.rows()[1].get(2).unwrap().to_string(),
            "2024-01-16 00:00:00"
        );
        assert!(store.foreign_key_between("orders", "customers").is_some());
    }

    #[test]
    fn test_rejects_bad_literal() {
        let json = r#"{ "tables": [ { "name": "t",
            "columns": [ { "name": "d", "type": "date" } ],
            "rows": [["not a date"]] } ] }"#;
        assert!(matches!(
            load_from_str(json),
            Err(Error::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(load_from_str("{ tables: "), Err(Error::Json(_))));
    }
}
