//! Schema definitions for Quarry
//!
//! This module defines table schemas, foreign-key metadata and the schemas of
//! rows flowing through a query pipeline.

use super::types::DataType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// Column position (0-indexed)
    pub position: usize,
    /// Is this column nullable?
    pub nullable: bool,
    /// Is this part of the primary key?
    pub primary_key: bool,
}

impl Column {
    /// Create a new nullable column
    pub fn new(name: impl Into<String>, data_type: DataType, position: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            position,
            nullable: true,
            primary_key: false,
        }
    }

    /// Set nullable flag
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set primary key flag
    pub fn primary_key(mut self, pk: bool) -> Self {
        self.primary_key = pk;
        if pk {
            self.nullable = false;
        }
        self
    }
}

/// Table schema - defines the structure of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,
    /// Column name to index mapping
    name_to_index: HashMap<String, usize>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            name_to_index: HashMap::new(),
        }
    }

    /// Create a schema from a list of columns
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let mut schema = Self::new();
        for col in columns {
            schema.add_column(col);
        }
        schema
    }

    /// Add a column to the schema
    pub fn add_column(&mut self, mut column: Column) {
        column.position = self.columns.len();
        self.name_to_index
            .insert(column.name.clone(), column.position);
        self.columns.push(column);
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.name_to_index.get(name).map(|&idx| &self.columns[idx])
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Get primary key column positions
    pub fn primary_key_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.position)
            .collect()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// Declares that `column` logically references `ref_table.ref_column`.
///
/// Metadata only: rows are never checked against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referencing column in the owning table
    pub column: String,
    /// Referenced table
    pub ref_table: String,
    /// Referenced (primary key) column
    pub ref_column: String,
}

impl ForeignKey {
    /// Create a new foreign key reference
    pub fn new(
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            ref_table: ref_table.into(),
            ref_column: ref_column.into(),
        }
    }
}

/// Table definition - full table metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name
    pub name: String,
    /// Table schema
    pub schema: Schema,
    /// Outgoing foreign-key references
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDef {
    /// Create a new table definition
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            foreign_keys: Vec::new(),
        }
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the table schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.schema.get_column(name)
    }

    /// Human-readable description (for the `.schema` command)
    pub fn describe(&self) -> String {
        let mut info = format!("Table: {}\n", self.name);
        info.push_str("Columns:\n");
        for col in self.schema.columns() {
            let mut flags = Vec::new();
            if col.primary_key {
                flags.push("PRIMARY KEY");
            }
            if !col.nullable {
                flags.push("NOT NULL");
            }
            let flags_str = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            info.push_str(&format!("  {} {}{}\n", col.name, col.data_type, flags_str));
        }
        if !self.foreign_keys.is_empty() {
            info.push_str("Foreign keys:\n");
            for fk in &self.foreign_keys {
                info.push_str(&format!(
                    "  {} -> {}.{}\n",
                    fk.column, fk.ref_table, fk.ref_column
                ));
            }
        }
        info
    }
}

/// One column of a row flowing through a query pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Table name or alias the column is reachable through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    /// Column name
    pub name: String,
    /// Statically known type; `None` when it cannot be inferred (e.g. a NULL literal)
    pub data_type: Option<DataType>,
}

impl Field {
    /// Create an unqualified field
    pub fn new(name: impl Into<String>, data_type: Option<DataType>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
            data_type,
        }
    }

    /// Set the qualifier
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    fn matches(&self, qualifier: Option<&str>, name: &str) -> bool {
        if !self.name.eq_ignore_ascii_case(name) {
            return false;
        }
        match qualifier {
            None => true,
            Some(q) => self
                .qualifier
                .as_deref()
                .is_some_and(|fq| fq.eq_ignore_ascii_case(q)),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", q, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Ordered output schema of a row stream or result set
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct RowSchema {
    fields: Vec<Field>,
}

impl RowSchema {
    /// Create a row schema from fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Schema of a table scan, every field qualified by `qualifier`
    pub fn from_table(table: &TableDef, qualifier: &str) -> Self {
        let fields = table
            .schema()
            .columns()
            .iter()
            .map(|c| Field::new(c.name.clone(), Some(c.data_type)).qualified(qualifier))
            .collect();
        Self { fields }
    }

    /// Get all fields
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Get a field by position
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in order
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Resolve a possibly qualified column name to a position.
    ///
    /// Returns `Ok(None)` when nothing matches, and fails when more than one
    /// field matches.
    pub fn resolve(&self, qualifier: Option<&str>, name: &str) -> Result<Option<usize>> {
        let mut found = None;
        for (i, field) in self.fields.iter().enumerate() {
            if field.matches(qualifier, name) {
                if found.is_some() {
                    let reference = match qualifier {
                        Some(q) => format!("{}.{}", q, name),
                        None => name.to_string(),
                    };
                    return Err(Error::AmbiguousColumn(reference));
                }
                found = Some(i);
            }
        }
        Ok(found)
    }

    /// Concatenate two schemas (join output)
    pub fn join(&self, other: &RowSchema) -> RowSchema {
        let mut fields = self.fields.clone();
        fields.extend(other.fields.iter().cloned());
        Self { fields }
    }

    /// Re-qualify every field with `alias`
    pub fn requalify(&self, alias: &str) -> RowSchema {
        let fields = self
            .fields
            .iter()
            .map(|f| Field {
                qualifier: Some(alias.to_string()),
                ..f.clone()
            })
            .collect();
        Self { fields }
    }

    /// Positions of all fields reachable through `qualifier`
    pub fn qualified_indices(&self, qualifier: &str) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                f.qualifier
                    .as_deref()
                    .is_some_and(|q| q.eq_ignore_ascii_case(qualifier))
            })
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_def() -> TableDef {
        let mut schema = Schema::new();
        schema.add_column(Column::new("order_id", DataType::Integer, 0).primary_key(true));
        schema.add_column(Column::new("customer_id", DataType::Integer, 1));
        schema.add_column(Column::new("total_amount", DataType::Decimal, 2));
        TableDef::new("orders", schema)
    }

    #[test]
    fn test_schema_creation() {
        let def = orders_def();
        assert_eq!(def.schema().column_count(), 3);
        assert!(def.schema().has_column("order_id"));
        assert!(!def.schema().has_column("unknown"));
        assert_eq!(def.schema().primary_key_indices(), vec![0]);

        let id_col = def.get_column("order_id").unwrap();
        assert!(id_col.primary_key);
        assert!(!id_col.nullable);
    }

    #[test]
    fn test_row_schema_resolution() {
        let def = orders_def();
        let o1 = RowSchema::from_table(&def, "o1");
        let o2 = RowSchema::from_table(&def, "o2");
        let joined = o1.join(&o2);

        assert_eq!(joined.resolve(Some("o2"), "customer_id").unwrap(), Some(4));
        assert_eq!(joined.resolve(Some("O1"), "ORDER_ID").unwrap(), Some(0));
        assert_eq!(joined.resolve(Some("o3"), "order_id").unwrap(), None);
        assert!(matches!(
            joined.resolve(None, "order_id"),
            Err(Error::AmbiguousColumn(_))
        ));
        assert_eq!(o1.resolve(None, "total_amount").unwrap(), Some(2));
    }

    #[test]
    fn test_requalify() {
        let schema = RowSchema::from_table(&orders_def(), "orders").requalify("recent");
        assert_eq!(schema.resolve(Some("recent"), "order_id").unwrap(), Some(0));
        assert_eq!(schema.resolve(Some("orders"), "order_id").unwrap(), None);
        assert_eq!(schema.qualified_indices("recent"), vec![0, 1, 2]);
    }

    #[test]
    fn test_describe() {
        let mut def = orders_def();
        def.foreign_keys
            .push(ForeignKey::new("customer_id", "customers", "customer_id"));
        let info = def.describe();
        assert!(info.contains("order_id INTEGER [PRIMARY KEY, NOT NULL]"));
        assert!(info.contains("customer_id -> customers.customer_id"));
    }
}
