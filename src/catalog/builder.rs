//! Fluent construction of table definitions

use super::schema::{Column, ForeignKey, Schema, TableDef};
use super::types::DataType;

/// Builder for creating table definitions with a fluent API
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    foreign_keys: Vec<ForeignKey>,
}

impl TableBuilder {
    /// Start building a new table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Add a nullable column
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let position = self.columns.len();
        self.columns.push(Column::new(name, data_type, position));
        self
    }

    /// Add a primary key column (INTEGER PRIMARY KEY)
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        let position = self.columns.len();
        self.columns
            .push(Column::new(name, DataType::Integer, position).primary_key(true));
        self
    }

    /// Add a NOT NULL column
    pub fn column_not_null(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let position = self.columns.len();
        self.columns
            .push(Column::new(name, data_type, position).nullable(false));
        self
    }

    /// Declare that `column` references `ref_table.ref_column`
    pub fn foreign_key(
        mut self,
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys
            .push(ForeignKey::new(column, ref_table, ref_column));
        self
    }

    /// Finish the table definition
    pub fn build(self) -> TableDef {
        let mut def = TableDef::new(self.name, Schema::from_columns(self.columns));
        def.foreign_keys = self.foreign_keys;
        def
    }
}
