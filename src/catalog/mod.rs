//! Catalog module
//!
//! This module contains table definitions, row schemas, and data types.

pub mod builder;
pub mod schema;
pub mod types;

pub use builder::TableBuilder;
pub use schema::{Column, Field, ForeignKey, RowSchema, Schema, TableDef};
pub use types::DataType;
