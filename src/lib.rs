//! Quarry - an in-memory relational query evaluation engine
//!
//! This library provides the components for running analytic queries over
//! read-only tables:
//! - Catalog (table definitions, row schemas, data types)
//! - Storage (values, tuples, tables, the relation store, JSON loading)
//! - Expressions (three-valued logic, scalar functions, subqueries)
//! - Query execution (logical plans, pull-based executor, joins, aggregation)
//! - The retail sample schema with its query catalog
//!
//! ```
//! use std::sync::Arc;
//! use quarry::catalog::{DataType, TableBuilder};
//! use quarry::executor::{ExecutionEngine, LogicalPlan, OrderByItem};
//! use quarry::expr::{col, lit};
//! use quarry::storage::{StoreBuilder, Tuple, Value};
//!
//! let mut builder = StoreBuilder::new();
//! builder.add_table(
//!     TableBuilder::new("products")
//!         .primary_key("product_id")
//!         .column("price", DataType::Decimal)
//!         .build(),
//! ).unwrap();
//! for (id, price) in [(1, "2500.00"), (2, "3500.00"), (3, "999.00")] {
//!     builder.insert("products", Tuple::new(vec![Value::Integer(id), Value::from(price)])).unwrap();
//! }
//! let engine = ExecutionEngine::new(Arc::new(builder.build().unwrap()));
//!
//! let plan = LogicalPlan::scan("products")
//!     .filter(col("price").gt(lit(1000)))
//!     .sort(vec![OrderByItem::desc(col("price"))]);
//! let result = engine.execute(&plan).unwrap();
//! assert_eq!(result.column_values("product_id").unwrap(), vec![&Value::Integer(2), &Value::Integer(1)]);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod expr;
pub mod logging;
pub mod retail;
pub mod storage;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use executor::{ExecutionEngine, LogicalPlan, ResultSet};
pub use storage::{RelationStore, StoreBuilder, Tuple, Value};
