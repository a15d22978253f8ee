//! Retail analytics domain
//!
//! The six-table retail schema (customers, products, orders, order items,
//! payments and product reviews), a deterministic sample dataset and a
//! catalog of analytic queries expressed as logical plans.
//!
//! ```
//! use quarry::retail;
//!
//! let engine = retail::sample_engine().unwrap();
//! let query = retail::find("customers_without_orders").unwrap();
//! let result = engine.execute(&query.plan).unwrap();
//! assert_eq!(result.len(), 2);
//! ```

pub mod data;
pub mod queries;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::executor::ExecutionEngine;

pub use data::{sample_store, schema};
pub use queries::{catalog, find, NamedQuery};

/// An engine over the sample dataset with default settings
pub fn sample_engine() -> Result<ExecutionEngine> {
    sample_engine_with(EngineConfig::default())
}

/// An engine over the sample dataset
pub fn sample_engine_with(config: EngineConfig) -> Result<ExecutionEngine> {
    Ok(ExecutionEngine::with_config(Arc::new(sample_store()?), config))
}
