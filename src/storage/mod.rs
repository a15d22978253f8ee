//! Storage module
//!
//! In-memory relation storage:
//! - Values and tuples
//! - Tables with load-time validation
//! - The read-only relation store
//! - JSON dataset loading

pub mod loader;
pub mod store;
pub mod table;
pub mod tuple;

pub use store::{RelationStore, StoreBuilder};
pub use table::{Table, TableScan};
pub use tuple::{Tuple, Value};
