//! Query execution module
//!
//! This module contains the logical plan and the pull-based executor.

pub mod executor;
pub mod plan;

mod aggregate;
mod join;
mod subquery;

pub use executor::{ExecutionEngine, Pipeline, ResultSet, RowStream};
pub use plan::{
    AggregateExpr, AggregateFunction, GroupKey, JoinType, LogicalPlan, OrderByItem, SelectItem,
    SetOperator,
};
