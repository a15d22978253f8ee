//! Subquery execution
//!
//! A subquery plan is re-opened for every outer row it is evaluated for,
//! with that row as its outer scope. Each execution pulls only as many rows
//! as its operator needs.

use tracing::trace;

use super::executor::{ExecutionEngine, Pipeline};
use super::plan::LogicalPlan;
use crate::error::{Error, Result};
use crate::expr::{Scope, SubqueryRunner};
use crate::storage::Value;

impl ExecutionEngine {
    fn single_column<'a>(
        &'a self,
        plan: &'a LogicalPlan,
        scope: &'a Scope<'a>,
    ) -> Result<Pipeline<'a>> {
        let pipeline = self.open(plan, Some(scope))?;
        if pipeline.schema.len() != 1 {
            return Err(Error::MultiValueSubquery(format!(
                "{} columns where one was expected",
                pipeline.schema.len()
            )));
        }
        Ok(pipeline)
    }
}

impl SubqueryRunner for ExecutionEngine {
    fn exists(&self, plan: &LogicalPlan, scope: &Scope<'_>) -> Result<bool> {
        let mut rows = self.open(plan, Some(scope))?.rows;
        let found = rows.next().transpose()?.is_some();
        trace!(found, "EXISTS subquery");
        Ok(found)
    }

    fn scalar(&self, plan: &LogicalPlan, scope: &Scope<'_>) -> Result<Value> {
        let mut rows = self.single_column(plan, scope)?.rows;
        let value = match rows.next().transpose()? {
            Some(row) => row.into_values().into_iter().next().unwrap_or(Value::Null),
            None => Value::Null,
        };
        if rows.next().transpose()?.is_some() {
            return Err(Error::MultiValueSubquery(
                "more than one row where one was expected".to_string(),
            ));
        }
        trace!(%value, "scalar subquery");
        Ok(value)
    }

    fn column_values(&self, plan: &LogicalPlan, scope: &Scope<'_>) -> Result<Vec<Value>> {
        let rows = self.single_column(plan, scope)?.rows;
        let mut values = Vec::new();
        for row in rows {
            values.extend(row?.into_values());
        }
        trace!(values = values.len(), "IN subquery");
        Ok(values)
    }
}
