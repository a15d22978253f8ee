//! Query Executor for Quarry
//!
//! This module executes logical plans and returns results.
//!
//! Every plan node opens into a [`Pipeline`]: its output schema plus a lazy
//! stream of rows pulled on demand by the parent node. Streaming operators
//! (scan, filter, project, distinct, limit, alias, UNION) never buffer;
//! blocking operators (aggregate, sort, INTERSECT/EXCEPT) consume their input
//! on the first pull; a join buffers only its build side.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::aggregate;
use super::join;
use super::plan::{LogicalPlan, OrderByItem, SelectItem, SetOperator};
use crate::catalog::{Field, RowSchema};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::expr::like::PatternCache;
use crate::expr::{Evaluator, Expr, Scope};
use crate::storage::{RelationStore, Tuple, Value};

/// Lazy stream of rows
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Tuple>> + 'a>;

/// An opened plan node: output schema and row stream
pub struct Pipeline<'a> {
    pub schema: Arc<RowSchema>,
    pub rows: RowStream<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(schema: Arc<RowSchema>, rows: RowStream<'a>) -> Self {
        Self { schema, rows }
    }
}

/// A stream that runs `compute` on its first pull and then yields its rows
pub(super) fn blocking<'a, F>(compute: F) -> RowStream<'a>
where
    F: FnOnce() -> Result<Vec<Tuple>> + 'a,
{
    Box::new(
        std::iter::once_with(compute).flat_map(|computed| -> Vec<Result<Tuple>> {
            match computed {
                Ok(rows) => rows.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            }
        }),
    )
}

/// Query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    /// Output columns
    pub schema: RowSchema,
    /// Result rows
    pub rows: Vec<Tuple>,
}

impl ResultSet {
    /// Output column names
    pub fn columns(&self) -> Vec<&str> {
        self.schema.names()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of an output column, by name or `qualifier.name`
    pub fn column_index(&self, name: &str) -> Result<usize> {
        let (qualifier, column) = match name.split_once('.') {
            Some((q, c)) => (Some(q), c),
            None => (None, name),
        };
        self.schema
            .resolve(qualifier, column)?
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// All values of one output column
    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().filter_map(|r| r.get(index)).collect())
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_json_records(&self) -> Result<serde_json::Value> {
        let names = self.columns();
        let mut records = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut record = serde_json::Map::new();
            for (name, value) in names.iter().zip(row.values()) {
                record.insert(name.to_string(), serde_json::to_value(value)?);
            }
            records.push(serde_json::Value::Object(record));
        }
        Ok(serde_json::Value::Array(records))
    }
}

/// Execution Engine
///
/// Holds a shared, read-only store; any number of engines (or threads using
/// one engine) may execute queries against the same store concurrently.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    /// Loaded tables
    store: Arc<RelationStore>,
    /// Engine settings
    config: EngineConfig,
    /// LIKE patterns compiled by earlier rows and queries
    patterns: Arc<PatternCache>,
}

impl ExecutionEngine {
    /// Create an engine with default settings
    pub fn new(store: Arc<RelationStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create an engine with explicit settings
    pub fn with_config(store: Arc<RelationStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            patterns: Arc::new(PatternCache::new()),
        }
    }

    pub fn store(&self) -> &RelationStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pattern_cache(&self) -> &PatternCache {
        &self.patterns
    }

    /// Execute a logical plan to completion
    pub fn execute(&self, plan: &LogicalPlan) -> Result<ResultSet> {
        let pipeline = self.open(plan, None)?;
        let rows = pipeline.rows.collect::<Result<Vec<_>>>()?;
        debug!(rows = rows.len(), "query complete");
        Ok(ResultSet {
            schema: (*pipeline.schema).clone(),
            rows,
        })
    }

    /// Open a plan as a lazy row stream
    pub fn stream<'a>(&'a self, plan: &'a LogicalPlan) -> Result<Pipeline<'a>> {
        self.open(plan, None)
    }

    pub(super) fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(self, self.config.avg_scale_increment).with_patterns(&self.patterns)
    }

    /// Open a plan node. `outer` is the enclosing row when the plan runs as
    /// a correlated subquery.
    pub(super) fn open<'a>(
        &'a self,
        plan: &'a LogicalPlan,
        outer: Option<&'a Scope<'a>>,
    ) -> Result<Pipeline<'a>> {
        match plan {
            LogicalPlan::Scan { table_name, alias } => self.open_scan(table_name, alias.as_deref()),
            LogicalPlan::Filter { input, predicate } => {
                let input = self.open(input, outer)?;
                Ok(self.open_filter(input, predicate, outer))
            }
            LogicalPlan::Join {
                left,
                right,
                join_type,
                condition,
            } => {
                let left = self.open(left, outer)?;
                let right = self.open(right, outer)?;
                join::open_join(self, left, right, *join_type, condition.as_ref(), outer)
            }
            LogicalPlan::Aggregate {
                input,
                group_by,
                aggregates,
            } => {
                let input = self.open(input, outer)?;
                aggregate::open_aggregate(self, input, group_by, aggregates, outer)
            }
            LogicalPlan::Project { input, items } => {
                let input = self.open(input, outer)?;
                self.open_project(input, items, outer)
            }
            LogicalPlan::Distinct { input } => Ok(self.open_distinct(self.open(input, outer)?)),
            LogicalPlan::Sort { input, order_by } => {
                let input = self.open(input, outer)?;
                Ok(self.open_sort(input, order_by, outer))
            }
            LogicalPlan::Limit {
                input,
                limit,
                offset,
            } => Ok(self.open_limit(self.open(input, outer)?, *limit, *offset)),
            LogicalPlan::Alias { input, alias } => {
                let input = self.open(input, outer)?;
                let schema = Arc::new(input.schema.requalify(alias));
                Ok(Pipeline::new(schema, input.rows))
            }
            LogicalPlan::SetCombine { left, right, op } => {
                let left = self.open(left, outer)?;
                let right = self.open(right, outer)?;
                self.open_set_combine(left, right, *op)
            }
        }
    }

    fn open_scan<'a>(&'a self, table_name: &str, alias: Option<&str>) -> Result<Pipeline<'a>> {
        let table = self.store.get_table(table_name)?;
        let qualifier = alias.unwrap_or(table.name());
        let schema = Arc::new(RowSchema::from_table(table.definition(), qualifier));
        debug!(table = table.name(), alias = qualifier, "open scan");
        Ok(Pipeline::new(schema, Box::new(table.scan().cloned().map(Ok))))
    }

    fn open_filter<'a>(
        &'a self,
        input: Pipeline<'a>,
        predicate: &'a Expr,
        outer: Option<&'a Scope<'a>>,
    ) -> Pipeline<'a> {
        let schema = input.schema.clone();
        let evaluator = self.evaluator();
        let rows = input.rows.filter_map(move |row| {
            let row = match row {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            let scope = Scope::nested(&schema, row.values(), outer);
            match evaluator.predicate(predicate, &scope) {
                Ok(true) => Some(Ok(row)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            }
        });
        Pipeline::new(input.schema, Box::new(rows))
    }

    fn open_project<'a>(
        &'a self,
        input: Pipeline<'a>,
        items: &'a [SelectItem],
        outer: Option<&'a Scope<'a>>,
    ) -> Result<Pipeline<'a>> {
        let input_schema = input.schema.clone();
        let mut fields = Vec::new();
        let mut outputs: Vec<Output<'a>> = Vec::new();

        for item in items {
            match item {
                SelectItem::Wildcard => {
                    for (i, field) in input_schema.fields().iter().enumerate() {
                        fields.push(field.clone());
                        outputs.push(Output::Column(i));
                    }
                }
                SelectItem::QualifiedWildcard(qualifier) => {
                    let indices = input_schema.qualified_indices(qualifier);
                    if indices.is_empty() {
                        return Err(Error::UnknownColumn(format!("{}.*", qualifier)));
                    }
                    for i in indices {
                        fields.extend(input_schema.field(i).cloned());
                        outputs.push(Output::Column(i));
                    }
                }
                SelectItem::Expr { expr, alias } => {
                    let local = match expr.as_column() {
                        Some(c) => input_schema.resolve(c.table.as_deref(), &c.column)?,
                        None => None,
                    };
                    let field = match (local.and_then(|i| input_schema.field(i)), alias) {
                        (Some(f), None) => f.clone(),
                        (Some(f), Some(a)) => Field::new(a.clone(), f.data_type),
                        (None, Some(a)) => Field::new(a.clone(), expr.data_type(&input_schema)),
                        (None, None) => {
                            let name = match expr.as_column() {
                                Some(c) => c.column.clone(),
                                None => expr.to_string(),
                            };
                            Field::new(name, expr.data_type(&input_schema))
                        }
                    };
                    fields.push(field);
                    outputs.push(match local {
                        Some(i) => Output::Column(i),
                        None => Output::Expr(expr),
                    });
                }
            }
        }

        let evaluator = self.evaluator();
        let rows = input.rows.map(move |row| {
            let row = row?;
            let scope = Scope::nested(&input_schema, row.values(), outer);
            let mut values = Vec::with_capacity(outputs.len());
            for output in &outputs {
                values.push(match output {
                    Output::Column(i) => row.get(*i).cloned().unwrap_or(Value::Null),
                    Output::Expr(expr) => evaluator.evaluate(expr, &scope)?,
                });
            }
            Ok(Tuple::new(values))
        });
        Ok(Pipeline::new(Arc::new(RowSchema::new(fields)), Box::new(rows)))
    }

    fn open_distinct<'a>(&'a self, input: Pipeline<'a>) -> Pipeline<'a> {
        let mut seen: HashSet<Tuple> = HashSet::new();
        let rows = input.rows.filter(move |row| match row {
            Ok(tuple) => seen.insert(tuple.clone()),
            Err(_) => true,
        });
        Pipeline::new(input.schema, Box::new(rows))
    }

    fn open_sort<'a>(
        &'a self,
        input: Pipeline<'a>,
        order_by: &'a [OrderByItem],
        outer: Option<&'a Scope<'a>>,
    ) -> Pipeline<'a> {
        let schema = input.schema.clone();
        let evaluator = self.evaluator();
        let source = input.rows;
        let rows = blocking(move || {
            let mut keyed = Vec::new();
            for row in source {
                let row = row?;
                let scope = Scope::nested(&schema, row.values(), outer);
                let keys = order_by
                    .iter()
                    .map(|item| evaluator.evaluate(&item.expr, &scope))
                    .collect::<Result<Vec<_>>>()?;
                keyed.push((keys, row));
            }
            // Vec::sort_by is stable
            keyed.sort_by(|(a, _), (b, _)| compare_sort_keys(a, b, order_by));
            debug!(rows = keyed.len(), "sort complete");
            Ok(keyed.into_iter().map(|(_, row)| row).collect())
        });
        Pipeline::new(input.schema, rows)
    }

    fn open_limit<'a>(&'a self, input: Pipeline<'a>, limit: Option<usize>, offset: usize) -> Pipeline<'a> {
        let mut skipped = 0;
        let rows = input.rows.filter_map(move |row| match row {
            Ok(_) if skipped < offset => {
                skipped += 1;
                None
            }
            other => Some(other),
        });
        let rows: RowStream<'a> = match limit {
            Some(n) => Box::new(rows.take(n)),
            None => Box::new(rows),
        };
        Pipeline::new(input.schema, rows)
    }

    fn open_set_combine<'a>(
        &'a self,
        left: Pipeline<'a>,
        right: Pipeline<'a>,
        op: SetOperator,
    ) -> Result<Pipeline<'a>> {
        if left.schema.len() != right.schema.len() {
            return Err(Error::SetArityMismatch {
                left: left.schema.len(),
                right: right.schema.len(),
            });
        }
        let mut fields = Vec::with_capacity(left.schema.len());
        for (l, r) in left.schema.fields().iter().zip(right.schema.fields()) {
            let data_type = match (l.data_type, r.data_type) {
                (Some(a), Some(b)) => Some(a.unify(&b).ok_or_else(|| {
                    Error::type_mismatch(
                        format!("{} for column '{}' of {}", a, l.name, op),
                        b.to_string(),
                    )
                })?),
                (a, b) => a.or(b),
            };
            fields.push(Field::new(l.name.clone(), data_type));
        }
        let schema = Arc::new(RowSchema::new(fields));
        debug!(op = %op, "open set operation");

        let rows: RowStream<'a> = match op {
            SetOperator::UnionAll => Box::new(left.rows.chain(right.rows)),
            SetOperator::Union => {
                let mut seen: HashSet<Tuple> = HashSet::new();
                Box::new(left.rows.chain(right.rows).filter(move |row| match row {
                    Ok(tuple) => seen.insert(tuple.clone()),
                    Err(_) => true,
                }))
            }
            SetOperator::Intersect | SetOperator::Except => {
                let keep_common = op == SetOperator::Intersect;
                let (left_rows, right_rows) = (left.rows, right.rows);
                blocking(move || {
                    let other = right_rows.collect::<Result<HashSet<Tuple>>>()?;
                    let mut seen = HashSet::new();
                    let mut out = Vec::new();
                    for row in left_rows {
                        let row = row?;
                        if other.contains(&row) == keep_common && seen.insert(row.clone()) {
                            out.push(row);
                        }
                    }
                    Ok(out)
                })
            }
        };
        Ok(Pipeline::new(schema, rows))
    }
}

/// Source of one projected value
enum Output<'a> {
    Column(usize),
    Expr(&'a Expr),
}

/// ORDER BY comparison: NULL first ascending, last descending
fn compare_sort_keys(a: &[Value], b: &[Value], order_by: &[OrderByItem]) -> Ordering {
    for ((x, y), item) in a.iter().zip(b).zip(order_by) {
        let ord = x.sort_cmp(y);
        let ord = if item.ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
