//! Grouping and aggregate functions
//!
//! Rows are grouped by value equality of their key expressions (NULL keys
//! form one group). Groups are emitted in order of first appearance; with no
//! GROUP BY the whole input is a single group, even when it is empty.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::executor::{blocking, ExecutionEngine, Pipeline};
use super::plan::{AggregateExpr, AggregateFunction, GroupKey};
use crate::catalog::{DataType, Field, RowSchema};
use crate::error::{Error, Result};
use crate::expr::Scope;
use crate::storage::tuple::with_scale;
use crate::storage::{Tuple, Value};

/// Running state of one aggregate within one group
#[derive(Debug)]
struct Accumulator<'a> {
    agg: &'a AggregateExpr,
    seen: Option<HashSet<Value>>,
    count: i64,
    sum: Option<Value>,
    extreme: Option<Value>,
    max_scale: u32,
}

impl<'a> Accumulator<'a> {
    fn new(agg: &'a AggregateExpr) -> Self {
        Self {
            agg,
            seen: agg.distinct.then(HashSet::new),
            count: 0,
            sum: None,
            extreme: None,
            max_scale: 0,
        }
    }

    /// Fold one input value; `None` is COUNT(*)
    fn update(&mut self, value: Option<Value>) -> Result<()> {
        let value = match value {
            None => {
                self.count += 1;
                return Ok(());
            }
            Some(v) if v.is_null() => return Ok(()),
            Some(v) => v,
        };
        if let Some(seen) = &mut self.seen {
            if !seen.insert(value.clone()) {
                return Ok(());
            }
        }

        match self.agg.func {
            AggregateFunction::Count => {}
            AggregateFunction::Sum | AggregateFunction::Avg => {
                if !value.is_numeric() {
                    return Err(Error::InvalidAggregate(format!(
                        "{} over {} value '{}'",
                        self.agg.func,
                        value.type_name(),
                        value
                    )));
                }
                self.max_scale = self.max_scale.max(value.scale());
                self.sum = Some(match self.sum.take() {
                    Some(sum) => sum.add(&value)?,
                    None => value,
                });
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                let wanted = if self.agg.func == AggregateFunction::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let replace = match &self.extreme {
                    None => true,
                    Some(current) => value.sql_compare(current)? == Some(wanted),
                };
                if replace {
                    self.extreme = Some(value);
                }
            }
        }
        self.count += 1;
        Ok(())
    }

    fn finish(self, scale_increment: u32) -> Result<Value> {
        match self.agg.func {
            AggregateFunction::Count => Ok(Value::Integer(self.count)),
            AggregateFunction::Sum => Ok(self.sum.unwrap_or(Value::Null)),
            AggregateFunction::Min | AggregateFunction::Max => {
                Ok(self.extreme.unwrap_or(Value::Null))
            }
            AggregateFunction::Avg => {
                let sum = match self.sum.as_ref().and_then(Value::as_decimal) {
                    Some(sum) if self.count > 0 => sum,
                    _ => return Ok(Value::Null),
                };
                let mean = sum
                    .checked_div(Decimal::from(self.count))
                    .ok_or_else(|| Error::Overflow(format!("AVG of {} values", self.count)))?;
                let scale = self.max_scale.saturating_add(scale_increment);
                Ok(Value::Decimal(with_scale(mean, scale)))
            }
        }
    }
}

/// Reject aggregates whose argument can never be valid
fn validate(agg: &AggregateExpr, schema: &RowSchema) -> Result<()> {
    let arg = match &agg.arg {
        Some(arg) => arg,
        None if agg.func == AggregateFunction::Count && !agg.distinct => return Ok(()),
        None => {
            return Err(Error::InvalidAggregate(format!(
                "{} requires an argument",
                agg.func
            )))
        }
    };
    if matches!(agg.func, AggregateFunction::Sum | AggregateFunction::Avg) {
        if let Some(t) = arg.data_type(schema) {
            if !t.is_numeric() {
                return Err(Error::InvalidAggregate(format!(
                    "{} over {} expression '{}'",
                    agg.func, t, arg
                )));
            }
        }
    }
    Ok(())
}

fn output_type(agg: &AggregateExpr, schema: &RowSchema) -> Option<DataType> {
    match agg.func {
        AggregateFunction::Count => Some(DataType::Integer),
        AggregateFunction::Avg => Some(DataType::Decimal),
        _ => agg.arg.as_ref().and_then(|a| a.data_type(schema)),
    }
}

pub(super) fn open_aggregate<'a>(
    engine: &'a ExecutionEngine,
    input: Pipeline<'a>,
    group_by: &'a [GroupKey],
    aggregates: &'a [AggregateExpr],
    outer: Option<&'a Scope<'a>>,
) -> Result<Pipeline<'a>> {
    let input_schema = input.schema.clone();
    let mut fields = Vec::with_capacity(group_by.len() + aggregates.len());
    for key in group_by {
        let local = match key.expr.as_column() {
            Some(c) => input_schema
                .resolve(c.table.as_deref(), &c.column)?
                .and_then(|i| input_schema.field(i)),
            None => None,
        };
        fields.push(match (local, &key.alias) {
            (Some(f), None) => f.clone(),
            (_, Some(a)) => Field::new(a.clone(), key.expr.data_type(&input_schema)),
            (None, None) => Field::new(key.expr.to_string(), key.expr.data_type(&input_schema)),
        });
    }
    for agg in aggregates {
        validate(agg, &input_schema)?;
        fields.push(Field::new(agg.output_name(), output_type(agg, &input_schema)));
    }

    let evaluator = engine.evaluator();
    let scale_increment = engine.config().avg_scale_increment;
    let source = input.rows;
    let rows = blocking(move || {
        let mut groups: IndexMap<Vec<Value>, Vec<Accumulator<'a>>> = IndexMap::new();
        for row in source {
            let row = row?;
            let scope = Scope::nested(&input_schema, row.values(), outer);
            let key = group_by
                .iter()
                .map(|k| evaluator.evaluate(&k.expr, &scope))
                .collect::<Result<Vec<_>>>()?;
            let accumulators = groups
                .entry(key)
                .or_insert_with(|| aggregates.iter().map(Accumulator::new).collect());
            for acc in accumulators.iter_mut() {
                let value = match &acc.agg.arg {
                    Some(arg) => Some(evaluator.evaluate(arg, &scope)?),
                    None => None,
                };
                acc.update(value)?;
            }
        }
        if groups.is_empty() && group_by.is_empty() {
            groups.insert(Vec::new(), aggregates.iter().map(Accumulator::new).collect());
        }
        debug!(groups = groups.len(), "aggregation complete");

        let mut out = Vec::with_capacity(groups.len());
        for (key, accumulators) in groups {
            let mut values = key;
            for acc in accumulators {
                values.push(acc.finish(scale_increment)?);
            }
            out.push(Tuple::new(values));
        }
        Ok(out)
    });
    Ok(Pipeline::new(Arc::new(RowSchema::new(fields)), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableBuilder;
    use crate::executor::plan::{LogicalPlan, OrderByItem};
    use crate::expr::{col, func, lit, ScalarFunction};
    use crate::storage::StoreBuilder;

    fn dec(s: &str) -> Value {
        Value::parse_as(s, DataType::Decimal).unwrap()
    }

    fn create_engine() -> ExecutionEngine {
        let mut builder = StoreBuilder::new();
        builder
            .add_table(
                TableBuilder::new("orders")
                    .primary_key("order_id")
                    .column("customer_id", DataType::Integer)
                    .column("order_date", DataType::Timestamp)
                    .column("total", DataType::Decimal)
                    .column("status", DataType::Text)
                    .build(),
            )
            .unwrap();
        let rows = [
            (1, Some(7), "2024-01-15 09:30:00", Some("100.00"), "shipped"),
            (2, Some(8), "2024-01-16 10:00:00", Some("50.50"), "pending"),
            (3, Some(7), "2024-01-15 17:45:00", Some("25.25"), "shipped"),
            (4, None, "2024-01-17 08:00:00", None, "cancelled"),
            (5, Some(8), "2024-01-18 12:00:00", Some("50.50"), "shipped"),
        ];
        for (id, customer, date, total, status) in rows {
            builder
                .insert(
                    "orders",
                    Tuple::new(vec![
                        Value::Integer(id),
                        customer.map(Value::Integer).unwrap_or(Value::Null),
                        Value::parse_as(date, DataType::Timestamp).unwrap(),
                        total.map(dec).unwrap_or(Value::Null),
                        Value::from(status),
                    ]),
                )
                .unwrap();
        }
        ExecutionEngine::new(Arc::new(builder.build().unwrap()))
    }

    #[test]
    fn test_group_by_with_all_functions() {
        let engine = create_engine();
        let plan = LogicalPlan::scan("orders").aggregate(
            vec![col("customer_id").into()],
            vec![
                AggregateExpr::count_star().alias("n"),
                AggregateExpr::sum(col("total")).alias("spent"),
                AggregateExpr::avg(col("total")).alias("mean"),
                AggregateExpr::min(col("total")),
                AggregateExpr::max(col("order_date")),
            ],
        );
        let result = engine.execute(&plan).unwrap();
        assert_eq!(
            result.columns(),
            vec!["customer_id", "n", "spent", "mean", "MIN(total)", "MAX(order_date)"]
        );
        // groups in order of first appearance, NULL key is its own group
        assert_eq!(result.len(), 3);
        assert_eq!(
            result.rows[0].values()[..4],
            [Value::Integer(7), Value::Integer(2), dec("125.25"), dec("62.625000")]
        );
        assert_eq!(result.rows[1].get(3), Some(&dec("50.500000")));
        assert_eq!(result.rows[2].values()[1..5], [
            Value::Integer(1),
            Value::Null,
            Value::Null,
            Value::Null
        ]);
    }

    #[test]
    fn test_count_variants() {
        let engine = create_engine();
        let plan = LogicalPlan::scan("orders").aggregate(
            vec![],
            vec![
                AggregateExpr::count_star(),
                AggregateExpr::count(col("customer_id")),
                AggregateExpr::count_distinct(col("customer_id")),
                AggregateExpr::count_distinct(col("total")),
            ],
        );
        let result = engine.execute(&plan).unwrap();
        assert_eq!(
            result.rows,
            vec![Tuple::new(vec![
                Value::Integer(5),
                Value::Integer(4),
                Value::Integer(2),
                Value::Integer(3)
            ])]
        );
        assert_eq!(result.columns()[2], "COUNT(DISTINCT customer_id)");
    }

    #[test]
    fn test_empty_input_without_group_by() {
        let engine = create_engine();
        let plan = LogicalPlan::scan("orders")
            .filter(col("order_id").gt(lit(100)))
            .aggregate(
                vec![],
                vec![
                    AggregateExpr::count_star(),
                    AggregateExpr::sum(col("total")),
                    AggregateExpr::avg(col("total")),
                    AggregateExpr::max(col("total")),
                ],
            );
        let result = engine.execute(&plan).unwrap();
        assert_eq!(
            result.rows,
            vec![Tuple::new(vec![
                Value::Integer(0),
                Value::Null,
                Value::Null,
                Value::Null
            ])]
        );
    }

    #[test]
    fn test_empty_input_with_group_by() {
        let engine = create_engine();
        let plan = LogicalPlan::scan("orders")
            .filter(col("order_id").gt(lit(100)))
            .aggregate(vec![col("status").into()], vec![AggregateExpr::count_star()]);
        assert!(engine.execute(&plan).unwrap().is_empty());
    }

    #[test]
    fn test_group_by_date_merges_times() {
        let engine = create_engine();
        let day = func(ScalarFunction::Date, vec![col("order_date")]);
        let plan = LogicalPlan::scan("orders")
            .aggregate(
                vec![GroupKey::aliased(day, "day")],
                vec![AggregateExpr::count_star().alias("orders")],
            )
            .sort(vec![OrderByItem::asc(col("day"))]);
        let result = engine.execute(&plan).unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result.rows[0].get(0).unwrap().to_string(), "2024-01-15");
        assert_eq!(result.rows[0].get(1), Some(&Value::Integer(2)));
        assert_eq!(result.schema.field(0).unwrap().data_type, Some(DataType::Date));
    }

    #[test]
    fn test_having_over_aggregate() {
        let engine = create_engine();
        let plan = LogicalPlan::scan("orders")
            .aggregate(
                vec![col("status").into()],
                vec![AggregateExpr::count_star().alias("n")],
            )
            .having(col("n").gt(lit(1)));
        let result = engine.execute(&plan).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.rows[0].get(0), Some(&Value::from("shipped")));
    }

    #[test]
    fn test_group_counts_sum_to_input() {
        let engine = create_engine();
        let plan = LogicalPlan::scan("orders")
            .aggregate(vec![col("status").into()], vec![AggregateExpr::count_star()]);
        let total: i64 = engine
            .execute(&plan)
            .unwrap()
            .rows
            .iter()
            .filter_map(|r| r.get(1).and_then(Value::as_i64))
            .sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_invalid_aggregates() {
        let engine = create_engine();
        for agg in [
            AggregateExpr::avg(col("status")),
            AggregateExpr::sum(col("order_date")),
        ] {
            let plan = LogicalPlan::scan("orders").aggregate(vec![], vec![agg]);
            assert!(matches!(
                engine.execute(&plan),
                Err(Error::InvalidAggregate(_))
            ));
        }

        let mut missing = AggregateExpr::count_star();
        missing.func = AggregateFunction::Max;
        let plan = LogicalPlan::scan("orders").aggregate(vec![], vec![missing]);
        assert!(matches!(engine.execute(&plan), Err(Error::InvalidAggregate(_))));
    }

    #[test]
    fn test_min_max_type_mismatch_across_values() {
        let engine = create_engine();
        let mixed = crate::expr::case_when(
            vec![(col("order_id").eq(lit(1)), lit("one"))],
            Some(col("order_id")),
        );
        let plan = LogicalPlan::scan("orders").aggregate(vec![], vec![AggregateExpr::max(mixed)]);
        assert!(matches!(engine.execute(&plan), Err(Error::TypeMismatch { .. })));
    }
}
