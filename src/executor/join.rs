//! Join execution
//!
//! All join types run as a driver/build pair: the build side is materialized
//! once and every driver row is probed against it. INNER, LEFT and CROSS
//! drive from the left input; RIGHT drives from the right input so that
//! unmatched right rows surface in right-input order. Output rows are always
//! `left ++ right`.
//!
//! A condition made only of `left_col = right_col` terms over comparable
//! types is answered through a hash index on the build side. The index is
//! probed in build order, so both strategies emit identical rows in identical
//! order.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::executor::{ExecutionEngine, Pipeline};
use super::plan::JoinType;
use crate::catalog::RowSchema;
use crate::error::Result;
use crate::expr::{BinaryOperator, ColumnRef, Evaluator, Expr, Scope};
use crate::storage::{Tuple, Value};

/// Equi-join key positions, one pair per `=` term
#[derive(Debug, Clone, PartialEq, Eq)]
struct EquiKeys {
    left: Vec<usize>,
    right: Vec<usize>,
}

/// How build rows are located for a driver row
enum Strategy<'a> {
    /// No condition: every build row matches
    Cross,
    /// Evaluate the condition against every build row
    NestedLoop(&'a Expr),
    /// Look up build rows by key; `driver_keys` are positions in the driver row
    Hash {
        index: HashMap<Vec<Value>, Vec<usize>>,
        driver_keys: Vec<usize>,
    },
}

struct JoinProbe<'a> {
    schema: Arc<RowSchema>,
    build: Vec<Tuple>,
    build_width: usize,
    driver_is_left: bool,
    preserve_driver: bool,
    strategy: Strategy<'a>,
    evaluator: Evaluator<'a>,
    outer: Option<&'a Scope<'a>>,
}

impl<'a> JoinProbe<'a> {
    fn combine(&self, driver: &Tuple, build: &Tuple) -> Tuple {
        if self.driver_is_left {
            driver.concat(build)
        } else {
            build.concat(driver)
        }
    }

    /// All output rows produced by one driver row
    fn probe(&self, driver: &Tuple) -> Result<Vec<Tuple>> {
        let mut out = Vec::new();
        match &self.strategy {
            Strategy::Cross => {
                for row in &self.build {
                    out.push(self.combine(driver, row));
                }
            }
            Strategy::NestedLoop(condition) => {
                for row in &self.build {
                    let combined = self.combine(driver, row);
                    let scope = Scope::nested(&self.schema, combined.values(), self.outer);
                    if self
                        .evaluator
                        .evaluate_join_condition(condition, &scope)?
                        .is_true()
                    {
                        out.push(combined);
                    }
                }
            }
            Strategy::Hash { index, driver_keys } => {
                if let Some(key) = key_of(driver, driver_keys) {
                    if let Some(matches) = index.get(&key) {
                        for &i in matches {
                            out.push(self.combine(driver, &self.build[i]));
                        }
                    }
                }
            }
        }
        if out.is_empty() && self.preserve_driver {
            out.push(self.combine(driver, &Tuple::nulls(self.build_width)));
        }
        Ok(out)
    }
}

/// Key values at `positions`, or `None` when any of them is NULL
fn key_of(row: &Tuple, positions: &[usize]) -> Option<Vec<Value>> {
    let mut key = Vec::with_capacity(positions.len());
    for &p in positions {
        match row.get(p) {
            Some(v) if !v.is_null() => key.push(v.clone()),
            _ => return None,
        }
    }
    Some(key)
}

/// Detect a pure equi-join condition between the two inputs
fn equi_keys(condition: &Expr, left: &RowSchema, right: &RowSchema) -> Option<EquiKeys> {
    let mut keys = EquiKeys {
        left: Vec::new(),
        right: Vec::new(),
    };
    for term in condition.conjuncts() {
        let (a, b) = match term {
            Expr::BinaryOp {
                left: a,
                op: BinaryOperator::Eq,
                right: b,
            } => (a.as_column()?, b.as_column()?),
            _ => return None,
        };
        let (l, r) = match (side_of(a, left, right)?, side_of(b, left, right)?) {
            (Side::Left(l), Side::Right(r)) | (Side::Right(r), Side::Left(l)) => (l, r),
            _ => return None,
        };
        let lt = left.field(l)?.data_type?;
        let rt = right.field(r)?.data_type?;
        if !lt.is_comparable_with(&rt) {
            return None;
        }
        keys.left.push(l);
        keys.right.push(r);
    }
    Some(keys)
}

enum Side {
    Left(usize),
    Right(usize),
}

/// Which input a column belongs to; `None` if ambiguous, unknown or outer
fn side_of(column: &ColumnRef, left: &RowSchema, right: &RowSchema) -> Option<Side> {
    let in_left = left.resolve(column.table.as_deref(), &column.column).ok()?;
    let in_right = right.resolve(column.table.as_deref(), &column.column).ok()?;
    match (in_left, in_right) {
        (Some(i), None) => Some(Side::Left(i)),
        (None, Some(i)) => Some(Side::Right(i)),
        _ => None,
    }
}

pub(super) fn open_join<'a>(
    engine: &'a ExecutionEngine,
    left: Pipeline<'a>,
    right: Pipeline<'a>,
    join_type: JoinType,
    condition: Option<&'a Expr>,
    outer: Option<&'a Scope<'a>>,
) -> Result<Pipeline<'a>> {
    let schema = Arc::new(left.schema.join(&right.schema));
    let keys = match condition {
        Some(c) if engine.config().hash_join => equi_keys(c, &left.schema, &right.schema),
        _ => None,
    };

    let driver_is_left = join_type != JoinType::Right;
    let (driver, build_input, build_width) = if driver_is_left {
        (left.rows, right.rows, right.schema.len())
    } else {
        (right.rows, left.rows, left.schema.len())
    };
    let build = build_input.collect::<Result<Vec<_>>>()?;

    let strategy = match (condition, keys) {
        (None, _) => Strategy::Cross,
        (Some(_), Some(keys)) => {
            let (build_keys, driver_keys) = if driver_is_left {
                (keys.right, keys.left)
            } else {
                (keys.left, keys.right)
            };
            let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
            for (i, row) in build.iter().enumerate() {
                if let Some(key) = key_of(row, &build_keys) {
                    index.entry(key).or_default().push(i);
                }
            }
            Strategy::Hash { index, driver_keys }
        }
        (Some(c), None) => Strategy::NestedLoop(c),
    };
    debug!(
        join_type = %join_type,
        strategy = match &strategy {
            Strategy::Cross => "cross",
            Strategy::NestedLoop(_) => "nested_loop",
            Strategy::Hash { .. } => "hash",
        },
        build_rows = build.len(),
        "open join"
    );

    let probe = JoinProbe {
        schema: schema.clone(),
        build,
        build_width,
        driver_is_left,
        preserve_driver: matches!(join_type, JoinType::Left | JoinType::Right),
        strategy,
        evaluator: engine.evaluator(),
        outer,
    };
    let rows = driver.flat_map(move |row| -> Vec<Result<Tuple>> {
        match row.and_then(|r| probe.probe(&r)) {
            Ok(rows) => rows.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        }
    });
    Ok(Pipeline::new(schema, Box::new(rows)))
}
