//! Expression evaluation
//!
//! Expressions are evaluated against a [`Scope`]: the current row with its
//! schema, chained to the rows of enclosing queries. A correlated subquery
//! sees its outer row through that chain, so no outer values are ever
//! substituted into the subquery plan itself.

use super::ast::{BinaryOperator, ColumnRef, Expr, ScalarFunction, UnaryOperator};
use super::like::{self, PatternCache};
use super::truth::Truth;
use crate::catalog::{DataType, RowSchema};
use crate::error::{Error, Result};
use crate::executor::plan::LogicalPlan;
use crate::storage::Value;
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;

/// A row binding, optionally nested inside the row of an enclosing query
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    schema: &'a RowSchema,
    row: &'a [Value],
    outer: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Top-level scope over one row
    pub fn new(schema: &'a RowSchema, row: &'a [Value]) -> Self {
        Self {
            schema,
            row,
            outer: None,
        }
    }

    /// Scope over one row, falling back to `outer` for unresolved columns
    pub fn nested(schema: &'a RowSchema, row: &'a [Value], outer: Option<&'a Scope<'a>>) -> Self {
        Self { schema, row, outer }
    }

    pub fn schema(&self) -> &'a RowSchema {
        self.schema
    }

    pub fn row(&self) -> &'a [Value] {
        self.row
    }

    pub fn outer(&self) -> Option<&'a Scope<'a>> {
        self.outer
    }

    /// Resolve a column, innermost scope first
    pub fn lookup(&self, column: &ColumnRef) -> Result<&'a Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(index) = current
                .schema
                .resolve(column.table.as_deref(), &column.column)?
            {
                return current.row.get(index).ok_or_else(|| {
                    Error::Internal(format!("row too short for column '{}'", column))
                });
            }
            scope = current.outer;
        }
        Err(Error::UnknownColumn(column.to_string()))
    }
}

/// Executes subquery plans on behalf of the evaluator.
///
/// `scope` is the row the subquery is evaluated for; the runner makes it the
/// outer scope of the subquery's own rows.
pub trait SubqueryRunner {
    /// Whether the subquery produces at least one row
    fn exists(&self, plan: &LogicalPlan, scope: &Scope<'_>) -> Result<bool>;

    /// The single value of a one-column subquery; NULL when it returns no rows
    fn scalar(&self, plan: &LogicalPlan, scope: &Scope<'_>) -> Result<Value>;

    /// All values of a one-column subquery
    fn column_values(&self, plan: &LogicalPlan, scope: &Scope<'_>) -> Result<Vec<Value>>;
}

/// Where a predicate is being evaluated; decides how a non-boolean result
/// is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Filter,
    Join,
}

/// Expression evaluator
#[derive(Clone, Copy)]
pub struct Evaluator<'r> {
    runner: &'r dyn SubqueryRunner,
    scale_increment: u32,
    patterns: Option<&'r PatternCache>,
}

impl<'r> Evaluator<'r> {
    pub fn new(runner: &'r dyn SubqueryRunner, scale_increment: u32) -> Self {
        Self {
            runner,
            scale_increment,
            patterns: None,
        }
    }

    /// Reuse compiled LIKE patterns from `patterns`
    pub fn with_patterns(mut self, patterns: &'r PatternCache) -> Self {
        self.patterns = Some(patterns);
        self
    }

    /// Evaluate a scalar expression. Predicates yield 1, 0 or NULL.
    pub fn evaluate(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Value> {
        match expr {
            Expr::Column(c) => scope.lookup(c).cloned(),
            Expr::Literal(v) => Ok(v.clone()),
            Expr::BinaryOp { left, op, right } if !op.is_comparison() && !op.is_logical() => {
                let l = self.evaluate(left, scope)?;
                let r = self.evaluate(right, scope)?;
                match op {
                    BinaryOperator::Add => l.add(&r),
                    BinaryOperator::Sub => l.sub(&r),
                    BinaryOperator::Mul => l.mul(&r),
                    BinaryOperator::Div => l.div(&r, self.scale_increment),
                    _ => l.rem(&r),
                }
            }
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr,
            } => self.evaluate(expr, scope)?.negate(),
            Expr::Function { func, args } => self.call(*func, args, scope),
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => self.case(operand.as_deref(), when_clauses, else_clause.as_deref(), scope),
            Expr::ScalarSubquery(plan) => self.runner.scalar(plan, scope),
            _ => Ok(self.truth(expr, scope)?.into_value()),
        }
    }

    /// Evaluate a WHERE/HAVING style predicate to a truth value
    pub fn truth(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Truth> {
        self.truth_in(expr, scope, Context::Filter)
    }

    /// Whether a row passes a filter; UNKNOWN rejects it like FALSE
    pub fn predicate(&self, expr: &Expr, scope: &Scope<'_>) -> Result<bool> {
        Ok(self.truth(expr, scope)?.is_true())
    }

    /// Evaluate a join condition over the combined `left ++ right` row.
    ///
    /// A condition that does not produce a truth value fails with
    /// [`Error::JoinConditionError`].
    pub fn evaluate_join_condition(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Truth> {
        self.truth_in(expr, scope, Context::Join)
    }

    fn truth_in(&self, expr: &Expr, scope: &Scope<'_>, ctx: Context) -> Result<Truth> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                let l = self.truth_in(left, scope, ctx)?;
                if l == Truth::False {
                    return Ok(Truth::False);
                }
                Ok(l.and(self.truth_in(right, scope, ctx)?))
            }
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Or,
                right,
            } => {
                let l = self.truth_in(left, scope, ctx)?;
                if l == Truth::True {
                    return Ok(Truth::True);
                }
                Ok(l.or(self.truth_in(right, scope, ctx)?))
            }
            Expr::BinaryOp { left, op, right } if op.is_comparison() => {
                let l = self.evaluate(left, scope)?;
                let r = self.evaluate(right, scope)?;
                compare(*op, &l, &r)
            }
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr,
            } => Ok(!self.truth_in(expr, scope, ctx)?),
            Expr::IsNull(e) => Ok(Truth::from(self.evaluate(e, scope)?.is_null())),
            Expr::IsNotNull(e) => Ok(Truth::from(!self.evaluate(e, scope)?.is_null())),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let v = self.evaluate(expr, scope)?;
                let lo = self.evaluate(low, scope)?;
                let hi = self.evaluate(high, scope)?;
                let t = compare(BinaryOperator::Gte, &v, &lo)?
                    .and(compare(BinaryOperator::Lte, &v, &hi)?);
                Ok(negate_if(t, *negated))
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let probe = self.evaluate(expr, scope)?;
                let values = list
                    .iter()
                    .map(|e| self.evaluate(e, scope))
                    .collect::<Result<Vec<_>>>()?;
                Ok(negate_if(membership(&probe, &values)?, *negated))
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                let probe = self.evaluate(expr, scope)?;
                let values = self.runner.column_values(subquery, scope)?;
                Ok(negate_if(membership(&probe, &values)?, *negated))
            }
            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                let text = self.evaluate(expr, scope)?;
                let pat = self.evaluate(pattern, scope)?;
                match (&text, &pat) {
                    (Value::Null, _) | (_, Value::Null) => Ok(Truth::Unknown),
                    (Value::Text(t), Value::Text(p)) => {
                        let matched = match self.patterns {
                            Some(cache) => cache.matches(t, p)?,
                            None => like::matches(t, p)?,
                        };
                        Ok(negate_if(Truth::from(matched), *negated))
                    }
                    _ => Err(Error::type_mismatch(
                        "TEXT operands for LIKE",
                        format!("{} LIKE {}", text.type_name(), pat.type_name()),
                    )),
                }
            }
            Expr::Exists { subquery, negated } => Ok(negate_if(
                Truth::from(self.runner.exists(subquery, scope)?),
                *negated,
            )),
            other => {
                let value = self.evaluate(other, scope)?;
                match ctx {
                    Context::Filter => Truth::from_value(&value),
                    Context::Join => Truth::from_value(&value)
                        .map_err(|_| Error::JoinConditionError(value.type_name().to_string())),
                }
            }
        }
    }

    fn call(&self, func: ScalarFunction, args: &[Expr], scope: &Scope<'_>) -> Result<Value> {
        let (min, max) = func.arity();
        if args.len() < min || max.is_some_and(|m| args.len() > m) {
            let expected = match max {
                Some(m) if m == min => format!("{} argument(s) for {}", min, func),
                Some(m) => format!("{} to {} arguments for {}", min, m, func),
                None => format!("at least {} argument(s) for {}", min, func),
            };
            return Err(Error::type_mismatch(expected, args.len().to_string()));
        }

        if func == ScalarFunction::Coalesce {
            for arg in args {
                let v = self.evaluate(arg, scope)?;
                if !v.is_null() {
                    return Ok(v);
                }
            }
            return Ok(Value::Null);
        }

        let values = args
            .iter()
            .map(|a| self.evaluate(a, scope))
            .collect::<Result<Vec<_>>>()?;
        // every remaining function is NULL on any NULL argument
        if values.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }
        let first = &values[0];

        match func {
            ScalarFunction::Concat => Ok(Value::Text(values.iter().map(|v| v.to_string()).collect())),
            ScalarFunction::Date => Ok(Value::Date(date_of(first)?)),
            ScalarFunction::Year => Ok(Value::Integer(i64::from(date_of(first)?.year()))),
            ScalarFunction::Month => Ok(Value::Integer(i64::from(date_of(first)?.month()))),
            ScalarFunction::Upper => Ok(Value::Text(first.to_string().to_uppercase())),
            ScalarFunction::Lower => Ok(Value::Text(first.to_string().to_lowercase())),
            ScalarFunction::Length => Ok(Value::Integer(first.to_string().len() as i64)),
            ScalarFunction::Round => round(first, values.get(1)),
            ScalarFunction::Coalesce => Ok(first.clone()),
        }
    }

    fn case(
        &self,
        operand: Option<&Expr>,
        when_clauses: &[(Expr, Expr)],
        else_clause: Option<&Expr>,
        scope: &Scope<'_>,
    ) -> Result<Value> {
        let operand = operand.map(|o| self.evaluate(o, scope)).transpose()?;
        for (when, then) in when_clauses {
            let hit = match &operand {
                Some(v) => compare(BinaryOperator::Eq, v, &self.evaluate(when, scope)?)?,
                None => self.truth(when, scope)?,
            };
            if hit.is_true() {
                return self.evaluate(then, scope);
            }
        }
        match else_clause {
            Some(e) => self.evaluate(e, scope),
            None => Ok(Value::Null),
        }
    }
}

fn negate_if(truth: Truth, negated: bool) -> Truth {
    if negated {
        !truth
    } else {
        truth
    }
}

/// Three-valued comparison
pub fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Result<Truth> {
    let ordering = left.sql_compare(right)?;
    Ok(Truth::from_ordering(ordering, |o| match op {
        BinaryOperator::Eq => o == Ordering::Equal,
        BinaryOperator::Neq => o != Ordering::Equal,
        BinaryOperator::Lt => o == Ordering::Less,
        BinaryOperator::Gt => o == Ordering::Greater,
        BinaryOperator::Lte => o != Ordering::Greater,
        BinaryOperator::Gte => o != Ordering::Less,
        _ => false,
    }))
}

/// SQL IN: TRUE on a match, UNKNOWN when no match but a NULL was involved
fn membership(probe: &Value, values: &[Value]) -> Result<Truth> {
    if values.is_empty() {
        return Ok(Truth::False);
    }
    if probe.is_null() {
        return Ok(Truth::Unknown);
    }
    let mut saw_null = false;
    for v in values {
        match probe.sql_compare(v)? {
            Some(Ordering::Equal) => return Ok(Truth::True),
            None => saw_null = true,
            Some(_) => {}
        }
    }
    Ok(if saw_null { Truth::Unknown } else { Truth::False })
}

fn date_of(value: &Value) -> Result<NaiveDate> {
    match value {
        Value::Timestamp(ts) => Ok(ts.date()),
        Value::Date(d) => Ok(*d),
        Value::Text(s) => match Value::parse_as(s, DataType::Date)? {
            Value::Date(d) => Ok(d),
            other => Err(Error::type_mismatch("DATE", other.type_name())),
        },
        other => Err(Error::type_mismatch(
            "a TIMESTAMP or DATE argument",
            other.type_name(),
        )),
    }
}

fn round(value: &Value, places: Option<&Value>) -> Result<Value> {
    let places = match places {
        None => 0,
        Some(p) => p
            .as_i64()
            .ok_or_else(|| Error::type_mismatch("an INTEGER number of places", p.type_name()))?,
    };
    if let (Value::Integer(_), true) = (value, places >= 0) {
        return Ok(value.clone());
    }
    let d = value
        .as_decimal()
        .ok_or_else(|| Error::type_mismatch("a numeric argument for ROUND", value.type_name()))?;

    let rounded = if places >= 0 {
        d.round_dp_with_strategy(places.min(28) as u32, RoundingStrategy::MidpointAwayFromZero)
    } else {
        let factor = Decimal::from(10i64.pow(places.unsigned_abs().min(18) as u32));
        d.checked_div(factor)
            .map(|q| q.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|q| q.checked_mul(factor))
            .ok_or_else(|| Error::Overflow(format!("ROUND({}, {})", value, places)))?
    };

    match value {
        Value::Integer(_) => Ok(rounded
            .to_i64()
            .map(Value::Integer)
            .unwrap_or(Value::Decimal(rounded))),
        _ => Ok(Value::Decimal(rounded)),
    }
}
