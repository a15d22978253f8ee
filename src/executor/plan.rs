//! Logical query plans
//!
//! A plan is a tree of operators; every node owns its children. Plans are
//! assembled with the fluent constructors below, e.g.
//!
//! ```
//! use quarry::executor::plan::{LogicalPlan, OrderByItem, SelectItem};
//! use quarry::expr::{col, lit};
//!
//! let plan = LogicalPlan::scan_as("customers", "c")
//!     .left_join(
//!         LogicalPlan::scan_as("orders", "o"),
//!         col("c.customer_id").eq(col("o.customer_id")),
//!     )
//!     .filter(col("o.total_amount").gt(lit(100)))
//!     .project(vec![SelectItem::expr(col("c.first_name")), SelectItem::expr(col("o.order_id"))])
//!     .sort(vec![OrderByItem::desc(col("o.order_id"))]);
//! assert!(plan.to_string().starts_with("Sort: o.order_id DESC"));
//! ```

use crate::expr::Expr;
use std::fmt;

/// Logical plan node
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalPlan {
    /// Scan a table; fields are qualified by the alias, or the table name
    Scan {
        table_name: String,
        alias: Option<String>,
    },
    /// Filter rows (WHERE, or HAVING above an aggregate)
    Filter {
        input: Box<LogicalPlan>,
        predicate: Expr,
    },
    /// Join two inputs; output rows are always `left ++ right`
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        join_type: JoinType,
        condition: Option<Expr>,
    },
    /// Group and aggregate
    Aggregate {
        input: Box<LogicalPlan>,
        group_by: Vec<GroupKey>,
        aggregates: Vec<AggregateExpr>,
    },
    /// Compute output columns
    Project {
        input: Box<LogicalPlan>,
        items: Vec<SelectItem>,
    },
    /// Remove duplicate rows
    Distinct { input: Box<LogicalPlan> },
    /// Stable multi-key sort
    Sort {
        input: Box<LogicalPlan>,
        order_by: Vec<OrderByItem>,
    },
    /// Skip `offset` rows, then emit at most `limit`
    Limit {
        input: Box<LogicalPlan>,
        limit: Option<usize>,
        offset: usize,
    },
    /// Re-qualify every output field (derived table / self-join alias)
    Alias {
        input: Box<LogicalPlan>,
        alias: String,
    },
    /// Combine two inputs of equal width
    SetCombine {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        op: SetOperator,
    },
}

/// Type of JOIN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Cross => "CROSS",
        };
        write!(f, "{}", s)
    }
}

/// Set operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    /// Distinct rows of both inputs
    Union,
    /// All rows of both inputs
    UnionAll,
    /// Distinct rows present in both inputs
    Intersect,
    /// Distinct rows of the left input absent from the right
    Except,
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SetOperator::Union => "UNION",
            SetOperator::UnionAll => "UNION ALL",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
        };
        write!(f, "{}", s)
    }
}

/// A single item in a projection list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// All columns (*)
    Wildcard,
    /// A table's all columns (table.*)
    QualifiedWildcard(String),
    /// An expression with optional alias
    Expr { expr: Expr, alias: Option<String> },
}

impl SelectItem {
    pub fn expr(expr: Expr) -> Self {
        SelectItem::Expr { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        SelectItem::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }

    pub fn all_of(qualifier: impl Into<String>) -> Self {
        SelectItem::QualifiedWildcard(qualifier.into())
    }
}

impl From<Expr> for SelectItem {
    fn from(expr: Expr) -> Self {
        SelectItem::expr(expr)
    }
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Wildcard => write!(f, "*"),
            SelectItem::QualifiedWildcard(q) => write!(f, "{}.*", q),
            SelectItem::Expr { expr, alias: None } => write!(f, "{}", expr),
            SelectItem::Expr {
                expr,
                alias: Some(a),
            } => write!(f, "{} AS {}", expr, a),
        }
    }
}

/// GROUP BY key, optionally named
#[derive(Debug, Clone, PartialEq)]
pub struct GroupKey {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl GroupKey {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

impl From<Expr> for GroupKey {
    fn from(expr: Expr) -> Self {
        Self::new(expr)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(a) => write!(f, "{} AS {}", self.expr, a),
            None => write!(f, "{}", self.expr),
        }
    }
}

/// Aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        };
        write!(f, "{}", s)
    }
}

/// One aggregate output column
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub func: AggregateFunction,
    /// `None` is `*` (COUNT only)
    pub arg: Option<Expr>,
    pub distinct: bool,
    pub alias: Option<String>,
}

impl AggregateExpr {
    fn new(func: AggregateFunction, arg: Option<Expr>, distinct: bool) -> Self {
        Self {
            func,
            arg,
            distinct,
            alias: None,
        }
    }

    /// COUNT(*)
    pub fn count_star() -> Self {
        Self::new(AggregateFunction::Count, None, false)
    }

    pub fn count(arg: Expr) -> Self {
        Self::new(AggregateFunction::Count, Some(arg), false)
    }

    pub fn count_distinct(arg: Expr) -> Self {
        Self::new(AggregateFunction::Count, Some(arg), true)
    }

    pub fn sum(arg: Expr) -> Self {
        Self::new(AggregateFunction::Sum, Some(arg), false)
    }

    pub fn avg(arg: Expr) -> Self {
        Self::new(AggregateFunction::Avg, Some(arg), false)
    }

    pub fn min(arg: Expr) -> Self {
        Self::new(AggregateFunction::Min, Some(arg), false)
    }

    pub fn max(arg: Expr) -> Self {
        Self::new(AggregateFunction::Max, Some(arg), false)
    }

    /// Name the output column
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Output column name: the alias, or the SQL text of the call
    pub fn output_name(&self) -> String {
        match &self.alias {
            Some(a) => a.clone(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.func)?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        match &self.arg {
            Some(arg) => write!(f, "{})", arg),
            None => write!(f, "*)"),
        }
    }
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    /// Expression to order by
    pub expr: Expr,
    /// Ascending (true) or descending (false)
    pub ascending: bool,
}

impl OrderByItem {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: true,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: false,
        }
    }
}

impl From<Expr> for OrderByItem {
    fn from(expr: Expr) -> Self {
        Self::asc(expr)
    }
}

impl fmt::Display for OrderByItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { "ASC" } else { "DESC" };
        write!(f, "{} {}", self.expr, dir)
    }
}

impl LogicalPlan {
    /// Scan a table under its own name
    pub fn scan(table_name: impl Into<String>) -> Self {
        LogicalPlan::Scan {
            table_name: table_name.into(),
            alias: None,
        }
    }

    /// Scan a table under an alias
    pub fn scan_as(table_name: impl Into<String>, alias: impl Into<String>) -> Self {
        LogicalPlan::Scan {
            table_name: table_name.into(),
            alias: Some(alias.into()),
        }
    }

    pub fn filter(self, predicate: Expr) -> Self {
        LogicalPlan::Filter {
            input: Box::new(self),
            predicate,
        }
    }

    /// HAVING: a filter over aggregated rows
    pub fn having(self, predicate: Expr) -> Self {
        self.filter(predicate)
    }

    pub fn join(self, right: LogicalPlan, join_type: JoinType, condition: Option<Expr>) -> Self {
        LogicalPlan::Join {
            left: Box::new(self),
            right: Box::new(right),
            join_type,
            condition,
        }
    }

    pub fn inner_join(self, right: LogicalPlan, condition: Expr) -> Self {
        self.join(right, JoinType::Inner, Some(condition))
    }

    pub fn left_join(self, right: LogicalPlan, condition: Expr) -> Self {
        self.join(right, JoinType::Left, Some(condition))
    }

    pub fn right_join(self, right: LogicalPlan, condition: Expr) -> Self {
        self.join(right, JoinType::Right, Some(condition))
    }

    pub fn cross_join(self, right: LogicalPlan) -> Self {
        self.join(right, JoinType::Cross, None)
    }

    pub fn aggregate(self, group_by: Vec<GroupKey>, aggregates: Vec<AggregateExpr>) -> Self {
        LogicalPlan::Aggregate {
            input: Box::new(self),
            group_by,
            aggregates,
        }
    }

    pub fn project(self, items: Vec<SelectItem>) -> Self {
        LogicalPlan::Project {
            input: Box::new(self),
            items,
        }
    }

    /// Project plain expressions
    pub fn select(self, exprs: Vec<Expr>) -> Self {
        self.project(exprs.into_iter().map(SelectItem::expr).collect())
    }

    pub fn distinct(self) -> Self {
        LogicalPlan::Distinct {
            input: Box::new(self),
        }
    }

    pub fn sort(self, order_by: Vec<OrderByItem>) -> Self {
        LogicalPlan::Sort {
            input: Box::new(self),
            order_by,
        }
    }

    pub fn limit(self, limit: usize) -> Self {
        self.limit_offset(Some(limit), 0)
    }

    pub fn limit_offset(self, limit: Option<usize>, offset: usize) -> Self {
        LogicalPlan::Limit {
            input: Box::new(self),
            limit,
            offset,
        }
    }

    pub fn alias(self, alias: impl Into<String>) -> Self {
        LogicalPlan::Alias {
            input: Box::new(self),
            alias: alias.into(),
        }
    }

    fn combine(self, right: LogicalPlan, op: SetOperator) -> Self {
        LogicalPlan::SetCombine {
            left: Box::new(self),
            right: Box::new(right),
            op,
        }
    }

    pub fn union(self, right: LogicalPlan) -> Self {
        self.combine(right, SetOperator::Union)
    }

    pub fn union_all(self, right: LogicalPlan) -> Self {
        self.combine(right, SetOperator::UnionAll)
    }

    pub fn intersect(self, right: LogicalPlan) -> Self {
        self.combine(right, SetOperator::Intersect)
    }

    pub fn except(self, right: LogicalPlan) -> Self {
        self.combine(right, SetOperator::Except)
    }

    /// Direct children of this node
    pub fn inputs(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Scan { .. } => vec![],
            LogicalPlan::Filter { input, .. }
            | LogicalPlan::Aggregate { input, .. }
            | LogicalPlan::Project { input, .. }
            | LogicalPlan::Distinct { input }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::Limit { input, .. }
            | LogicalPlan::Alias { input, .. } => vec![input.as_ref()],
            LogicalPlan::Join { left, right, .. } | LogicalPlan::SetCombine { left, right, .. } => {
                vec![left.as_ref(), right.as_ref()]
            }
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(items: &[T]) -> String {
            items
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
        match self {
            LogicalPlan::Scan {
                table_name,
                alias: Some(a),
            } => write!(f, "Scan: {} AS {}", table_name, a),
            LogicalPlan::Scan { table_name, .. } => write!(f, "Scan: {}", table_name),
            LogicalPlan::Filter { predicate, .. } => write!(f, "Filter: {}", predicate),
            LogicalPlan::Join {
                join_type,
                condition,
                ..
            } => match condition {
                Some(c) => write!(f, "Join: {} ON {}", join_type, c),
                None => write!(f, "Join: {}", join_type),
            },
            LogicalPlan::Aggregate {
                group_by,
                aggregates,
                ..
            } => write!(
                f,
                "Aggregate: group_by=[{}] aggregates=[{}]",
                list(group_by),
                list(aggregates)
            ),
            LogicalPlan::Project { items, .. } => write!(f, "Project: {}", list(items)),
            LogicalPlan::Distinct { .. } => write!(f, "Distinct"),
            LogicalPlan::Sort { order_by, .. } => write!(f, "Sort: {}", list(order_by)),
            LogicalPlan::Limit { limit, offset, .. } => match limit {
                Some(l) => write!(f, "Limit: {} offset={}", l, offset),
                None => write!(f, "Limit: none offset={}", offset),
            },
            LogicalPlan::Alias { alias, .. } => write!(f, "Alias: {}", alias),
            LogicalPlan::SetCombine { op, .. } => write!(f, "SetCombine: {}", op),
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}", "", indent = depth * 2)?;
        self.fmt_node(f)?;
        for input in self.inputs() {
            writeln!(f)?;
            input.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Indented operator tree, one node per line
impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, lit};

    #[test]
    fn test_builder_shapes() {
        let plan = LogicalPlan::scan_as("orders", "o")
            .filter(col("o.status").eq(lit("delivered")))
            .aggregate(
                vec![col("o.customer_id").into()],
                vec![AggregateExpr::count_star().alias("order_count")],
            )
            .having(col("order_count").gt(lit(1)))
            .limit(5);

        match &plan {
            LogicalPlan::Limit { limit, offset, input } => {
                assert_eq!(*limit, Some(5));
                assert_eq!(*offset, 0);
                assert!(matches!(**input, LogicalPlan::Filter { .. }));
            }
            other => panic!("unexpected root {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_names() {
        assert_eq!(AggregateExpr::count_star().output_name(), "COUNT(*)");
        assert_eq!(
            AggregateExpr::count_distinct(col("o.customer_id")).output_name(),
            "COUNT(DISTINCT o.customer_id)"
        );
        assert_eq!(
            AggregateExpr::avg(col("price")).alias("avg_price").output_name(),
            "avg_price"
        );
    }

    #[test]
    fn test_explain_tree() {
        let plan = LogicalPlan::scan_as("customers", "c")
            .inner_join(
                LogicalPlan::scan_as("orders", "o"),
                col("c.customer_id").eq(col("o.customer_id")),
            )
            .project(vec![SelectItem::Wildcard])
            .union(LogicalPlan::scan("customers").select(vec![col("customer_id")]));

        let text = plan.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "SetCombine: UNION");
        assert_eq!(lines[1], "  Project: *");
        assert_eq!(lines[2], "    Join: INNER ON c.customer_id = o.customer_id");
        assert_eq!(lines[3], "      Scan: customers AS c");
        assert_eq!(lines[4], "      Scan: orders AS o");
        assert_eq!(lines[5], "  Project: customer_id");
        assert_eq!(lines[6], "    Scan: customers");
    }
}
