//! Scalar expression tree
//!
//! Expressions are built directly (there is no SQL text front end), either
//! from the variants or with the helper constructors in this module:
//!
//! ```
//! use quarry::expr::{col, lit};
//!
//! let big_orders = col("o.total_amount").gt(lit(100)).and(col("o.status").eq(lit("delivered")));
//! assert_eq!(big_orders.to_string(), "o.total_amount > 100 AND o.status = 'delivered'");
//! ```

use crate::catalog::{DataType, RowSchema};
use crate::executor::plan::LogicalPlan;
use crate::storage::Value;
use std::fmt;

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Column(ColumnRef),
    /// Literal value
    Literal(Value),
    /// Binary operation
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },
    /// Scalar function call
    Function {
        func: ScalarFunction,
        args: Vec<Expr>,
    },
    /// IS NULL
    IsNull(Box<Expr>),
    /// IS NOT NULL
    IsNotNull(Box<Expr>),
    /// BETWEEN
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// IN (list)
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// LIKE
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    /// CASE expression, simple when `operand` is set, searched otherwise
    Case {
        operand: Option<Box<Expr>>,
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },
    /// [NOT] EXISTS (subquery)
    Exists {
        subquery: Box<LogicalPlan>,
        negated: bool,
    },
    /// expr [NOT] IN (subquery)
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<LogicalPlan>,
        negated: bool,
    },
    /// Subquery producing a single value
    ScalarSubquery(Box<LogicalPlan>),
}

/// Column reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Table name or alias (optional)
    pub table: Option<String>,
    /// Column name
    pub column: String,
}

impl ColumnRef {
    /// Parse `"alias.column"` or `"column"`
    pub fn parse(name: &str) -> Self {
        match name.split_once('.') {
            Some((table, column)) => Self {
                table: Some(table.to_string()),
                column: column.to_string(),
            },
            None => Self {
                table: None,
                column: name.to_string(),
            },
        }
    }
}

impl From<String> for ColumnRef {
    fn from(column: String) -> Self {
        Self {
            table: None,
            column,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(t) => write!(f, "{}.{}", t, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOperator {
    /// Get the precedence of this operator (higher = binds tighter)
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Eq
            | BinaryOperator::Neq
            | BinaryOperator::Lt
            | BinaryOperator::Gt
            | BinaryOperator::Lte
            | BinaryOperator::Gte => 3,
            BinaryOperator::Add | BinaryOperator::Sub => 4,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 5,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 3
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Neq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Gte => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// NOT
    Not,
    /// - (negation)
    Minus,
}

/// Built-in scalar functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFunction {
    /// CONCAT(a, b, ...), NULL if any argument is NULL
    Concat,
    /// DATE(ts), calendar date of a timestamp
    Date,
    Year,
    Month,
    Upper,
    Lower,
    /// LENGTH(s) in bytes
    Length,
    /// ROUND(x [, places]), half away from zero
    Round,
    /// COALESCE(a, b, ...), first non-NULL argument
    Coalesce,
}

impl ScalarFunction {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::Concat => "CONCAT",
            ScalarFunction::Date => "DATE",
            ScalarFunction::Year => "YEAR",
            ScalarFunction::Month => "MONTH",
            ScalarFunction::Upper => "UPPER",
            ScalarFunction::Lower => "LOWER",
            ScalarFunction::Length => "LENGTH",
            ScalarFunction::Round => "ROUND",
            ScalarFunction::Coalesce => "COALESCE",
        }
    }

    /// Look a function up by (case-insensitive) name
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name.to_ascii_uppercase().as_str() {
            "CONCAT" => ScalarFunction::Concat,
            "DATE" => ScalarFunction::Date,
            "YEAR" => ScalarFunction::Year,
            "MONTH" => ScalarFunction::Month,
            "UPPER" | "UCASE" => ScalarFunction::Upper,
            "LOWER" | "LCASE" => ScalarFunction::Lower,
            "LENGTH" => ScalarFunction::Length,
            "ROUND" => ScalarFunction::Round,
            "COALESCE" => ScalarFunction::Coalesce,
            _ => return None,
        };
        Some(func)
    }

    /// Accepted argument counts as `(min, max)`; `None` means unbounded
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            ScalarFunction::Concat | ScalarFunction::Coalesce => (1, None),
            ScalarFunction::Round => (1, Some(2)),
            _ => (1, Some(1)),
        }
    }
}

impl fmt::Display for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Column reference from `"column"` or `"alias.column"`
pub fn col(name: &str) -> Expr {
    Expr::Column(ColumnRef::parse(name))
}

/// Literal value
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// NULL literal
pub fn null() -> Expr {
    Expr::Literal(Value::Null)
}

/// Scalar function call
pub fn func(func: ScalarFunction, args: Vec<Expr>) -> Expr {
    Expr::Function { func, args }
}

/// EXISTS (subquery)
pub fn exists(subquery: LogicalPlan) -> Expr {
    Expr::Exists {
        subquery: Box::new(subquery),
        negated: false,
    }
}

/// NOT EXISTS (subquery)
pub fn not_exists(subquery: LogicalPlan) -> Expr {
    Expr::Exists {
        subquery: Box::new(subquery),
        negated: true,
    }
}

/// Scalar subquery
pub fn scalar(subquery: LogicalPlan) -> Expr {
    Expr::ScalarSubquery(Box::new(subquery))
}

/// Searched CASE expression
pub fn case_when(when_clauses: Vec<(Expr, Expr)>, else_clause: Option<Expr>) -> Expr {
    Expr::Case {
        operand: None,
        when_clauses,
        else_clause: else_clause.map(Box::new),
    }
}

impl Expr {
    fn binary(self, op: BinaryOperator, right: Expr) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Eq, other)
    }

    pub fn not_eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Neq, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Lt, other)
    }

    pub fn lt_eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Lte, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Gt, other)
    }

    pub fn gt_eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Gte, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Or, other)
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }

    pub fn between(self, low: Expr, high: Expr) -> Expr {
        Expr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    pub fn in_list(self, list: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    pub fn not_in_list(self, list: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self),
            list,
            negated: true,
        }
    }

    pub fn in_subquery(self, subquery: LogicalPlan) -> Expr {
        Expr::InSubquery {
            expr: Box::new(self),
            subquery: Box::new(subquery),
            negated: false,
        }
    }

    pub fn not_in_subquery(self, subquery: LogicalPlan) -> Expr {
        Expr::InSubquery {
            expr: Box::new(self),
            subquery: Box::new(subquery),
            negated: true,
        }
    }

    pub fn like(self, pattern: impl Into<String>) -> Expr {
        Expr::Like {
            expr: Box::new(self),
            pattern: Box::new(lit(pattern.into())),
            negated: false,
        }
    }

    pub fn not_like(self, pattern: impl Into<String>) -> Expr {
        Expr::Like {
            expr: Box::new(self),
            pattern: Box::new(lit(pattern.into())),
            negated: true,
        }
    }

    /// The column this expression directly references, if it is a bare column
    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Expr::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Split a conjunction into its AND-ed terms
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                let mut terms = left.conjuncts();
                terms.extend(right.conjuncts());
                terms
            }
            other => vec![other],
        }
    }

    /// Best-effort static type of this expression against `schema`.
    ///
    /// Predicates have type INTEGER (1/0). `None` means the type cannot be
    /// determined without evaluating (NULL literals, outer references,
    /// scalar subqueries).
    pub fn data_type(&self, schema: &RowSchema) -> Option<DataType> {
        match self {
            Expr::Column(c) => schema
                .resolve(c.table.as_deref(), &c.column)
                .ok()
                .flatten()
                .and_then(|i| schema.field(i))
                .and_then(|f| f.data_type),
            Expr::Literal(v) => v.data_type(),
            Expr::BinaryOp { left, op, right } => match op {
                BinaryOperator::Div => Some(DataType::Decimal),
                BinaryOperator::Add
                | BinaryOperator::Sub
                | BinaryOperator::Mul
                | BinaryOperator::Mod => {
                    let l = left.data_type(schema)?;
                    let r = right.data_type(schema)?;
                    l.unify(&r).filter(|t| t.is_numeric())
                }
                _ => Some(DataType::Integer),
            },
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr,
            } => expr.data_type(schema),
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                ..
            } => Some(DataType::Integer),
            Expr::Function { func, args } => match func {
                ScalarFunction::Concat | ScalarFunction::Upper | ScalarFunction::Lower => {
                    Some(DataType::Text)
                }
                ScalarFunction::Date => Some(DataType::Date),
                ScalarFunction::Year | ScalarFunction::Month | ScalarFunction::Length => {
                    Some(DataType::Integer)
                }
                ScalarFunction::Round => args.first().and_then(|a| a.data_type(schema)),
                ScalarFunction::Coalesce => unify_all(args.iter(), schema),
            },
            Expr::Case {
                when_clauses,
                else_clause,
                ..
            } => unify_all(
                when_clauses
                    .iter()
                    .map(|(_, then)| then)
                    .chain(else_clause.as_deref()),
                schema,
            ),
            Expr::IsNull(_)
            | Expr::IsNotNull(_)
            | Expr::Between { .. }
            | Expr::InList { .. }
            | Expr::Like { .. }
            | Expr::Exists { .. }
            | Expr::InSubquery { .. } => Some(DataType::Integer),
            Expr::ScalarSubquery(_) => None,
        }
    }
}

fn unify_all<'a>(exprs: impl Iterator<Item = &'a Expr>, schema: &RowSchema) -> Option<DataType> {
    let mut result: Option<DataType> = None;
    for expr in exprs {
        if let Some(t) = expr.data_type(schema) {
            result = match result {
                None => Some(t),
                Some(prev) => Some(prev.unify(&t)?),
            };
        }
    }
    result
}

impl std::ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        self.binary(BinaryOperator::Add, rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        self.binary(BinaryOperator::Sub, rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        self.binary(BinaryOperator::Mul, rhs)
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        self.binary(BinaryOperator::Div, rhs)
    }
}

impl std::ops::Rem for Expr {
    type Output = Expr;

    fn rem(self, rhs: Expr) -> Expr {
        self.binary(BinaryOperator::Mod, rhs)
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(self),
        }
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: Box::new(self),
        }
    }
}

/// Wrap `expr` in parentheses when it binds looser than `parent`
fn fmt_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, parent: u8) -> fmt::Result {
    match expr {
        Expr::BinaryOp { op, .. } if op.precedence() < parent => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

fn fmt_list(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (i, e) in exprs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", e)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = |negated: bool| if negated { "NOT " } else { "" };
        match self {
            Expr::Column(c) => write!(f, "{}", c),
            Expr::Literal(Value::Text(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Expr::Literal(v @ (Value::Timestamp(_) | Value::Date(_))) => write!(f, "'{}'", v),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::BinaryOp { left, op, right } => {
                let p = op.precedence();
                fmt_operand(f, left, p)?;
                write!(f, " {} ", op.symbol())?;
                // right operand of a left-associative operator needs parens at equal precedence
                fmt_operand(f, right, p + 1)
            }
            Expr::UnaryOp { op, expr } => {
                match op {
                    UnaryOperator::Not => write!(f, "NOT ")?,
                    UnaryOperator::Minus => write!(f, "-")?,
                }
                fmt_operand(f, expr, u8::MAX)
            }
            Expr::Function { func, args } => {
                write!(f, "{}(", func)?;
                fmt_list(f, args)?;
                write!(f, ")")
            }
            Expr::IsNull(e) => write!(f, "{} IS NULL", e),
            Expr::IsNotNull(e) => write!(f, "{} IS NOT NULL", e),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => write!(f, "{} {}BETWEEN {} AND {}", expr, not(*negated), low, high),
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                write!(f, "{} {}IN (", expr, not(*negated))?;
                fmt_list(f, list)?;
                write!(f, ")")
            }
            Expr::Like {
                expr,
                pattern,
                negated,
            } => write!(f, "{} {}LIKE {}", expr, not(*negated), pattern),
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                write!(f, "CASE")?;
                if let Some(op) = operand {
                    write!(f, " {}", op)?;
                }
                for (when, then) in when_clauses {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(e) = else_clause {
                    write!(f, " ELSE {}", e)?;
                }
                write!(f, " END")
            }
            Expr::Exists { negated, .. } => write!(f, "{}EXISTS (subquery)", not(*negated)),
            Expr::InSubquery { expr, negated, .. } => {
                write!(f, "{} {}IN (subquery)", expr, not(*negated))
            }
            Expr::ScalarSubquery(_) => write!(f, "(subquery)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Field;

    #[test]
    fn test_column_ref_parse() {
        let c = ColumnRef::parse("o.order_id");
        assert_eq!(c.table.as_deref(), Some("o"));
        assert_eq!(c.column, "order_id");
        assert_eq!(ColumnRef::parse("email").table, None);
    }

    #[test]
    fn test_display() {
        let e = (col("price") + lit(1)) * lit(2);
        assert_eq!(e.to_string(), "(price + 1) * 2");

        let e = col("a") - lit(1) - lit(2);
        assert_eq!(e.to_string(), "a - 1 - 2");

        let e = func(
            ScalarFunction::Concat,
            vec![col("first_name"), lit(" "), col("last_name")],
        );
        assert_eq!(e.to_string(), "CONCAT(first_name, ' ', last_name)");

        let e = col("email").like("%@example.com").or(col("email").is_null());
        assert_eq!(e.to_string(), "email LIKE '%@example.com' OR email IS NULL");
    }

    #[test]
    fn test_conjuncts() {
        let e = col("a").eq(col("b")).and(col("c").gt(lit(1))).and(col("d").is_null());
        assert_eq!(e.conjuncts().len(), 3);
        assert_eq!(col("a").or(col("b")).conjuncts().len(), 1);
    }

    #[test]
    fn test_data_type_inference() {
        let schema = RowSchema::new(vec![
            Field::new("quantity", Some(DataType::Integer)).qualified("oi"),
            Field::new("unit_price", Some(DataType::Decimal)).qualified("oi"),
            Field::new("order_date", Some(DataType::Timestamp)).qualified("o"),
        ]);
        assert_eq!(
            (col("quantity") * col("oi.unit_price")).data_type(&schema),
            Some(DataType::Decimal)
        );
        assert_eq!(
            (col("quantity") + lit(1)).data_type(&schema),
            Some(DataType::Integer)
        );
        assert_eq!(
            func(ScalarFunction::Date, vec![col("order_date")]).data_type(&schema),
            Some(DataType::Date)
        );
        assert_eq!(col("missing").data_type(&schema), None);
        assert_eq!(null().data_type(&schema), None);
    }

    #[test]
    fn test_function_lookup() {
        assert_eq!(ScalarFunction::from_name("concat"), Some(ScalarFunction::Concat));
        assert_eq!(ScalarFunction::from_name("nope"), None);
        assert_eq!(ScalarFunction::Round.arity(), (1, Some(2)));
    }
}
