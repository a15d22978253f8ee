//! Scalar expressions
//!
//! - Expression tree and builders
//! - Three-valued truth values
//! - Row-scoped evaluation with correlated outer scopes
//! - LIKE pattern matching

pub mod ast;
pub mod eval;
pub mod like;
pub mod truth;

pub use ast::{
    case_when, col, exists, func, lit, not_exists, null, scalar, BinaryOperator, ColumnRef, Expr,
    ScalarFunction, UnaryOperator,
};
pub use eval::{Evaluator, Scope, SubqueryRunner};
pub use truth::Truth;
