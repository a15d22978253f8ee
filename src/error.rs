//! Error types for Quarry
//!
//! This module defines all error types used throughout the query engine.

use crate::catalog::DataType;
use thiserror::Error;

/// The main error type for Quarry
#[derive(Error, Debug)]
pub enum Error {
    // ========== Catalog Errors ==========
    #[error("Catalog error: table '{0}' not found")]
    TableNotFound(String),

    #[error("Catalog error: table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Catalog error: unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Catalog error: column reference '{0}' is ambiguous")]
    AmbiguousColumn(String),

    #[error("Catalog error: {0}")]
    SchemaError(String),

    // ========== Data Errors ==========
    #[error("Data error: primary key violation for table '{0}'")]
    PrimaryKeyViolation(String),

    #[error("Data error: null value not allowed for column '{0}'")]
    NullNotAllowed(String),

    #[error("Data error: table '{table}' expects {expected} values per row, found {found}")]
    RowArityMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("Data error: cannot read '{value}' as {data_type}")]
    InvalidLiteral { value: String, data_type: DataType },

    // ========== Type Errors ==========
    #[error("Type error: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    // ========== Execution Errors ==========
    #[error("Execution error: join condition must be boolean, found {0}")]
    JoinConditionError(String),

    #[error("Execution error: invalid aggregate - {0}")]
    InvalidAggregate(String),

    #[error("Execution error: subquery returned {0}")]
    MultiValueSubquery(String),

    #[error("Execution error: set operation inputs have {left} and {right} columns")]
    SetArityMismatch { left: usize, right: usize },

    #[error("Execution error: numeric overflow in {0}")]
    Overflow(String),

    // ========== Configuration Errors ==========
    #[error("Config error: invalid value '{value}' for {key}")]
    Config { key: String, value: String },

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a type mismatch between an expectation and a found type
    pub(crate) fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Result type alias for Quarry operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TableNotFound("orders".to_string());
        assert_eq!(err.to_string(), "Catalog error: table 'orders' not found");

        let err = Error::type_mismatch("numeric", "TEXT");
        assert_eq!(err.to_string(), "Type error: expected numeric, found TEXT");

        let err = Error::InvalidLiteral {
            value: "yesterday".to_string(),
            data_type: DataType::Timestamp,
        };
        assert_eq!(
            err.to_string(),
            "Data error: cannot read 'yesterday' as TIMESTAMP"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::IoError(_)));
    }
}
