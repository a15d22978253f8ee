//! Data types for Quarry
//!
//! This module defines the semantic column types supported by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer
    #[serde(alias = "int", alias = "bigint")]
    Integer,
    /// Exact fixed-point decimal
    #[serde(alias = "numeric")]
    Decimal,
    /// Variable-length character string
    #[serde(alias = "varchar", alias = "string")]
    Text,
    /// Date and time of day, no time zone
    #[serde(alias = "datetime")]
    Timestamp,
    /// Calendar date
    Date,
}

impl DataType {
    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Decimal)
    }

    /// Check if this type is a date/time type
    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Timestamp | DataType::Date)
    }

    /// Check if this type is comparable with another type
    pub fn is_comparable_with(&self, other: &DataType) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (a, b) if a.is_temporal() && b.is_temporal() => true,
            _ => false,
        }
    }

    /// The common type of two comparable types (numeric widening to DECIMAL,
    /// temporal widening to TIMESTAMP)
    pub fn unify(&self, other: &DataType) -> Option<DataType> {
        match (self, other) {
            (a, b) if a == b => Some(*a),
            (a, b) if a.is_numeric() && b.is_numeric() => Some(DataType::Decimal),
            (a, b) if a.is_temporal() && b.is_temporal() => Some(DataType::Timestamp),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Decimal => write!(f, "DECIMAL"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Date => write!(f, "DATE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_comparison() {
        assert!(DataType::Integer.is_comparable_with(&DataType::Decimal));
        assert!(DataType::Date.is_comparable_with(&DataType::Timestamp));
        assert!(!DataType::Integer.is_comparable_with(&DataType::Text));
        assert!(!DataType::Text.is_comparable_with(&DataType::Timestamp));
    }

    #[test]
    fn test_unify() {
        assert_eq!(
            DataType::Integer.unify(&DataType::Decimal),
            Some(DataType::Decimal)
        );
        assert_eq!(DataType::Text.unify(&DataType::Text), Some(DataType::Text));
        assert_eq!(DataType::Text.unify(&DataType::Integer), None);
    }

    #[test]
    fn test_deserialize_aliases() {
        let t: DataType = serde_json::from_str("\"varchar\"").unwrap();
        assert_eq!(t, DataType::Text);
        let t: DataType = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(t, DataType::Timestamp);
        let t: DataType = serde_json::from_str("\"decimal\"").unwrap();
        assert_eq!(t, DataType::Decimal);
    }
}
