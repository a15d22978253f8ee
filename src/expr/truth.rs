//! Three-valued logic

use crate::error::{Error, Result};
use crate::storage::Value;
use std::cmp::Ordering;

/// Outcome of a predicate: SQL's TRUE, FALSE or UNKNOWN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    /// Kleene conjunction
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    /// Kleene disjunction
    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    /// Only TRUE passes a filter; FALSE and UNKNOWN both reject the row.
    pub fn is_true(self) -> bool {
        self == Truth::True
    }

    pub fn is_unknown(self) -> bool {
        self == Truth::Unknown
    }

    /// Truth of a comparison result; `None` (a NULL operand) is UNKNOWN
    pub fn from_ordering(ordering: Option<Ordering>, accept: impl Fn(Ordering) -> bool) -> Truth {
        match ordering {
            Some(o) => Truth::from(accept(o)),
            None => Truth::Unknown,
        }
    }

    /// Interpret a value as a truth value: NULL is UNKNOWN and integers are
    /// true when non-zero. Any other type is not a truth value.
    pub fn from_value(value: &Value) -> Result<Truth> {
        match value {
            Value::Null => Ok(Truth::Unknown),
            Value::Integer(i) => Ok(Truth::from(*i != 0)),
            other => Err(Error::type_mismatch("a boolean value", other.type_name())),
        }
    }

    /// Scalar form of a truth value: 1, 0 or NULL
    pub fn into_value(self) -> Value {
        match self {
            Truth::True => Value::Integer(1),
            Truth::False => Value::Integer(0),
            Truth::Unknown => Value::Null,
        }
    }
}

impl std::ops::Not for Truth {
    type Output = Truth;

    fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b {
            Truth::True
        } else {
            Truth::False
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kleene_tables() {
        use Truth::*;
        assert_eq!(True.and(Unknown), Unknown);
        assert_eq!(False.and(Unknown), False);
        assert_eq!(True.or(Unknown), True);
        assert_eq!(False.or(Unknown), Unknown);
        assert_eq!(!Unknown, Unknown);
        assert_eq!(!False, True);
    }

    #[test]
    fn test_from_value() {
        assert_eq!(Truth::from_value(&Value::Null).unwrap(), Truth::Unknown);
        assert_eq!(Truth::from_value(&Value::Integer(2)).unwrap(), Truth::True);
        assert_eq!(Truth::from_value(&Value::Integer(0)).unwrap(), Truth::False);
        assert!(Truth::from_value(&Value::from("yes")).is_err());
    }

    #[test]
    fn test_scalar_form() {
        assert_eq!(Truth::True.into_value(), Value::Integer(1));
        assert!(Truth::Unknown.into_value().is_null());
    }
}
