//! Tuple and Value types for Quarry
//!
//! This module defines how data values are represented in memory.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::catalog::DataType;
use crate::error::{Error, Result};

/// Display and parse format for timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Display and parse format for dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const TIMESTAMP_INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// A value in the database
#[derive(Debug, Clone)]
pub enum Value {
    /// NULL value
    Null,
    /// Integer value (64-bit)
    Integer(i64),
    /// Exact decimal value
    Decimal(Decimal),
    /// String value
    Text(String),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// Date value
    Date(NaiveDate),
}

fn midnight(date: &NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

// Value equality: NULL equals NULL, numbers compare by value (1 = 1.00) and a
// date equals the midnight timestamp of the same day. Hash agrees with it.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Integer(v) => {
                1u8.hash(state);
                Decimal::from(*v).hash(state);
            }
            Value::Decimal(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            Value::Text(v) => {
                2u8.hash(state);
                v.hash(state);
            }
            Value::Timestamp(v) => {
                3u8.hash(state);
                v.hash(state);
            }
            Value::Date(v) => {
                3u8.hash(state);
                midnight(v).hash(state);
            }
        }
    }
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a number
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Decimal(_))
    }

    /// The semantic type of this value; `None` for NULL
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(DataType::Integer),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::Text(_) => Some(DataType::Text),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::Date(_) => Some(DataType::Date),
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::Date(_) => "DATE",
        }
    }

    /// Try to convert to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    /// Try to convert to a decimal
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to borrow as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Number of decimal places carried by a numeric value
    pub fn scale(&self) -> u32 {
        match self {
            Value::Decimal(d) => d.scale(),
            _ => 0,
        }
    }

    /// Compare two non-NULL values of compatible types.
    ///
    /// Returns `None` if either side is NULL or the types cannot be compared.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
            (Value::Decimal(a), Value::Integer(b)) => Some(a.cmp(&Decimal::from(*b))),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),

            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),

            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Timestamp(b)) => Some(midnight(a).cmp(b)),
            (Value::Timestamp(a), Value::Date(b)) => Some(a.cmp(&midnight(b))),

            _ => None,
        }
    }

    /// SQL comparison: `Ok(None)` when either side is NULL (unknown),
    /// an error when the types are incompatible.
    pub fn sql_compare(&self, other: &Value) -> Result<Option<Ordering>> {
        if self.is_null() || other.is_null() {
            return Ok(None);
        }
        match self.compare(other) {
            Some(ordering) => Ok(Some(ordering)),
            None => Err(Error::type_mismatch(
                format!("a value comparable with {}", self.type_name()),
                other.type_name(),
            )),
        }
    }

    /// Total order used by ORDER BY: NULL first, then by value; values of
    /// incompatible types order by type family.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.family_rank().cmp(&other.family_rank())),
        }
    }

    fn family_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Decimal(_) => 1,
            Value::Text(_) => 2,
            Value::Timestamp(_) | Value::Date(_) => 3,
        }
    }

    fn arithmetic(
        &self,
        other: &Value,
        symbol: &str,
        int_op: fn(i64, i64) -> Option<i64>,
        dec_op: fn(Decimal, Decimal) -> Option<Decimal>,
    ) -> Result<Value> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }
        if let (Value::Integer(a), Value::Integer(b)) = (self, other) {
            if let Some(v) = int_op(*a, *b) {
                return Ok(Value::Integer(v));
            }
        }
        match (self.as_decimal(), other.as_decimal()) {
            (Some(a), Some(b)) => dec_op(a, b)
                .map(Value::Decimal)
                .ok_or_else(|| Error::Overflow(format!("{} {} {}", self, symbol, other))),
            _ => Err(Error::type_mismatch(
                format!("numeric operands for '{}'", symbol),
                format!("{} {} {}", self.type_name(), symbol, other.type_name()),
            )),
        }
    }

    /// Add two values
    pub fn add(&self, other: &Value) -> Result<Value> {
        self.arithmetic(other, "+", i64::checked_add, Decimal::checked_add)
    }

    /// Subtract two values
    pub fn sub(&self, other: &Value) -> Result<Value> {
        self.arithmetic(other, "-", i64::checked_sub, Decimal::checked_sub)
    }

    /// Multiply two values
    pub fn mul(&self, other: &Value) -> Result<Value> {
        self.arithmetic(other, "*", i64::checked_mul, Decimal::checked_mul)
    }

    /// Divide two values. The quotient is always a decimal rounded to the
    /// dividend's scale plus `scale_increment`; division by zero is NULL.
    pub fn div(&self, other: &Value, scale_increment: u32) -> Result<Value> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }
        match (self.as_decimal(), other.as_decimal()) {
            (Some(_), Some(b)) if b.is_zero() => Ok(Value::Null),
            (Some(a), Some(b)) => {
                let scale = self.scale().saturating_add(scale_increment);
                a.checked_div(b)
                    .map(|q| Value::Decimal(with_scale(q, scale)))
                    .ok_or_else(|| Error::Overflow(format!("{} / {}", self, other)))
            }
            _ => Err(Error::type_mismatch(
                "numeric operands for '/'",
                format!("{} / {}", self.type_name(), other.type_name()),
            )),
        }
    }

    /// Remainder of two values; modulo by zero is NULL
    pub fn rem(&self, other: &Value) -> Result<Value> {
        if other.as_decimal().is_some_and(|d| d.is_zero()) && self.is_numeric() {
            return Ok(Value::Null);
        }
        self.arithmetic(other, "%", i64::checked_rem, Decimal::checked_rem)
    }

    /// Arithmetic negation
    pub fn negate(&self) -> Result<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Integer(i) => Ok(i
                .checked_neg()
                .map(Value::Integer)
                .unwrap_or_else(|| Value::Decimal(-Decimal::from(*i)))),
            Value::Decimal(d) => Ok(Value::Decimal(-*d)),
            _ => Err(Error::type_mismatch("numeric operand for '-'", self.type_name())),
        }
    }

    /// Parse a textual literal as the given type
    pub fn parse_as(text: &str, data_type: DataType) -> Result<Value> {
        let trimmed = text.trim();
        let parsed = match data_type {
            DataType::Text => Some(Value::Text(text.to_string())),
            DataType::Integer => trimmed.parse().ok().map(Value::Integer),
            DataType::Decimal => Decimal::from_str(trimmed).ok().map(Value::Decimal),
            DataType::Timestamp => parse_timestamp(trimmed).map(Value::Timestamp),
            DataType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .ok()
                .or_else(|| parse_timestamp(trimmed).map(|ts| ts.date()))
                .map(Value::Date),
        };
        parsed.ok_or_else(|| Error::InvalidLiteral {
            value: text.to_string(),
            data_type,
        })
    }

    /// Convert this value to `data_type`, as done when rows are loaded into
    /// a table column.
    pub fn coerce_to(self, data_type: DataType) -> Result<Value> {
        match (self, data_type) {
            (Value::Null, _) => Ok(Value::Null),
            (v @ Value::Integer(_), DataType::Integer)
            | (v @ Value::Decimal(_), DataType::Decimal)
            | (v @ Value::Text(_), DataType::Text)
            | (v @ Value::Timestamp(_), DataType::Timestamp)
            | (v @ Value::Date(_), DataType::Date) => Ok(v),
            (Value::Integer(i), DataType::Decimal) => Ok(Value::Decimal(Decimal::from(i))),
            (Value::Decimal(d), DataType::Integer) => {
                let v = Value::Decimal(d);
                v.as_i64().map(Value::Integer).ok_or_else(|| Error::InvalidLiteral {
                    value: v.to_string(),
                    data_type,
                })
            }
            (Value::Text(s), target) => Value::parse_as(&s, target),
            (Value::Timestamp(ts), DataType::Date) => Ok(Value::Date(ts.date())),
            (Value::Date(d), DataType::Timestamp) => Ok(Value::Timestamp(midnight(&d))),
            (v, DataType::Text) => Ok(Value::Text(v.to_string())),
            (v, target) => Err(Error::type_mismatch(target.to_string(), v.type_name())),
        }
    }
}

/// Round `value` to exactly `scale` decimal places, padding with zeros
pub(crate) fn with_scale(value: Decimal, scale: u32) -> Decimal {
    let scale = scale.min(28);
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(|d| midnight(&d))
        })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

// Decimals and temporal values serialize as their display strings so that
// JSON output keeps exact scale.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Text(s) => serializer.serialize_str(s),
            other => serializer.collect_str(other),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A tuple (row) in the database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tuple {
    /// Values in this tuple
    values: Vec<Value>,
}

impl Tuple {
    /// Create a new tuple from values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Create an empty tuple
    pub fn empty() -> Self {
        Self { values: Vec::new() }
    }

    /// Create a tuple of `width` NULLs
    pub fn nulls(width: usize) -> Self {
        Self {
            values: vec![Value::Null; width],
        }
    }

    /// Get a value by index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Add a value to the tuple
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Get all values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Take ownership of the values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Concatenate two tuples (join output)
    pub fn concat(&self, other: &Tuple) -> Tuple {
        let mut values = Vec::with_capacity(self.values.len() + other.values.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);
        Tuple { values }
    }

    /// Get number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if tuple is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}
