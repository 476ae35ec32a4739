//! Scalar values carried by result-set rows and hydrated records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar column value.
///
/// Deserialises untagged from JSON: `null`, booleans, integers, floats and
/// strings. Nested arrays or objects are not scalar values and are rejected.
/// Integers land in `Int` when they fit an `i64` and in `UInt` otherwise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Check if this value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(v) => u64::try_from(*v).ok(),
            Value::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::UInt(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Identity of an entity within one iteration position.
///
/// Only values with exact equality can act as keys, so floats are excluded.
/// No coercion happens between variants: `Int(5)` and `Text("5")` differ.
/// `UInt` only holds integers above `i64::MAX`, so each integer has one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Text(String),
}

impl Key {
    /// Convert a column value into a key.
    ///
    /// Returns `Ok(None)` for NULL, and `Err` carrying the rejected value
    /// when the value cannot identify an entity.
    pub fn from_value(value: &Value) -> Result<Option<Key>, Value> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(v) => Ok(Some(Key::Bool(*v))),
            Value::Int(v) => Ok(Some(Key::Int(*v))),
            Value::UInt(v) => Ok(Some(Key::from(*v))),
            Value::Text(v) => Ok(Some(Key::Text(v.clone()))),
            Value::Float(_) => Err(value.clone()),
        }
    }

    /// Convert back into a column value.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Bool(v) => Value::Bool(*v),
            Key::Int(v) => Value::Int(*v),
            Key::UInt(v) => Value::UInt(*v),
            Key::Text(v) => Value::Text(v.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bool(v) => write!(f, "{}", v),
            Key::Int(v) => write!(f, "{}", v),
            Key::UInt(v) => write!(f, "{}", v),
            Key::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<u64> for Key {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => Key::Int(v),
            Err(_) => Key::UInt(v),
        }
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Text(v.to_string())
    }
}
