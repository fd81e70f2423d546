//! 内容对象的通用类型定义
//!
//! 属性值、属性类型与基数，以及对象 ID

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 对象 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// 属性值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Boolean,
    Integer,
    Decimal,
    String,
    DateTime,
    Id,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Boolean => "boolean",
            PropertyType::Integer => "integer",
            PropertyType::Decimal => "decimal",
            PropertyType::String => "string",
            PropertyType::DateTime => "datetime",
            PropertyType::Id => "id",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 属性基数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Single,
    Multi,
}

/// 单个类型化的值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<Utc>),
    Id(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Id(_) => "id",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) | Value::Id(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view used for mixed integer/decimal comparison.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(v) => Some(Decimal::from(*v)),
            Value::Decimal(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) | Value::Id(v) => f.write_str(v),
            Value::DateTime(v) => f.write_str(&v.to_rfc3339()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

/// 对象上存储的属性值（单值或多值）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Single(Value),
    Multi(Vec<Value>),
}

impl PropertyValue {
    /// All stored values, in order. A single value yields one item.
    pub fn values(&self) -> &[Value] {
        match self {
            PropertyValue::Single(v) => std::slice::from_ref(v),
            PropertyValue::Multi(vs) => vs,
        }
    }

    pub fn single(&self) -> Option<&Value> {
        match self {
            PropertyValue::Single(v) => Some(v),
            PropertyValue::Multi(vs) if vs.len() == 1 => vs.first(),
            PropertyValue::Multi(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PropertyValue::Multi(vs) if vs.is_empty())
    }
}

impl From<Value> for PropertyValue {
    fn from(v: Value) -> Self {
        PropertyValue::Single(v)
    }
}

macro_rules! impl_single_property_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PropertyValue {
                fn from(v: $t) -> Self {
                    PropertyValue::Single(Value::from(v))
                }
            }
        )*
    };
}

impl_single_property_value!(bool, i64, Decimal, String, &str, DateTime<Utc>);

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Single(v) => write!(f, "{}", v),
            PropertyValue::Multi(vs) => {
                let parts: Vec<String> = vs.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_view() {
        assert_eq!(Value::Integer(5).as_decimal(), Some(Decimal::from(5)));
        assert_eq!(Value::String("5".into()).as_decimal(), None);
    }

    #[test]
    fn test_property_value_views() {
        let single = PropertyValue::from(42i64);
        assert_eq!(single.values(), &[Value::Integer(42)]);
        assert_eq!(single.single(), Some(&Value::Integer(42)));

        let multi = PropertyValue::Multi(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(multi.values().len(), 2);
        assert!(multi.single().is_none());
        assert!(!multi.is_empty());
        assert!(PropertyValue::Multi(Vec::new()).is_empty());
        assert_eq!(multi.to_string(), "[a, b]");
    }
}
