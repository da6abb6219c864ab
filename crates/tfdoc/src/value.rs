//! value representation
//!
//! The output model contains the following data types
//! - null
//! - boolean (true/false)
//! - integer (signed, i128)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! [Value::from_typed] is the conversion from evaluated configuration values. It fails for values the model cannot
//! represent, callers fall back to the raw expression text in that case.
//!
//! Integral numbers are emitted as integers as long as they fit into an `i128`. Evaluated numbers are at most `u64`
//! wide unless they came from a float, so only such floats end up as decimals despite being integral.
use crate::typed::{Number, TypedValue};
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

pub type Object = indexmap::IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i128),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
}

impl Value {
    /// Convert an evaluated value
    ///
    /// Unknown values become [Value::Null]. Returns `None` if the value (or any value nested in it) is opaque.
    pub fn from_typed(value: &TypedValue) -> Option<Value> {
        match value {
            TypedValue::Null | TypedValue::Unknown => Some(Value::Null),
            TypedValue::String(s) => Some(s.as_str().into()),
            TypedValue::Number(n) => Some(n.into()),
            TypedValue::Bool(b) => Some((*b).into()),
            TypedValue::List(items) => items
                .iter()
                .map(Value::from_typed)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            TypedValue::Object(members) => members
                .iter()
                .map(|(key, member)| Some((key.clone(), Value::from_typed(member)?)))
                .collect::<Option<Object>>()
                .map(Value::Object),
            TypedValue::Opaque(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(object) => object.get(key),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(int) => i64::try_from(*int).ok(),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        i128::try_from(value).map_or(Value::Decimal(value as f64), Value::Integer)
    }
}

impl From<&Number> for Value {
    fn from(value: &Number) -> Self {
        match value.as_i128() {
            Some(int) => Value::Integer(int),
            None => Value::Decimal(value.as_f64()),
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i128(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}
