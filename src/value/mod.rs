//! Closed value variant carried by conditions, records and bound parameters.
//!
//! Every value that enters a statement is one of [`Value`]'s variants, so operator
//! arity checks and parameter binding are exhaustive matches instead of runtime
//! type probing.

use serde::{Deserialize, Serialize};
use std::fmt;

mod try_getable;

pub use try_getable::{TryGetable, ValueExtractionError};

/// A dynamically typed scalar or sequence.
///
/// Serializes untagged so the JSON wire form is the natural one:
/// `null`, `true`, `42`, `1.5`, `"abc"`, `[1, 2]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// `true` for `Null` and the empty string.
    ///
    /// Conditions carrying an empty value are skipped at compile time.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// `true` when the value equals its type's zero value.
    ///
    /// Uniqueness checks do not enforce zero-valued fields.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Text form used by the LIKE family. Sequences have no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::List(_) => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }

    /// Convert into a `sea_query::Value` for statement building.
    ///
    /// Lists are expanded by the caller (IN / BETWEEN); a list reaching this point
    /// is bound as its JSON text.
    pub fn to_sea_value(&self) -> sea_query::Value {
        match self {
            Value::Null => sea_query::Value::String(None),
            Value::Bool(b) => (*b).into(),
            Value::Int(i) => (*i).into(),
            Value::Float(f) => (*f).into(),
            Value::String(s) => s.clone().into(),
            Value::List(_) => serde_json::to_string(self).unwrap_or_default().into(),
        }
    }

    /// Convert a bound value produced by sea-query back into an engine value.
    pub fn from_sea_value(value: &sea_query::Value) -> Result<Value, ValueExtractionError> {
        use sea_query::Value as Sv;

        let converted = match value {
            Sv::Bool(Some(b)) => Value::Bool(*b),
            Sv::TinyInt(Some(i)) => Value::Int(i64::from(*i)),
            Sv::SmallInt(Some(i)) => Value::Int(i64::from(*i)),
            Sv::Int(Some(i)) => Value::Int(i64::from(*i)),
            Sv::BigInt(Some(i)) => Value::Int(*i),
            Sv::TinyUnsigned(Some(u)) => Value::Int(i64::from(*u)),
            Sv::SmallUnsigned(Some(u)) => Value::Int(i64::from(*u)),
            Sv::Unsigned(Some(u)) => Value::Int(i64::from(*u)),
            Sv::BigUnsigned(Some(u)) => Value::Int(i64::try_from(*u).map_err(|_| {
                ValueExtractionError::ConversionError(format!(
                    "BigUnsigned value {} exceeds i64::MAX",
                    u
                ))
            })?),
            Sv::Float(Some(f)) => Value::Float(f64::from(*f)),
            Sv::Double(Some(d)) => Value::Float(*d),
            Sv::String(Some(s)) => Value::String(s.to_string()),
            Sv::Char(Some(c)) => Value::String(c.to_string()),
            Sv::Bool(None)
            | Sv::TinyInt(None)
            | Sv::SmallInt(None)
            | Sv::Int(None)
            | Sv::BigInt(None)
            | Sv::TinyUnsigned(None)
            | Sv::SmallUnsigned(None)
            | Sv::Unsigned(None)
            | Sv::BigUnsigned(None)
            | Sv::Float(None)
            | Sv::Double(None)
            | Sv::String(None)
            | Sv::Char(None) => Value::Null,
            other => {
                return Err(ValueExtractionError::TypeMismatch {
                    expected: "scalar".to_string(),
                    actual: format!("{:?}", other),
                })
            }
        };
        Ok(converted)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        // Saturate rather than wrap; ids above i64::MAX do not exist in the store.
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
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

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            // Objects have no column form; keep their JSON text.
            obj @ serde_json::Value::Object(_) => Value::String(obj.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_only_for_null_and_empty_string() {
        assert!(Value::Null.is_empty());
        assert!(Value::String(String::new()).is_empty());
        assert!(!Value::Int(0).is_empty());
        assert!(!Value::Bool(false).is_empty());
        assert!(!Value::List(vec![]).is_empty());
    }

    #[test]
    fn test_zero_values() {
        assert!(Value::Int(0).is_zero());
        assert!(Value::Float(0.0).is_zero());
        assert!(Value::Bool(false).is_zero());
        assert!(Value::from("").is_zero());
        assert!(!Value::from("x").is_zero());
        assert!(!Value::Int(-1).is_zero());
    }

    #[test]
    fn test_untagged_json_shape() {
        let parsed: Vec<Value> = serde_json::from_str(r#"[null, true, 3, 2.5, "a", [1, "b"]]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(3),
                Value::Float(2.5),
                Value::from("a"),
                Value::List(vec![Value::Int(1), Value::from("b")]),
            ]
        );
    }

    #[test]
    fn test_sea_value_conversion_keeps_scalars() {
        let back = Value::from_sea_value(&Value::Int(7).to_sea_value()).unwrap();
        assert_eq!(back, Value::Int(7));
        let back = Value::from_sea_value(&Value::from("x").to_sea_value()).unwrap();
        assert_eq!(back, Value::from("x"));
        let back = Value::from_sea_value(&Value::Null.to_sea_value()).unwrap();
        assert_eq!(back, Value::Null);
    }

    #[test]
    fn test_option_and_vec_conversions() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(4_i32)), Value::Int(4));
        assert_eq!(
            Value::from(vec![1_i32, 2]),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }
}
