//! TryGetable trait for safe value extraction
//!
//! Entities decode their fields out of a [`Record`](crate::Record) through this
//! trait, so a column that does not fit the Rust field type surfaces as an error
//! instead of a panic.

use super::Value;

/// Error type for value extraction failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExtractionError {
    /// The value is null
    NullValue,
    /// The value type doesn't match the expected type
    TypeMismatch { expected: String, actual: String },
    /// Value conversion failed (e.g., overflow, invalid format)
    ConversionError(String),
}

impl std::fmt::Display for ValueExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueExtractionError::NullValue => write!(f, "Value is null"),
            ValueExtractionError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
            ValueExtractionError::ConversionError(msg) => {
                write!(f, "Conversion error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ValueExtractionError {}

/// Trait for safe value extraction with error handling
///
/// ```rust
/// use quarry::{TryGetable, Value, ValueExtractionError};
///
/// let result: Result<i32, ValueExtractionError> = TryGetable::try_get(Value::Int(42));
/// assert_eq!(result, Ok(42));
///
/// let result: Result<i32, ValueExtractionError> = TryGetable::try_get(Value::Null);
/// assert!(matches!(result, Err(ValueExtractionError::NullValue)));
///
/// let result: Result<Option<i32>, ValueExtractionError> = TryGetable::try_get(Value::Null);
/// assert_eq!(result, Ok(None));
/// ```
pub trait TryGetable: Sized {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError>;
}

fn mismatch(expected: &str, value: &Value) -> ValueExtractionError {
    ValueExtractionError::TypeMismatch {
        expected: expected.to_string(),
        actual: value.type_name().to_string(),
    }
}

macro_rules! impl_try_getable_int {
    ($($type:ty),*) => {
        $(
            impl TryGetable for $type {
                fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
                    match value {
                        Value::Int(i) => <$type>::try_from(i).map_err(|_| {
                            ValueExtractionError::ConversionError(format!(
                                "{} out of range for {}",
                                i,
                                stringify!($type)
                            ))
                        }),
                        // Some drivers hand back booleans for tinyint(1) columns.
                        Value::Bool(b) => Ok(<$type>::from(b)),
                        Value::Null => Err(ValueExtractionError::NullValue),
                        other => Err(mismatch(stringify!($type), &other)),
                    }
                }
            }
        )*
    };
}

impl_try_getable_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl TryGetable for f64 {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Float(f) => Ok(f),
            // Whole-number aggregates come back as integers.
            Value::Int(i) => Ok(i as f64),
            Value::String(s) => s.parse::<f64>().map_err(|e| {
                ValueExtractionError::ConversionError(format!("'{}' is not a number: {}", s, e))
            }),
            Value::Null => Err(ValueExtractionError::NullValue),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl TryGetable for f32 {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        f64::try_get(value).map(|f| f as f32)
    }
}

impl TryGetable for bool {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            Value::Null => Err(ValueExtractionError::NullValue),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl TryGetable for String {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::String(s) => Ok(s),
            Value::Null => Err(ValueExtractionError::NullValue),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl TryGetable for Value {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        Ok(value)
    }
}

impl<T: TryGetable> TryGetable for Option<T> {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Null => Ok(None),
            other => T::try_get(other).map(Some),
        }
    }
}

impl<T: TryGetable> TryGetable for Vec<T> {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::List(items) => items.into_iter().map(T::try_get).collect(),
            Value::Null => Err(ValueExtractionError::NullValue),
            other => Err(mismatch("list", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_get_int_range_checked() {
        assert_eq!(i16::try_get(Value::Int(300)), Ok(300));
        assert!(matches!(
            i8::try_get(Value::Int(300)),
            Err(ValueExtractionError::ConversionError(_))
        ));
        assert!(matches!(
            u32::try_get(Value::Int(-1)),
            Err(ValueExtractionError::ConversionError(_))
        ));
    }

    #[test]
    fn test_try_get_type_mismatch() {
        let err = i32::try_get(Value::from("abc")).unwrap_err();
        assert_eq!(
            err,
            ValueExtractionError::TypeMismatch {
                expected: "i32".to_string(),
                actual: "string".to_string()
            }
        );
    }

    #[test]
    fn test_try_get_option() {
        assert_eq!(Option::<String>::try_get(Value::Null), Ok(None));
        assert_eq!(
            Option::<String>::try_get(Value::from("a")),
            Ok(Some("a".to_string()))
        );
    }

    #[test]
    fn test_try_get_float_accepts_int_and_text() {
        assert_eq!(f64::try_get(Value::Int(3)), Ok(3.0));
        assert_eq!(f64::try_get(Value::from("2.5")), Ok(2.5));
    }

    #[test]
    fn test_try_get_vec() {
        let v = Vec::<i64>::try_get(Value::List(vec![Value::Int(1), Value::Int(2)])).unwrap();
        assert_eq!(v, vec![1, 2]);
    }
}
