//! Typed conditions and condition groups.
//!
//! A [`Condition`] can only be built through [`Condition::new`], which checks the
//! field charset and the operator/value arity up front: IN needs a list, BETWEEN
//! needs exactly two bounds, scalar operators reject lists. Empty values (null or
//! `""`) pass construction untouched because the compiler skips them.

use super::operator::Operator;
use super::validate::validate_field;
use crate::error::QuarryError;
use crate::value::Value;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    operator: Operator,
    value: Value,
}

impl Condition {
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Result<Self, QuarryError> {
        let field = field.into();
        let value = value.into();
        validate_field(&field)?;
        check_arity(operator, &value)?;
        Ok(Self {
            field,
            operator,
            value,
        })
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Result<Self, QuarryError> {
        Self::new(field, Operator::Eq, value)
    }

    pub fn is_null(field: impl Into<String>) -> Result<Self, QuarryError> {
        Self::new(field, Operator::IsNull, Value::Null)
    }

    pub fn is_not_null(field: impl Into<String>) -> Result<Self, QuarryError> {
        Self::new(field, Operator::IsNotNull, Value::Null)
    }

    pub fn in_list<V: Into<Value>>(
        field: impl Into<String>,
        values: Vec<V>,
    ) -> Result<Self, QuarryError> {
        Self::new(field, Operator::In, Value::from(values))
    }

    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Self, QuarryError> {
        Self::new(
            field,
            Operator::Between,
            Value::List(vec![low.into(), high.into()]),
        )
    }

    /// Decode the loosely typed wire tuple `[field, value, operator?]`.
    pub fn from_tuple(tuple: &[serde_json::Value]) -> Result<Self, QuarryError> {
        if tuple.len() < 2 {
            return Err(QuarryError::InvalidCondition(format!(
                "condition needs at least a field and a value, got {} element(s)",
                tuple.len()
            )));
        }
        let field = tuple[0].as_str().ok_or_else(|| {
            QuarryError::InvalidCondition(format!("condition field must be a string, got {}", tuple[0]))
        })?;
        let operator = match tuple.get(2) {
            None | Some(serde_json::Value::Null) => Operator::Eq,
            Some(serde_json::Value::String(op)) => op.parse()?,
            Some(other) => return Err(QuarryError::InvalidOperator(other.to_string())),
        };
        Self::new(field, operator, Value::from(tuple[1].clone()))
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

fn check_arity(operator: Operator, value: &Value) -> Result<(), QuarryError> {
    if operator.is_nullary() || value.is_empty() {
        return Ok(());
    }
    if operator.takes_list() {
        return match value {
            Value::List(_) => Ok(()),
            other => Err(QuarryError::InvalidCondition(format!(
                "operator {} requires a list value, got {}",
                operator,
                other.type_name()
            ))),
        };
    }
    if operator.takes_range() {
        return match value {
            Value::List(bounds) if bounds.len() == 2 => Ok(()),
            Value::List(bounds) => Err(QuarryError::InvalidCondition(format!(
                "operator {} requires exactly 2 values, got {}",
                operator,
                bounds.len()
            ))),
            other => Err(QuarryError::InvalidCondition(format!(
                "operator {} requires a 2-element list, got {}",
                operator,
                other.type_name()
            ))),
        };
    }
    if let Value::List(_) = value {
        return Err(QuarryError::InvalidCondition(format!(
            "operator {} takes a single value, got a list",
            operator
        )));
    }
    Ok(())
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.field)?;
        tuple.serialize_element(&self.value)?;
        tuple.serialize_element(&self.operator)?;
        tuple.end()
    }
}

/// Boolean operator joining the conditions inside one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

/// Conditions joined by one combinator; sibling groups are always ANDed.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConditionGroup {
    conditions: Vec<Condition>,
    #[serde(rename = "operator")]
    combinator: Combinator,
}

impl ConditionGroup {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            conditions: Vec::new(),
            combinator,
        }
    }

    /// Group whose conditions are ANDed.
    pub fn all() -> Self {
        Self::new(Combinator::And)
    }

    /// Group whose conditions are ORed.
    pub fn any() -> Self {
        Self::new(Combinator::Or)
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Build a condition and add it; fails like [`Condition::new`].
    pub fn push(
        self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Result<Self, QuarryError> {
        Ok(self.with(Condition::new(field, operator, value)?))
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
