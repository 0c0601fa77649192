//! Search tree to `WHERE` predicate.

use super::column;
use crate::config::EngineConfig;
use crate::error::QuarryError;
use crate::query::{Combinator, Condition as QueryCondition, ConditionGroup, Operator, Query};
use crate::value::Value;
use sea_query::{Condition, Expr, ExprTrait};

/// Compile `query`'s search tree and required fields into one predicate.
///
/// Returns `None` when every condition was skipped and nothing is required.
pub fn search_condition(query: &Query, config: &EngineConfig) -> Result<Option<Condition>, QuarryError> {
    query.check_required()?;

    let mut all = Condition::all();
    for group in query.search_groups() {
        if let Some(compiled) = group_condition(group, config)? {
            all = all.add(compiled);
        }
    }

    for field in query.required_fields() {
        all = all
            .add(column(field)?.is_not_null())
            .add(column(field)?.ne(""));
    }

    Ok((!all.is_empty()).then_some(all))
}

fn group_condition(group: &ConditionGroup, config: &EngineConfig) -> Result<Option<Condition>, QuarryError> {
    let mut compiled = match group.combinator() {
        Combinator::And => Condition::all(),
        Combinator::Or => Condition::any(),
    };
    for condition in group.conditions() {
        if skips(condition, config) {
            log::trace!("skipping empty condition on {}", condition.field());
            continue;
        }
        compiled = compiled.add(condition_expr(condition)?);
    }
    Ok((!compiled.is_empty()).then_some(compiled))
}

/// The empty-value rule: a null or `""` value drops the condition. IS [NOT] NULL
/// never drops, and a scalar comparison against `""` is kept on fields configured
/// to match empty strings. Null is dropped on every field.
fn skips(condition: &QueryCondition, config: &EngineConfig) -> bool {
    let op = condition.operator();
    if op.is_nullary() {
        return false;
    }
    match condition.value() {
        Value::Null => true,
        Value::String(s) if s.is_empty() => {
            let scalar = !op.takes_list() && !op.takes_range();
            !(scalar && config.allows_empty_match(condition.field()))
        }
        _ => false,
    }
}

/// One condition as a parameterized expression.
pub fn condition_expr(condition: &QueryCondition) -> Result<Expr, QuarryError> {
    let col = column(condition.field())?;
    let value = condition.value();
    let op = condition.operator();

    let expr = match op {
        Operator::IsNull => col.is_null(),
        Operator::IsNotNull => col.is_not_null(),
        Operator::In | Operator::NotIn => {
            let items = list_of(op, value)?
                .iter()
                .map(Value::to_sea_value)
                .collect::<Vec<_>>();
            if op == Operator::In {
                col.is_in(items)
            } else {
                col.is_not_in(items)
            }
        }
        Operator::Between | Operator::NotBetween => match list_of(op, value)? {
            [low, high] => {
                if op == Operator::Between {
                    col.between(low.to_sea_value(), high.to_sea_value())
                } else {
                    col.not_between(low.to_sea_value(), high.to_sea_value())
                }
            }
            bounds => {
                return Err(QuarryError::InvalidCondition(format!(
                    "operator {} requires exactly 2 values, got {}",
                    op,
                    bounds.len()
                )))
            }
        },
        Operator::Like | Operator::NotLike | Operator::LeftLike | Operator::RightLike => {
            let pattern = like_pattern(op, value)?;
            if op == Operator::NotLike {
                col.not_like(pattern)
            } else {
                col.like(pattern)
            }
        }
        Operator::Eq => col.eq(value.to_sea_value()),
        Operator::Ne | Operator::NotEqual => col.ne(value.to_sea_value()),
        Operator::Gt => col.gt(value.to_sea_value()),
        Operator::Gte => col.gte(value.to_sea_value()),
        Operator::Lt => col.lt(value.to_sea_value()),
        Operator::Lte => col.lte(value.to_sea_value()),
    };
    Ok(expr)
}

fn list_of(op: Operator, value: &Value) -> Result<&[Value], QuarryError> {
    value.as_list().ok_or_else(|| {
        QuarryError::InvalidCondition(format!(
            "operator {} requires a list value, got {}",
            op,
            value.type_name()
        ))
    })
}

/// Wrap a LIKE-family value with `%`.
///
/// LIKE and NOT LIKE wrap both sides unless the value already carries a `%` or `_`
/// wildcard. LEFT LIKE and RIGHT LIKE always wrap their one side.
pub fn like_pattern(op: Operator, value: &Value) -> Result<String, QuarryError> {
    let text = match value {
        Value::List(_) | Value::Null => {
            return Err(QuarryError::InvalidCondition(format!(
                "operator {} requires a text value, got {}",
                op,
                value.type_name()
            )))
        }
        other => other.to_string(),
    };
    let pattern = match op {
        Operator::LeftLike => format!("%{}", text),
        Operator::RightLike => format!("{}%", text),
        _ if text.contains(['%', '_']) => text,
        _ => format!("%{}%", text),
    };
    Ok(pattern)
}
