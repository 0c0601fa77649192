//! Serde wire shape of a [`Query`].
//!
//! ```json
//! {
//!   "filter": ["id", "name"],
//!   "search": [{"conditions": [["age", 18, ">="], ["name", "bo"]], "operator": "OR"}],
//!   "order_by": [["id", "desc"]],
//!   "limit": 10,
//!   "page": 2,
//!   "required": ["tenant_id"],
//!   "include": ["author.profile"]
//! }
//! ```
//!
//! Condition tuples are decoded loosely and converted by `TryFrom`, so a malformed
//! tuple surfaces as `InvalidCondition`/`InvalidOperator` instead of a serde error.

use super::{Combinator, Condition, ConditionGroup, Direction, OrderBy, PageRequest, Query};
use crate::error::QuarryError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryWire {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<GroupWire>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupWire {
    #[serde(default)]
    pub conditions: Vec<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

fn parse_combinator(raw: Option<&str>) -> Result<Combinator, QuarryError> {
    match raw.map(|s| s.trim().to_uppercase()) {
        None => Ok(Combinator::And),
        Some(s) if s.is_empty() || s == "AND" => Ok(Combinator::And),
        Some(s) if s == "OR" => Ok(Combinator::Or),
        Some(_) => Err(QuarryError::InvalidOperator(raw.unwrap_or_default().to_string())),
    }
}

impl TryFrom<QueryWire> for Query {
    type Error = QuarryError;

    fn try_from(wire: QueryWire) -> Result<Self, Self::Error> {
        let mut search = Vec::with_capacity(wire.search.len());
        for group in &wire.search {
            let mut built = ConditionGroup::new(parse_combinator(group.operator.as_deref())?);
            for tuple in &group.conditions {
                built = built.with(Condition::from_tuple(tuple)?);
            }
            search.push(built);
        }

        let mut order_by = Vec::with_capacity(wire.order_by.len());
        for entry in &wire.order_by {
            let field = entry.first().ok_or_else(|| {
                QuarryError::InvalidCondition("order_by entry needs a field".to_string())
            })?;
            let direction = match entry.get(1) {
                Some(dir) => dir.parse()?,
                None => Direction::Asc,
            };
            order_by.push(OrderBy {
                field: field.clone(),
                direction,
            });
        }

        // With a page present, `limit` doubles as the page size.
        let (limit, page) = match wire.page {
            Some(page) => {
                let size = wire.page_size.or(wire.limit).unwrap_or(0);
                let limit = if wire.page_size.is_some() { wire.limit } else { None };
                (limit, Some(PageRequest { page, size }))
            }
            None => (wire.limit, None),
        };

        let query = Query {
            filter: wire.filter,
            search,
            order_by,
            limit,
            page,
            required: wire.required,
            include: wire.include,
        };
        query.validate()?;
        Ok(query)
    }
}

impl From<Query> for QueryWire {
    fn from(query: Query) -> Self {
        let search = query
            .search
            .iter()
            .map(|group| GroupWire {
                conditions: group
                    .conditions()
                    .iter()
                    .map(|c| {
                        vec![
                            serde_json::Value::String(c.field().to_string()),
                            serde_json::to_value(c.value()).unwrap_or(serde_json::Value::Null),
                            serde_json::Value::String(c.operator().as_str().to_string()),
                        ]
                    })
                    .collect(),
                operator: match group.combinator() {
                    Combinator::And => None,
                    Combinator::Or => Some("OR".to_string()),
                },
            })
            .collect();

        QueryWire {
            filter: query.filter,
            search,
            order_by: query
                .order_by
                .into_iter()
                .map(|o| vec![o.field, o.direction.to_string()])
                .collect(),
            limit: query.limit,
            page: query.page.map(|p| p.page),
            page_size: query.page.map(|p| p.size).filter(|s| *s > 0),
            required: query.required,
            include: query.include,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Operator;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_decode_full_shape() {
        let query: Query = serde_json::from_value(json!({
            "filter": ["id", "name"],
            "search": [{"conditions": [["a", 1], ["b", 2]], "operator": "or"}],
            "order_by": [["id", "DESC"], ["name"]],
            "page": 2,
            "limit": 10,
            "required": ["a"],
            "include": ["author"]
        }))
        .unwrap();

        assert_eq!(query.filter_columns().len(), 2);
        let group = &query.search_groups()[0];
        assert_eq!(group.combinator(), Combinator::Or);
        assert_eq!(group.conditions()[1].value(), &Value::Int(2));
        assert_eq!(group.conditions()[1].operator(), Operator::Eq);
        assert_eq!(query.order_clauses()[0].direction, Direction::Desc);
        assert_eq!(query.order_clauses()[1].direction, Direction::Asc);
        assert_eq!(query.page_request(), Some(PageRequest { page: 2, size: 10 }));
        assert_eq!(query.limit_rows(), None);
    }

    #[test]
    fn test_decode_rejects_short_tuple() {
        let err = serde_json::from_value::<Query>(json!({
            "search": [{"conditions": [["a"]]}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Invalid condition"));
    }

    #[test]
    fn test_decode_rejects_bad_identifier() {
        let err = serde_json::from_value::<Query>(json!({
            "order_by": [["id; drop table users", "asc"]]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Invalid field"));
    }

    #[test]
    fn test_decode_rejects_unknown_group_operator() {
        let err = serde_json::from_value::<Query>(json!({
            "search": [{"conditions": [["a", 1]], "operator": "XOR"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Invalid operator"));
    }

    #[test]
    fn test_encode_keeps_wire_shape() {
        let query = Query::new()
            .and_where(Condition::new("age", Operator::Gte, 18).unwrap())
            .order_by("id", Direction::Desc)
            .limit(5);
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "search": [{"conditions": [["age", 18, ">="]]}],
                "order_by": [["id", "desc"]],
                "limit": 5
            })
        );
    }
}
