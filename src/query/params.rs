//! Query-string mapping.
//!
//! | key        | shape                               |
//! |------------|-------------------------------------|
//! | `filter`   | `a,b`                               |
//! | `search`   | `field:value:op\|field2:value2`     |
//! | `orderby`  | `field:dir\|field2:dir`             |
//! | `limit`    | `N`                                 |
//! | `page`     | `N` (`page_size` optional)          |
//! | `required` | `a,b`                               |
//! | `include`  | `a\|b.c`                            |
//!
//! Every `search` entry becomes its own AND group. Values for `in`/`not in` and
//! `between`/`not between` are comma separated. Unknown keys are ignored.

use super::{Condition, Direction, Operator, Query};
use crate::error::QuarryError;
use crate::value::Value;

impl Query {
    /// Build a query from already-decoded query-string pairs.
    ///
    /// ```
    /// use quarry::{Operator, Query};
    ///
    /// let query = Query::from_params([
    ///     ("filter", "id,name"),
    ///     ("search", "age:18:>=|status:active"),
    ///     ("orderby", "id:desc"),
    ///     ("page", "2"),
    /// ])
    /// .unwrap();
    /// assert_eq!(query.search_groups().len(), 2);
    /// assert_eq!(query.conditions().next().unwrap().operator(), Operator::Gte);
    /// ```
    pub fn from_params<I, K, V>(pairs: I) -> Result<Query, QuarryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Query::new();
        let mut page = None;
        let mut page_size = None;

        for (key, raw) in pairs {
            let raw = raw.as_ref();
            match key.as_ref() {
                "filter" => query = query.filter(split_list(raw, ',')),
                "search" => {
                    for entry in split_list(raw, '|') {
                        query = query.and_where(parse_condition(&entry)?);
                    }
                }
                "orderby" | "order_by" => {
                    for entry in split_list(raw, '|') {
                        let (field, direction) = match entry.split_once(':') {
                            Some((field, dir)) => (field.trim(), dir.parse()?),
                            None => (entry.as_str(), Direction::Asc),
                        };
                        query = query.order_by(field, direction);
                    }
                }
                "limit" => query = query.limit(parse_number("limit", raw)?),
                "page" => page = Some(parse_number("page", raw)?),
                "page_size" => page_size = Some(parse_number("page_size", raw)?),
                "required" => query = query.required(split_list(raw, ',')),
                "include" => query = query.include(split_list(raw, '|')),
                other => log::debug!("ignoring unknown query parameter '{}'", other),
            }
        }

        if let Some(page) = page {
            let size = match page_size.or(query.limit) {
                Some(size) => {
                    if page_size.is_none() {
                        query.limit = None;
                    }
                    size
                }
                None => 0,
            };
            query = query.page(page, size);
        }

        query.validate()?;
        Ok(query)
    }
}

fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number(key: &str, raw: &str) -> Result<u64, QuarryError> {
    raw.trim().parse().map_err(|_| {
        QuarryError::InvalidCondition(format!("{} must be a non-negative integer, got '{}'", key, raw))
    })
}

/// `field:value[:op]`. With exactly three segments the last one must be an
/// operator; longer entries treat the trailing segment as the operator only when
/// it parses as one, so values like `10:30:00` survive.
fn parse_condition(entry: &str) -> Result<Condition, QuarryError> {
    let parts: Vec<&str> = entry.split(':').collect();
    if parts.len() < 2 {
        return Err(QuarryError::InvalidCondition(format!(
            "search entry '{}' needs at least field:value",
            entry
        )));
    }
    let field = parts[0].trim();

    let (raw_value, operator) = match parts.len() {
        2 => (parts[1].to_string(), Operator::Eq),
        n => match parts[n - 1].parse::<Operator>() {
            Ok(op) => (parts[1..n - 1].join(":"), op),
            Err(_) if n == 3 => return Err(QuarryError::InvalidOperator(parts[2].to_string())),
            Err(_) => (parts[1..].join(":"), Operator::Eq),
        },
    };

    let value = if operator.is_nullary() {
        Value::Null
    } else if operator.takes_list() || operator.takes_range() {
        Value::List(
            raw_value
                .split(',')
                .map(|v| Value::String(v.trim().to_string()))
                .collect(),
        )
    } else {
        Value::String(raw_value)
    };

    Condition::new(field, operator, value)
}
