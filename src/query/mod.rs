//! Query model.
//!
//! A [`Query`] describes a read/aggregate/filter intent: projected columns, a search
//! tree of [`ConditionGroup`]s, ordering, paging, required fields and includes.
//! Builder methods consume the value and return a new one; nothing mutates a
//! `Query` in place once it has been handed to the engine.
//!
//! # Examples
//!
//! ```
//! use quarry::{Condition, ConditionGroup, Direction, Operator, Query};
//!
//! # fn main() -> Result<(), quarry::QuarryError> {
//! let query = Query::new()
//!     .filter(["id", "name"])
//!     .search(
//!         ConditionGroup::any()
//!             .push("status", Operator::Eq, "active")?
//!             .push("status", Operator::Eq, "trial")?,
//!     )
//!     .and_where(Condition::new("age", Operator::Gte, 18)?)
//!     .order_by("created_at", Direction::Desc)
//!     .page(2, 20);
//! query.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::QuarryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod condition;
pub mod operator;
mod params;
pub mod validate;
mod wire;

pub use condition::{Combinator, Condition, ConditionGroup};
pub use operator::{is_valid_operator, normalize_operator, Operator};
pub use validate::{is_valid_field, validate_field, validate_include};
pub use wire::QueryWire;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(QuarryError::InvalidCondition(format!(
                "order direction must be asc or desc, got '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => f.write_str("asc"),
            Direction::Desc => f.write_str("desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Requested page. A `size` of 0 means "use the configured default".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "QueryWire", into = "QueryWire")]
pub struct Query {
    filter: Vec<String>,
    search: Vec<ConditionGroup>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    page: Option<PageRequest>,
    required: Vec<String>,
    include: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project only these columns. An empty list projects every column.
    pub fn filter<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append a condition group; groups are ANDed together.
    pub fn search(mut self, group: ConditionGroup) -> Self {
        self.search.push(group);
        self
    }

    /// Append a single condition as its own group.
    pub fn and_where(self, condition: Condition) -> Self {
        self.search(ConditionGroup::all().with(condition))
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, page: u64, size: u64) -> Self {
        self.page = Some(PageRequest { page, size });
        self
    }

    /// Fields that must appear in the search tree and be non-empty in every row.
    pub fn required<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Relations to preload, dot-path nestable (`author.profile`).
    pub fn include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Combine with a caller-supplied query.
    ///
    /// Search groups are concatenated. Filter, Required, OrderBy and Include from
    /// `extra` replace ours when non-empty; its Limit/Page replace ours when set.
    pub fn merge(mut self, extra: &Query) -> Self {
        self.search.extend(extra.search.iter().cloned());
        if !extra.filter.is_empty() {
            self.filter = extra.filter.clone();
        }
        if !extra.required.is_empty() {
            self.required = extra.required.clone();
        }
        if !extra.order_by.is_empty() {
            self.order_by = extra.order_by.clone();
        }
        if !extra.include.is_empty() {
            self.include = extra.include.clone();
        }
        if extra.limit.is_some() {
            self.limit = extra.limit;
        }
        if extra.page.is_some() {
            self.page = extra.page;
        }
        self
    }

    /// Drop ordering and paging; what count/aggregate paths run on.
    pub fn without_paging(mut self) -> Self {
        self.order_by.clear();
        self.limit = None;
        self.page = None;
        self
    }

    pub fn filter_columns(&self) -> &[String] {
        &self.filter
    }

    pub fn search_groups(&self) -> &[ConditionGroup] {
        &self.search
    }

    pub fn order_clauses(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit_rows(&self) -> Option<u64> {
        self.limit
    }

    pub fn page_request(&self) -> Option<PageRequest> {
        self.page
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    pub fn include_paths(&self) -> &[String] {
        &self.include
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.search.iter().flat_map(|g| g.conditions().iter())
    }

    /// Check every identifier the query would interpolate.
    ///
    /// Runs before any statement is built; a failure here means nothing was sent
    /// to the store.
    pub fn validate(&self) -> Result<(), QuarryError> {
        for column in &self.filter {
            validate_field(column)?;
        }
        for condition in self.conditions() {
            validate_field(condition.field())?;
        }
        for order in &self.order_by {
            validate_field(&order.field)?;
        }
        for field in &self.required {
            validate_field(field)?;
        }
        for path in &self.include {
            validate_include(path)?;
        }
        Ok(())
    }

    /// Fail with `MissingRequiredField` for the first required field that never
    /// appears in the search tree.
    pub fn check_required(&self) -> Result<(), QuarryError> {
        for field in &self.required {
            if !self.conditions().any(|c| c.field() == field) {
                return Err(QuarryError::MissingRequiredField(field.clone()));
            }
        }
        Ok(())
    }
}
