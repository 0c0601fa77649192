//! Execution adapters.
//!
//! The engine never talks to a driver directly. It compiles a [`Statement`] and hands
//! it to a [`StoreExecutor`], which reports rows as [`Record`]s and failures as
//! native [`StoreError`]s for the taxonomy to classify.
//!
//! Any executor can stand in for a transaction: a caller-owned
//! [`Transaction`](postgres::Transaction) implements the trait too, so an existence
//! check and the mutation it guards can share one.

use crate::context::CallContext;
use crate::error::StoreError;
use crate::record::Record;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

mod handoff;
pub mod mock;
pub mod postgres;

pub use mock::{MockExecutor, MockReply, StatementKind};
pub use postgres::{IsolationLevel, MayPostgresExecutor, Transaction};

/// SQL flavour a statement is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Quote an identifier, qualifying each `.`-separated segment.
    ///
    /// The quote character inside a segment is doubled.
    pub fn quote_identifier(&self, ident: &str) -> String {
        let quote = match self {
            Dialect::Postgres | Dialect::Sqlite => '"',
            Dialect::MySql => '`',
        };
        ident
            .split('.')
            .map(|segment| {
                let escaped = segment.replace(quote, &format!("{quote}{quote}"));
                format!("{quote}{escaped}{quote}")
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// `INSERT ... RETURNING` support.
    pub fn supports_returning(&self) -> bool {
        !matches!(self, Dialect::MySql)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => f.write_str("postgres"),
            Dialect::MySql => f.write_str("mysql"),
            Dialect::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// A rendered statement with its bound values in placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }

    pub fn is_select(&self) -> bool {
        self.sql.trim_start().get(..6).is_some_and(|head| head.eq_ignore_ascii_case("select"))
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.values.is_empty() {
            let values: Vec<String> = self.values.iter().map(ToString::to_string).collect();
            write!(f, " -- [{}]", values.join(", "))?;
        }
        Ok(())
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Store-generated id of the last inserted row, for dialects without `RETURNING`
    pub last_insert_id: Option<i64>,
}

/// Runs compiled statements against a store.
pub trait StoreExecutor {
    fn dialect(&self) -> Dialect;

    /// Run a row-returning statement.
    fn query(&self, statement: &Statement, ctx: &CallContext) -> Result<Vec<Record>, StoreError>;

    /// Run a statement for its side effect.
    fn execute(&self, statement: &Statement, ctx: &CallContext) -> Result<ExecResult, StoreError>;
}

impl<T: StoreExecutor + ?Sized> StoreExecutor for &T {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(&self, statement: &Statement, ctx: &CallContext) -> Result<Vec<Record>, StoreError> {
        (**self).query(statement, ctx)
    }

    fn execute(&self, statement: &Statement, ctx: &CallContext) -> Result<ExecResult, StoreError> {
        (**self).execute(statement, ctx)
    }
}

impl<T: StoreExecutor + ?Sized> StoreExecutor for Arc<T> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(&self, statement: &Statement, ctx: &CallContext) -> Result<Vec<Record>, StoreError> {
        (**self).query(statement, ctx)
    }

    fn execute(&self, statement: &Statement, ctx: &CallContext) -> Result<ExecResult, StoreError> {
        (**self).execute(statement, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_per_dialect() {
        assert_eq!(Dialect::Postgres.quote_identifier("users.id"), "\"users\".\"id\"");
        assert_eq!(Dialect::MySql.quote_identifier("users.id"), "`users`.`id`");
        assert_eq!(Dialect::Sqlite.quote_identifier("na\"me"), "\"na\"\"me\"");
    }

    #[test]
    fn test_dialect_names() {
        let d: Dialect = serde_json::from_str("\"mysql\"").unwrap();
        assert_eq!(d, Dialect::MySql);
        let d: Dialect = serde_json::from_str("\"postgresql\"").unwrap();
        assert_eq!(d, Dialect::Postgres);
        assert_eq!(Dialect::default().to_string(), "postgres");
        assert!(!Dialect::MySql.supports_returning());
    }

    #[test]
    fn test_statement_display_lists_values() {
        let stmt = Statement::new("SELECT 1 WHERE a = $1", vec![Value::Int(3)]);
        assert!(stmt.is_select());
        assert_eq!(stmt.to_string(), "SELECT 1 WHERE a = $1 -- [3]");
    }
}
