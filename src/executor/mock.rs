//! In-memory executor for tests.
//!
//! [`MockExecutor`] replays scripted results in FIFO order, records every
//! statement it is handed and counts calls per kind. When a queue runs dry, an
//! optional responder gets to answer; otherwise queries return no rows and
//! executes affect nothing.
//!
//! ```
//! use quarry::{CallContext, MockExecutor, Record, Statement, StatementKind, StoreExecutor};
//!
//! let mock = MockExecutor::new();
//! mock.push_rows(vec![Record::new().with("count", 3)]);
//!
//! let ctx = CallContext::background();
//! let rows = mock.query(&Statement::new("SELECT COUNT(*) AS \"count\" FROM t", vec![]), &ctx).unwrap();
//! assert_eq!(rows[0].get("count"), Some(&quarry::Value::Int(3)));
//! assert_eq!(mock.count(StatementKind::Query), 1);
//! ```

use super::{Dialect, ExecResult, Statement, StoreExecutor};
use crate::context::CallContext;
use crate::error::StoreError;
use crate::record::Record;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Query,
    Execute,
}

/// A scripted answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    Rows(Vec<Record>),
    Exec(ExecResult),
    Error(StoreError),
}

type Responder = Box<dyn Fn(StatementKind, &Statement) -> Option<MockReply> + Send + Sync>;

#[derive(Default)]
struct MockState {
    queries: VecDeque<Result<Vec<Record>, StoreError>>,
    executes: VecDeque<Result<ExecResult, StoreError>>,
    log: Vec<(StatementKind, Statement)>,
}

pub struct MockExecutor {
    dialect: Dialect,
    state: Mutex<MockState>,
    responder: Option<Responder>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::with_dialect(Dialect::Postgres)
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Mutex::new(MockState::default()),
            responder: None,
        }
    }

    /// Answer statements the queues do not cover.
    pub fn responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(StatementKind, &Statement) -> Option<MockReply> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn push_rows(&self, rows: Vec<Record>) {
        self.lock().queries.push_back(Ok(rows));
    }

    pub fn push_query_error(&self, err: StoreError) {
        self.lock().queries.push_back(Err(err));
    }

    pub fn push_exec(&self, rows_affected: u64) {
        self.lock().executes.push_back(Ok(ExecResult {
            rows_affected,
            last_insert_id: None,
        }));
    }

    pub fn push_exec_result(&self, result: ExecResult) {
        self.lock().executes.push_back(Ok(result));
    }

    pub fn push_exec_error(&self, err: StoreError) {
        self.lock().executes.push_back(Err(err));
    }

    /// Every statement received so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.lock().log.iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn last_statement(&self) -> Option<Statement> {
        self.lock().log.last().map(|(_, s)| s.clone())
    }

    pub fn count(&self, kind: StatementKind) -> usize {
        self.lock().log.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Statements that write: INSERT, UPDATE or DELETE, whichever entry point ran them.
    pub fn mutation_count(&self) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|(_, s)| is_mutation(&s.sql))
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.lock().log.len()
    }

    /// Forget the statement log; scripted replies stay queued.
    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn respond(&self, kind: StatementKind, statement: &Statement) -> Option<MockReply> {
        self.responder.as_ref().and_then(|r| r(kind, statement))
    }
}

fn is_mutation(sql: &str) -> bool {
    let head = sql.trim_start();
    ["INSERT", "UPDATE", "DELETE"]
        .iter()
        .any(|kw| head.get(..kw.len()).is_some_and(|h| h.eq_ignore_ascii_case(kw)))
}

impl StoreExecutor for MockExecutor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn query(&self, statement: &Statement, ctx: &CallContext) -> Result<Vec<Record>, StoreError> {
        if let Some(interrupted) = ctx.interruption() {
            return Err(interrupted);
        }
        log::debug!("mock query: {}", statement);
        let scripted = {
            let mut state = self.lock();
            state.log.push((StatementKind::Query, statement.clone()));
            state.queries.pop_front()
        };
        if let Some(result) = scripted {
            return result;
        }
        match self.respond(StatementKind::Query, statement) {
            Some(MockReply::Rows(rows)) => Ok(rows),
            Some(MockReply::Error(err)) => Err(err),
            Some(MockReply::Exec(_)) | None => Ok(Vec::new()),
        }
    }

    fn execute(&self, statement: &Statement, ctx: &CallContext) -> Result<ExecResult, StoreError> {
        if let Some(interrupted) = ctx.interruption() {
            return Err(interrupted);
        }
        log::debug!("mock execute: {}", statement);
        let scripted = {
            let mut state = self.lock();
            state.log.push((StatementKind::Execute, statement.clone()));
            state.executes.pop_front()
        };
        if let Some(result) = scripted {
            return result;
        }
        match self.respond(StatementKind::Execute, statement) {
            Some(MockReply::Exec(result)) => Ok(result),
            Some(MockReply::Error(err)) => Err(err),
            Some(MockReply::Rows(_)) | None => Ok(ExecResult::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancelToken;

    fn stmt(sql: &str) -> Statement {
        Statement::new(sql, Vec::new())
    }

    #[test]
    fn test_scripted_replies_in_order() {
        let mock = MockExecutor::new();
        mock.push_rows(vec![Record::new().with("id", 1)]);
        mock.push_query_error(StoreError::new("boom"));
        let ctx = CallContext::background();

        assert_eq!(mock.query(&stmt("SELECT 1"), &ctx).unwrap().len(), 1);
        assert_eq!(mock.query(&stmt("SELECT 2"), &ctx).unwrap_err().message, "boom");
        assert!(mock.query(&stmt("SELECT 3"), &ctx).unwrap().is_empty());
        assert_eq!(mock.count(StatementKind::Query), 3);
        assert_eq!(mock.count(StatementKind::Execute), 0);
    }

    #[test]
    fn test_mutation_count_sees_returning_inserts() {
        let mock = MockExecutor::new();
        let ctx = CallContext::background();
        mock.query(&stmt("INSERT INTO t (a) VALUES ($1) RETURNING *"), &ctx).unwrap();
        mock.execute(&stmt("update t set a = 1"), &ctx).unwrap();
        mock.query(&stmt("SELECT * FROM t"), &ctx).unwrap();
        assert_eq!(mock.mutation_count(), 2);
        assert_eq!(mock.total_count(), 3);
    }

    #[test]
    fn test_responder_answers_unscripted() {
        let mock = MockExecutor::new().responder(|kind, s| match kind {
            StatementKind::Execute if s.sql.starts_with("DELETE") => {
                Some(MockReply::Exec(ExecResult {
                    rows_affected: 4,
                    last_insert_id: None,
                }))
            }
            _ => None,
        });
        let ctx = CallContext::background();
        assert_eq!(mock.execute(&stmt("DELETE FROM t"), &ctx).unwrap().rows_affected, 4);
        assert_eq!(mock.execute(&stmt("UPDATE t SET a = 1"), &ctx).unwrap().rows_affected, 0);
    }

    #[test]
    fn test_canceled_context_short_circuits() {
        let mock = MockExecutor::new();
        let token = CancelToken::new();
        token.cancel();
        let ctx = CallContext::background().with_cancel(token);
        assert!(mock.query(&stmt("SELECT 1"), &ctx).is_err());
        assert_eq!(mock.total_count(), 0);
    }
}
