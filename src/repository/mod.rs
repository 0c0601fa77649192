//! Read, aggregate and mutation paths for one entity type.
//!
//! A [`Repository`] pairs an [`Entity`] with a [`StoreExecutor`]. Every call
//! validates the query first, compiles it, runs it through the executor and passes
//! any store failure through the error taxonomy.
//!
//! ```
//! use quarry::{CallContext, Condition, MockExecutor, Query, Record, Repository};
//! # use quarry::{Entity, Fields, QuarryError};
//! # #[derive(Debug)]
//! # struct User { id: i64, name: String }
//! # impl Fields for User {
//! #     fn field_names() -> &'static [&'static str] { &["id", "name"] }
//! #     fn to_record(&self) -> Record { Record::new().with("id", self.id).with("name", self.name.as_str()) }
//! #     fn from_record(r: &Record) -> Result<Self, QuarryError> {
//! #         Ok(Self { id: quarry::decode_field(r, "id")?, name: quarry::decode_field(r, "name")? })
//! #     }
//! # }
//! # impl Entity for User {
//! #     const TABLE_NAME: &'static str = "users";
//! #     const PRIMARY_KEY: &'static str = "id";
//! # }
//!
//! let mock = MockExecutor::new();
//! mock.push_rows(vec![Record::new().with("count", 25)]);
//!
//! let users: Repository<User, _> = Repository::new(&mock);
//! let query = Query::new().and_where(Condition::eq("name", "bo").unwrap()).page(2, 10);
//! let page = users.page(&query, &CallContext::background()).unwrap();
//! assert_eq!((page.current_page, page.total, page.last_page), (2, 25, 3));
//! ```

use crate::compile::{column, Compiler, COUNT_ALIAS};
use crate::config::EngineConfig;
use crate::context::CallContext;
use crate::entity::Entity;
use crate::error::QuarryError;
use crate::executor::{ExecResult, Statement, StoreExecutor};
use crate::query::Query;
use crate::record::Record;
use crate::value::{TryGetable, Value};
use sea_query::{Expr, ExprTrait};
use std::marker::PhantomData;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

mod read;
mod unique;
mod write;

pub use write::{ColumnFilter, MutationResult, WriteOptions};

pub struct Repository<E, X> {
    executor: X,
    config: EngineConfig,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, X: StoreExecutor> Repository<E, X> {
    /// Repository with default engine settings.
    pub fn new(executor: X) -> Self {
        let config = EngineConfig::default().with_dialect(executor.dialect());
        Self::with_config(executor, config)
    }

    pub fn with_config(executor: X, config: EngineConfig) -> Self {
        if config.dialect != executor.dialect() {
            log::warn!(
                "configured dialect {} differs from executor dialect {}; rendering for {}",
                config.dialect,
                executor.dialect(),
                executor.dialect()
            );
        }
        Self {
            executor,
            config,
            _entity: PhantomData,
        }
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.config, self.executor.dialect(), E::TABLE_NAME)
            .soft_delete(E::soft_delete_column())
    }

    /// The caller's context, tightened by the configured statement timeout.
    fn call_ctx(&self, ctx: &CallContext) -> CallContext {
        match self.config.statement_timeout() {
            Some(timeout) => ctx.clone().with_timeout(timeout),
            None => ctx.clone(),
        }
    }

    /// Run one public operation inside its span, counting rejected queries.
    fn observe<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> Result<T, QuarryError>,
    ) -> Result<T, QuarryError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::repository_span(operation, E::TABLE_NAME).entered();

        let result = f();
        if let Err(err) = &result {
            if err.is_validation() {
                log::debug!("{} on {} rejected: {}", operation, E::TABLE_NAME, err);
                #[cfg(feature = "metrics")]
                METRICS.record_rejected(err.kind().as_str());
            }
        }
        result
    }

    /// Identifiers and include roots, before anything is compiled.
    fn check_query(&self, query: &Query) -> Result<(), QuarryError> {
        query.validate()?;
        for path in query.include_paths() {
            let (root, _) = split_include(path);
            if !E::relations().contains(&root) {
                return Err(QuarryError::InvalidField(path.clone()));
            }
        }
        Ok(())
    }

    fn fetch(&self, statement: &Statement, ctx: &CallContext) -> Result<Vec<Record>, QuarryError> {
        ctx.check()?;
        Ok(self.executor.query(statement, ctx)?)
    }

    fn run(&self, statement: &Statement, ctx: &CallContext) -> Result<ExecResult, QuarryError> {
        ctx.check()?;
        Ok(self.executor.execute(statement, ctx)?)
    }

    fn scalar<T: TryGetable>(
        &self,
        statement: &Statement,
        alias: &str,
        ctx: &CallContext,
    ) -> Result<Option<T>, QuarryError> {
        let rows = self.fetch(statement, ctx)?;
        let value = rows
            .into_iter()
            .next()
            .and_then(|mut row| row.remove(alias))
            .unwrap_or(Value::Null);
        Option::<T>::try_get(value).map_err(|e| QuarryError::Decode(format!("{}: {}", alias, e)))
    }

    fn count_statement(&self, statement: &Statement, ctx: &CallContext) -> Result<u64, QuarryError> {
        Ok(self.scalar::<u64>(statement, COUNT_ALIAS, ctx)?.unwrap_or(0))
    }

    fn pk_eq(id: &Value) -> Result<Expr, QuarryError> {
        Ok(column(E::PRIMARY_KEY)?.eq(id.to_sea_value()))
    }

    /// The live row with primary key `id`, undecoded.
    fn fetch_by_id(&self, id: &Value, ctx: &CallContext) -> Result<Option<Record>, QuarryError> {
        let compiler = self.compiler();
        let select = compiler.select(&Query::new().limit(1), vec![Self::pk_eq(id)?])?;
        let rows = self.fetch(&compiler.render(&select)?, ctx)?;
        Ok(rows.into_iter().next())
    }

    fn decode(rows: Vec<Record>) -> Result<Vec<E>, QuarryError> {
        rows.iter().map(E::from_record).collect()
    }

    fn preload(&self, rows: &mut [E], query: &Query, ctx: &CallContext) -> Result<(), QuarryError> {
        if rows.is_empty() {
            return Ok(());
        }
        for path in query.include_paths() {
            let (root, rest) = split_include(path);
            ctx.check()?;
            E::preload(rows, root, rest, &self.executor, ctx)?;
        }
        Ok(())
    }
}

fn split_include(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((root, rest)) => (root, Some(rest)),
        None => (path, None),
    }
}
