use super::Repository;
use crate::compile::{search_condition, RawPredicate};
use crate::context::CallContext;
use crate::entity::Entity;
use crate::error::QuarryError;
use crate::executor::StoreExecutor;
use crate::query::{validate_field, Query};
use crate::record::Record;
use crate::value::Value;
use sea_query::{Condition, Expr};

/// Which columns a write may touch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnFilter {
    #[default]
    All,
    /// Write only these columns
    Only(Vec<String>),
    /// Write every column except these
    Except(Vec<String>),
}

impl ColumnFilter {
    /// Build from optional allow and deny lists; a non-empty allow list wins.
    pub fn from_lists(allow: Vec<String>, deny: Vec<String>) -> Self {
        if !allow.is_empty() {
            ColumnFilter::Only(allow)
        } else if !deny.is_empty() {
            ColumnFilter::Except(deny)
        } else {
            ColumnFilter::All
        }
    }

    pub fn admits(&self, column: &str) -> bool {
        match self {
            ColumnFilter::All => true,
            ColumnFilter::Only(cols) => cols.iter().any(|c| c == column),
            ColumnFilter::Except(cols) => !cols.iter().any(|c| c == column),
        }
    }

    pub fn apply(&self, record: &mut Record) {
        record.retain(|column, _| self.admits(column));
    }

    fn validate(&self) -> Result<(), QuarryError> {
        match self {
            ColumnFilter::All => Ok(()),
            ColumnFilter::Only(cols) | ColumnFilter::Except(cols) => {
                cols.iter().try_for_each(|c| validate_field(c))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteOptions {
    pub columns: ColumnFilter,
    /// ANDed with the builder's own predicate
    pub predicates: Vec<RawPredicate>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: ColumnFilter::Only(columns.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn except<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: ColumnFilter::Except(columns.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn columns(mut self, columns: ColumnFilter) -> Self {
        self.columns = columns;
        self
    }

    pub fn predicate(mut self, predicate: RawPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    fn raw_exprs(&self) -> Vec<Expr> {
        self.predicates.iter().map(RawPredicate::to_expr).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationResult {
    pub rows_affected: u64,
}

impl<E: Entity, X: StoreExecutor> Repository<E, X> {
    /// Insert `entity` and return the stored row, store-generated columns included.
    ///
    /// A zero primary key is left out so the store can assign one. Uniqueness is
    /// checked before the insert is sent.
    pub fn create(&self, entity: &E, options: &WriteOptions, ctx: &CallContext) -> Result<E, QuarryError> {
        self.observe("create", || {
            options.columns.validate()?;
            let mut record = entity.to_record();
            let supplied_pk = record.get(E::PRIMARY_KEY).cloned().unwrap_or(Value::Null);
            if supplied_pk.is_zero() {
                record.remove(E::PRIMARY_KEY);
            }
            options.columns.apply(&mut record);

            let compiler = self.compiler();
            let insert = compiler.render(&compiler.insert(&record)?)?;

            let ctx = self.call_ctx(ctx);
            self.check_unique(&record, &|_: &str| true, None, &ctx)?;

            if compiler.dialect().supports_returning() {
                let stored = self.fetch(&insert, &ctx)?.into_iter().next().ok_or_else(|| {
                    QuarryError::Database(format!("insert into {} returned no row", E::TABLE_NAME))
                })?;
                return E::from_record(&stored);
            }

            let result = self.run(&insert, &ctx)?;
            let id = match result.last_insert_id {
                Some(id) if supplied_pk.is_zero() => Value::Int(id),
                _ => supplied_pk,
            };
            if id.is_zero() {
                return Err(QuarryError::Database(format!(
                    "insert into {} reported no id to re-read",
                    E::TABLE_NAME
                )));
            }
            match self.fetch_by_id(&id, &ctx)? {
                Some(row) => E::from_record(&row),
                None => Err(QuarryError::not_found(E::TABLE_NAME)),
            }
        })
    }

    /// Apply `changes` to every live row matching `filter`.
    ///
    /// Refuses to run when neither the filter nor the raw predicates constrain
    /// anything. A primary key in `changes` is not written; it excludes that row
    /// from the uniqueness check instead.
    pub fn update(
        &self,
        filter: &Query,
        changes: &Record,
        options: &WriteOptions,
        ctx: &CallContext,
    ) -> Result<MutationResult, QuarryError> {
        self.observe("update", || {
            filter.validate()?;
            options.columns.validate()?;

            let mut changes = changes.clone();
            let exclude = changes.remove(E::PRIMARY_KEY).filter(|id| !id.is_zero());
            options.columns.apply(&mut changes);

            let cond = self.guarded_condition(filter, options.raw_exprs(), "update")?;
            let compiler = self.compiler();
            let update = compiler.render(&compiler.update(&changes, cond)?)?;

            let ctx = self.call_ctx(ctx);
            self.check_unique(&changes, &|c: &str| changes.contains(c), exclude.as_ref(), &ctx)?;

            let result = self.run(&update, &ctx)?;
            Ok(MutationResult {
                rows_affected: result.rows_affected,
            })
        })
    }

    /// Apply `changes` to the live row with primary key `id` and return it re-read.
    ///
    /// The row is probed first; a missing row fails `NotFound` and nothing is
    /// written.
    pub fn update_by_id(
        &self,
        id: impl Into<Value>,
        changes: &Record,
        options: &WriteOptions,
        ctx: &CallContext,
    ) -> Result<E, QuarryError> {
        let id = id.into();
        self.observe("update_by_id", || {
            options.columns.validate()?;
            let mut changes = changes.clone();
            changes.remove(E::PRIMARY_KEY);
            options.columns.apply(&mut changes);

            let compiler = self.compiler();
            let cond = compiler
                .scoped(Some(Condition::all().add(Self::pk_eq(&id)?)), options.raw_exprs())?
                .unwrap_or_else(Condition::all);
            let update = compiler.render(&compiler.update(&changes, cond)?)?;

            let ctx = self.call_ctx(ctx);
            let mut candidate = self
                .fetch_by_id(&id, &ctx)?
                .ok_or_else(|| QuarryError::not_found(E::TABLE_NAME))?;
            for (column, value) in changes.iter() {
                candidate.set(column, value.clone());
            }
            self.check_unique(&candidate, &|c: &str| changes.contains(c), Some(&id), &ctx)?;

            let result = self.run(&update, &ctx)?;
            log::debug!(
                "updated {} row(s) in {} by id {}",
                result.rows_affected,
                E::TABLE_NAME,
                id
            );
            match self.fetch_by_id(&id, &ctx)? {
                Some(row) => E::from_record(&row),
                None => Err(QuarryError::not_found(E::TABLE_NAME)),
            }
        })
    }

    /// Delete every live row matching `filter`; soft-deleting entities stamp their
    /// delete column instead.
    pub fn delete(
        &self,
        filter: &Query,
        options: &WriteOptions,
        ctx: &CallContext,
    ) -> Result<MutationResult, QuarryError> {
        self.observe("delete", || {
            filter.validate()?;
            let cond = self.guarded_condition(filter, options.raw_exprs(), "delete")?;
            let compiler = self.compiler();
            let delete = compiler.delete(cond)?;

            let ctx = self.call_ctx(ctx);
            let result = self.run(&delete, &ctx)?;
            Ok(MutationResult {
                rows_affected: result.rows_affected,
            })
        })
    }

    /// Delete the live row with primary key `id`, further constrained by `extra`.
    ///
    /// `extra` contributes its search groups and required fields; an empty query
    /// adds nothing. A missing row fails `NotFound` and nothing is deleted.
    pub fn delete_by_id(
        &self,
        id: impl Into<Value>,
        extra: &Query,
        ctx: &CallContext,
    ) -> Result<MutationResult, QuarryError> {
        let id = id.into();
        self.observe("delete_by_id", || {
            extra.validate()?;
            let compiler = self.compiler();
            let mut base = Condition::all().add(Self::pk_eq(&id)?);
            if let Some(extra_cond) = search_condition(extra, self.config())? {
                base = base.add(extra_cond);
            }
            let cond = compiler.scoped(Some(base), Vec::new())?.unwrap_or_else(Condition::all);
            let delete = compiler.delete(cond)?;

            let ctx = self.call_ctx(ctx);
            let probe = compiler.render(&compiler.count_where(
                compiler.scoped(None, vec![Self::pk_eq(&id)?])?,
            ))?;
            if self.count_statement(&probe, &ctx)? == 0 {
                return Err(QuarryError::not_found(E::TABLE_NAME));
            }

            let result = self.run(&delete, &ctx)?;
            Ok(MutationResult {
                rows_affected: result.rows_affected,
            })
        })
    }

    /// The filter's predicate plus raw predicates, scoped to live rows. Fails when
    /// the caller supplied no constraint at all.
    fn guarded_condition(
        &self,
        filter: &Query,
        raw: Vec<Expr>,
        operation: &str,
    ) -> Result<Condition, QuarryError> {
        let base = search_condition(filter, self.config())?;
        if base.is_none() && raw.is_empty() {
            return Err(QuarryError::InvalidCondition(format!(
                "refusing to {} every row in {}",
                operation,
                E::TABLE_NAME
            )));
        }
        Ok(self
            .compiler()
            .scoped(base, raw)?
            .unwrap_or_else(Condition::all))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_wins() {
        let filter = ColumnFilter::from_lists(vec!["a".into()], vec!["a".into(), "b".into()]);
        assert_eq!(filter, ColumnFilter::Only(vec!["a".into()]));
        assert_eq!(
            ColumnFilter::from_lists(Vec::new(), vec!["b".into()]),
            ColumnFilter::Except(vec!["b".into()])
        );
        assert_eq!(ColumnFilter::from_lists(Vec::new(), Vec::new()), ColumnFilter::All);
    }

    #[test]
    fn test_apply_filters_record() {
        let mut record = Record::new().with("a", 1).with("b", 2).with("c", 3);
        ColumnFilter::Except(vec!["b".into()]).apply(&mut record);
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["a", "c"]);

        ColumnFilter::Only(vec!["c".into()]).apply(&mut record);
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_filter_lists_are_validated() {
        assert!(ColumnFilter::Only(vec!["ok".into(), "bad col".into()]).validate().is_err());
        assert!(ColumnFilter::Except(vec!["fine".into()]).validate().is_ok());
    }
}
