use super::Repository;
use crate::compile::{Aggregate, AGGREGATE_ALIAS};
use crate::context::CallContext;
use crate::entity::Entity;
use crate::error::QuarryError;
use crate::executor::StoreExecutor;
use crate::pager::Pager;
use crate::query::{validate_field, PageRequest, Query};
use crate::value::Value;

impl<E: Entity, X: StoreExecutor> Repository<E, X> {
    /// Every row matching `query`, with its projection, order and any explicit
    /// Limit or Page applied.
    pub fn get(&self, query: &Query, ctx: &CallContext) -> Result<Vec<E>, QuarryError> {
        self.observe("get", || {
            self.check_query(query)?;
            let ctx = self.call_ctx(ctx);
            let compiler = self.compiler();
            let statement = compiler.render(&compiler.select(query, Vec::new())?)?;
            let mut rows = Self::decode(self.fetch(&statement, &ctx)?)?;
            self.preload(&mut rows, query, &ctx)?;
            Ok(rows)
        })
    }

    /// First row matching `query`; paging is replaced by `LIMIT 1`.
    pub fn first(&self, query: &Query, ctx: &CallContext) -> Result<Option<E>, QuarryError> {
        let mut single = query.clone().without_paging().limit(1);
        for order in query.order_clauses() {
            single = single.order_by(order.field.clone(), order.direction);
        }
        Ok(self.get(&single, ctx)?.into_iter().next())
    }

    /// The live row with this primary key, or `NotFound`.
    pub fn find_by_id(&self, id: impl Into<Value>, ctx: &CallContext) -> Result<E, QuarryError> {
        let id = id.into();
        self.observe("find_by_id", || {
            let ctx = self.call_ctx(ctx);
            match self.fetch_by_id(&id, &ctx)? {
                Some(row) => E::from_record(&row),
                None => Err(QuarryError::not_found(E::TABLE_NAME)),
            }
        })
    }

    /// One page of rows plus the total match count.
    ///
    /// Without a Page the query's Limit (or the configured default) is the page
    /// size and page 1 is returned. The count ignores ordering and paging.
    pub fn page(&self, query: &Query, ctx: &CallContext) -> Result<Pager<E>, QuarryError> {
        self.observe("page", || {
            self.check_query(query)?;
            let ctx = self.call_ctx(ctx);
            let compiler = self.compiler();

            let requested = query.page_request().unwrap_or(PageRequest {
                page: 1,
                size: query.limit_rows().unwrap_or(0),
            });
            let window = compiler.page_window(requested)?;

            let count = compiler.render(&compiler.count(query, Vec::new())?)?;
            let total = self.count_statement(&count, &ctx)?;

            let paged = query.clone().page(window.page, window.size);
            let select = compiler.render(&compiler.select(&paged, Vec::new())?)?;
            let mut rows = Self::decode(self.fetch(&select, &ctx)?)?;
            self.preload(&mut rows, query, &ctx)?;

            Ok(Pager::new(window.page, window.size, total, rows))
        })
    }

    /// Rows matching the query's filter, search and required fields.
    pub fn count(&self, query: &Query, ctx: &CallContext) -> Result<u64, QuarryError> {
        self.observe("count", || {
            query.validate()?;
            let ctx = self.call_ctx(ctx);
            let compiler = self.compiler();
            let statement = compiler.render(&compiler.count(query, Vec::new())?)?;
            self.count_statement(&statement, &ctx)
        })
    }

    /// `SUM(field)` over matching rows; 0 when nothing matches or every value is NULL.
    pub fn sum(&self, query: &Query, field: &str, ctx: &CallContext) -> Result<f64, QuarryError> {
        self.observe("sum", || self.aggregate(query, Aggregate::Sum, field, ctx))
    }

    /// `AVG(field)` over matching rows; 0 when nothing matches or every value is NULL.
    pub fn avg(&self, query: &Query, field: &str, ctx: &CallContext) -> Result<f64, QuarryError> {
        self.observe("avg", || self.aggregate(query, Aggregate::Avg, field, ctx))
    }

    fn aggregate(
        &self,
        query: &Query,
        aggregate: Aggregate,
        field: &str,
        ctx: &CallContext,
    ) -> Result<f64, QuarryError> {
        validate_field(field)?;
        query.validate()?;
        let ctx = self.call_ctx(ctx);
        let compiler = self.compiler();
        let statement = compiler.render(&compiler.aggregate(query, aggregate, field)?)?;
        Ok(self
            .scalar::<f64>(&statement, AGGREGATE_ALIAS, &ctx)?
            .unwrap_or(0.0))
    }

    pub fn exists(&self, query: &Query, ctx: &CallContext) -> Result<bool, QuarryError> {
        Ok(self.count(query, ctx)? > 0)
    }

    pub fn exists_by_id(&self, id: impl Into<Value>, ctx: &CallContext) -> Result<bool, QuarryError> {
        let id = id.into();
        self.observe("exists_by_id", || {
            let ctx = self.call_ctx(ctx);
            let compiler = self.compiler();
            let cond = compiler.scoped(None, vec![Self::pk_eq(&id)?])?;
            let statement = compiler.render(&compiler.count_where(cond))?;
            Ok(self.count_statement(&statement, &ctx)? > 0)
        })
    }
}
