//! Statement assembly.
//!
//! A [`Compiler`] is bound to one table and turns queries and records into
//! `sea-query` statements, then renders them for the executor's [`Dialect`]. Only
//! validated identifiers are ever interpolated; every value is a bound parameter.

use crate::config::EngineConfig;
use crate::error::QuarryError;
use crate::executor::{Dialect, Statement};
use crate::query::{validate_field, Direction, PageRequest, Query};
use crate::record::Record;
use crate::value::Value;
use sea_query::{
    Asterisk, ColumnRef, Condition, DeleteStatement, Expr, ExprTrait, Func, Iden, IntoColumnRef,
    MysqlQueryBuilder, Order, PostgresQueryBuilder, Query as SeaQuery, QueryStatementWriter,
    SelectStatement, SqliteQueryBuilder, UpdateStatement,
};

mod predicate;

pub use predicate::{condition_expr, like_pattern, search_condition};

/// Alias of the single column produced by count queries.
pub const COUNT_ALIAS: &str = "count";
/// Alias of the single column produced by SUM/AVG queries.
pub const AGGREGATE_ALIAS: &str = "value";

/// A validated identifier segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Iden for Ident {
    fn unquoted(&self) -> &str {
        &self.0
    }
}

/// Column reference for `name`, qualified when dotted (`t.c`, `s.t.c`).
pub fn column_ref(name: &str) -> Result<ColumnRef, QuarryError> {
    validate_field(name)?;
    let parts: Vec<&str> = name.split('.').collect();
    let col = match parts.as_slice() {
        [c] => Ident::new(*c).into_column_ref(),
        [t, c] => (Ident::new(*t), Ident::new(*c)).into_column_ref(),
        [s, t, c] => (Ident::new(*s), Ident::new(*t), Ident::new(*c)).into_column_ref(),
        _ => return Err(QuarryError::InvalidField(name.to_string())),
    };
    if parts.iter().any(|p| p.is_empty()) {
        return Err(QuarryError::InvalidField(name.to_string()));
    }
    Ok(col)
}

pub(crate) fn column(name: &str) -> Result<Expr, QuarryError> {
    Ok(Expr::col(column_ref(name)?))
}

/// `SUM` or `AVG`, both coalesced to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Avg,
}

/// Caller-trusted SQL fragment with `?` placeholders, ANDed into a WHERE clause.
///
/// The text is interpolated as-is; only its values are bound.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPredicate {
    pub sql: String,
    pub values: Vec<Value>,
}

impl RawPredicate {
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }

    pub fn to_expr(&self) -> Expr {
        Expr::cust_with_values(
            self.sql.as_str(),
            self.values.iter().map(Value::to_sea_value).collect::<Vec<_>>(),
        )
    }
}

pub struct Compiler<'a> {
    config: &'a EngineConfig,
    dialect: Dialect,
    table: &'a str,
    soft_delete: Option<&'a str>,
}

impl<'a> Compiler<'a> {
    pub fn new(config: &'a EngineConfig, dialect: Dialect, table: &'a str) -> Self {
        Self {
            config,
            dialect,
            table,
            soft_delete: None,
        }
    }

    /// Scope every read to rows where `column IS NULL` and turn deletes into updates.
    pub fn soft_delete(mut self, column: Option<&'a str>) -> Self {
        self.soft_delete = column;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn table_ident(&self) -> Ident {
        Ident::new(self.table)
    }

    /// The query's predicate plus `extra`, scoped to live rows.
    pub fn scoped(&self, base: Option<Condition>, extra: Vec<Expr>) -> Result<Option<Condition>, QuarryError> {
        let mut all = Condition::all();
        if let Some(base) = base {
            all = all.add(base);
        }
        for expr in extra {
            all = all.add(expr);
        }
        if let Some(col) = self.soft_delete {
            all = all.add(column(col)?.is_null());
        }
        Ok((!all.is_empty()).then_some(all))
    }

    fn filtered(&self, query: &Query, extra: Vec<Expr>) -> Result<Option<Condition>, QuarryError> {
        self.scoped(search_condition(query, self.config)?, extra)
    }

    /// Normalized page: page numbers below 1 become 1, a size of 0 takes the
    /// configured default, and sizes are capped at the configured maximum.
    ///
    /// A page whose row offset does not fit a signed 64-bit OFFSET is rejected.
    pub fn page_window(&self, page: PageRequest) -> Result<PageRequest, QuarryError> {
        let size = if page.size == 0 {
            self.config.default_page_size
        } else {
            page.size
        };
        let window = PageRequest {
            page: page.page.max(1),
            size: self.config.clamp_limit(size),
        };
        page_offset(window)?;
        Ok(window)
    }

    /// Rows matching `query` with its projection, order and limit or page applied.
    pub fn select(&self, query: &Query, extra: Vec<Expr>) -> Result<SelectStatement, QuarryError> {
        let mut select = SeaQuery::select();
        select.from(self.table_ident());

        if query.filter_columns().is_empty() {
            select.column(Asterisk);
        } else {
            for name in query.filter_columns() {
                select.column(column_ref(name)?);
            }
        }

        if let Some(cond) = self.filtered(query, extra)? {
            select.cond_where(cond);
        }

        for order in query.order_clauses() {
            let direction = match order.direction {
                Direction::Asc => Order::Asc,
                Direction::Desc => Order::Desc,
            };
            select.order_by(column_ref(&order.field)?, direction);
        }

        if let Some(page) = query.page_request() {
            let window = self.page_window(page)?;
            select.limit(window.size).offset(page_offset(window)?);
        } else if let Some(limit) = query.limit_rows() {
            select.limit(self.config.clamp_limit(limit));
        }

        Ok(select)
    }

    /// `SELECT COUNT(*)` over the query's predicate; projection, order and paging ignored.
    pub fn count(&self, query: &Query, extra: Vec<Expr>) -> Result<SelectStatement, QuarryError> {
        let cond = self.filtered(query, extra)?;
        Ok(self.count_where(cond))
    }

    pub fn count_where(&self, cond: Option<Condition>) -> SelectStatement {
        let mut select = SeaQuery::select();
        select
            .expr_as(Func::count(Expr::col(Asterisk)), Ident::new(COUNT_ALIAS))
            .from(self.table_ident());
        if let Some(cond) = cond {
            select.cond_where(cond);
        }
        select
    }

    /// `SELECT COALESCE(SUM|AVG(field), 0)` over the query's predicate.
    pub fn aggregate(
        &self,
        query: &Query,
        aggregate: Aggregate,
        field: &str,
    ) -> Result<SelectStatement, QuarryError> {
        let target = column(field)?;
        let call = match aggregate {
            Aggregate::Sum => Func::sum(target),
            Aggregate::Avg => Func::avg(target),
        };
        let mut select = SeaQuery::select();
        select
            .expr_as(
                Func::coalesce([Expr::from(call), Expr::cust("0")]),
                Ident::new(AGGREGATE_ALIAS),
            )
            .from(self.table_ident());
        if let Some(cond) = self.filtered(query, Vec::new())? {
            select.cond_where(cond);
        }
        Ok(select)
    }

    /// INSERT of every column in `record`, returning the stored row where supported.
    pub fn insert(&self, record: &Record) -> Result<sea_query::InsertStatement, QuarryError> {
        if record.is_empty() {
            return Err(QuarryError::InvalidCondition(format!(
                "nothing to insert into {}",
                self.table
            )));
        }
        let mut columns = Vec::with_capacity(record.len());
        let mut values = Vec::with_capacity(record.len());
        for (name, value) in record.iter() {
            validate_field(name)?;
            columns.push(Ident::new(name));
            values.push(Expr::from(value.to_sea_value()));
        }

        let mut insert = SeaQuery::insert();
        insert
            .into_table(self.table_ident())
            .columns(columns)
            .values(values)
            .map_err(|e| QuarryError::InvalidCondition(e.to_string()))?;
        if self.dialect.supports_returning() {
            insert.returning_col(Asterisk);
        }
        Ok(insert)
    }

    /// UPDATE setting `record`'s columns on rows matching `cond`.
    pub fn update(&self, record: &Record, cond: Condition) -> Result<UpdateStatement, QuarryError> {
        if record.is_empty() {
            return Err(QuarryError::InvalidCondition(format!(
                "nothing to update in {}",
                self.table
            )));
        }
        let mut update = SeaQuery::update();
        update.table(self.table_ident());
        for (name, value) in record.iter() {
            validate_field(name)?;
            update.value(Ident::new(name), value.to_sea_value());
        }
        update.cond_where(cond);
        Ok(update)
    }

    /// Physical DELETE, or an UPDATE stamping the soft-delete column.
    pub fn delete(&self, cond: Condition) -> Result<Rendered, QuarryError> {
        match self.soft_delete {
            Some(col) => {
                validate_field(col)?;
                let mut update = SeaQuery::update();
                update
                    .table(self.table_ident())
                    .value(Ident::new(col), Expr::cust("CURRENT_TIMESTAMP"))
                    .cond_where(cond);
                self.render(&update)
            }
            None => {
                let mut delete: DeleteStatement = SeaQuery::delete();
                delete.from_table(self.table_ident()).cond_where(cond);
                self.render(&delete)
            }
        }
    }

    pub fn render<S: QueryStatementWriter>(&self, statement: &S) -> Result<Rendered, QuarryError> {
        render(statement, self.dialect)
    }
}

fn page_offset(window: PageRequest) -> Result<u64, QuarryError> {
    (window.page - 1)
        .checked_mul(window.size)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| {
            QuarryError::InvalidCondition(format!(
                "page {} of size {} is out of range",
                window.page, window.size
            ))
        })
}

pub type Rendered = Statement;

/// Render for `dialect`, converting bound values back into engine values.
pub fn render<S: QueryStatementWriter>(statement: &S, dialect: Dialect) -> Result<Statement, QuarryError> {
    let (sql, values) = match dialect {
        Dialect::Postgres => statement.build(PostgresQueryBuilder),
        Dialect::MySql => statement.build(MysqlQueryBuilder),
        Dialect::Sqlite => statement.build(SqliteQueryBuilder),
    };
    let values = values
        .0
        .iter()
        .map(Value::from_sea_value)
        .collect::<Result<Vec<_>, _>>()?;
    let statement = Statement::new(sql, values);
    log::debug!("compiled: {}", statement);
    Ok(statement)
}
