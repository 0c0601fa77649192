//! # Quarry
//!
//! Declarative query-and-mutation engine over relational stores, with a PostgreSQL
//! executor for the `may` coroutine runtime.
//!
//! A serializable [`Query`] (projection, boolean search groups, ordering, paging,
//! required fields, includes) is validated, compiled into a parameterized
//! statement and run through a [`StoreExecutor`]. Store failures come back as a
//! [`QuarryError`] from a fixed vocabulary, whatever the dialect.
//!
//! ```
//! use quarry::{Condition, ConditionGroup, Operator, Query};
//!
//! let query = Query::new()
//!     .filter(["id", "email"])
//!     .search(
//!         ConditionGroup::any()
//!             .push("name", Operator::Like, "ann")?
//!             .push("email", Operator::RightLike, "ann")?,
//!     )
//!     .and_where(Condition::eq("active", true)?)
//!     .page(1, 20);
//! query.validate()?;
//! # Ok::<(), quarry::QuarryError>(())
//! ```

pub mod compile;
pub mod config;
pub mod connection;
pub mod context;
pub mod entity;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod metrics;
pub mod pager;
pub mod query;
pub mod record;
pub mod repository;
pub mod value;

pub use compile::{Compiler, RawPredicate};
pub use config::{DatabaseConfig, EngineConfig};
pub use context::{CallContext, CancelToken};
pub use entity::{decode_field, Entity, Fields, PreloadFn};
pub use error::{classify, ErrorKind, QuarryError, StoreError};
pub use executor::{
    Dialect, ExecResult, IsolationLevel, MayPostgresExecutor, MockExecutor, MockReply, Statement,
    StatementKind, StoreExecutor, Transaction,
};
pub use mapping::{map_all, map_into};
pub use pager::Pager;
pub use query::{
    is_valid_field, is_valid_operator, normalize_operator, Combinator, Condition, ConditionGroup,
    Direction, Operator, OrderBy, PageRequest, Query, QueryWire,
};
pub use record::Record;
pub use repository::{ColumnFilter, MutationResult, Repository, WriteOptions};
pub use value::{TryGetable, Value, ValueExtractionError};

pub use quarry_derive::{Entity, Fields};
