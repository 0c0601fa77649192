//! Entity and field-mapping traits.
//!
//! Both are normally derived:
//!
//! ```ignore
//! #[derive(Entity)]
//! #[table_name = "users"]
//! #[unique_group = "tenant_id,username"]
//! #[relations = "posts"]
//! pub struct User {
//!     #[primary_key]
//!     pub id: i64,
//!     #[unique]
//!     pub email: String,
//!     pub tenant_id: i64,
//!     pub username: String,
//!     #[soft_delete]
//!     pub deleted_at: Option<String>,
//! }
//! ```
//!
//! `#[derive(Fields)]` alone is enough for DTOs that only move through
//! [`map_into`](crate::mapping::map_into).

use crate::context::CallContext;
use crate::error::QuarryError;
use crate::executor::StoreExecutor;
use crate::record::Record;
use crate::value::Value;

/// Column-level view of a struct.
pub trait Fields: Sized {
    /// Column names in declaration order
    fn field_names() -> &'static [&'static str];

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self, QuarryError>;
}

/// Hook signature for loading a relation into already-fetched rows.
///
/// Receives the root relation name and the rest of the dotted include path, if any.
pub type PreloadFn<E> =
    fn(&mut [E], &str, Option<&str>, &dyn StoreExecutor, &CallContext) -> Result<(), QuarryError>;

/// A table-backed type.
pub trait Entity: Fields {
    const TABLE_NAME: &'static str;
    const PRIMARY_KEY: &'static str;

    /// Columns that must each be unique among live rows
    fn unique_fields() -> &'static [&'static str] {
        &[]
    }

    /// Column groups that must be jointly unique among live rows
    fn unique_groups() -> &'static [&'static [&'static str]] {
        &[]
    }

    /// Timestamp column marking a row deleted; reads skip rows where it is set.
    fn soft_delete_column() -> Option<&'static str> {
        None
    }

    /// Relation names accepted as include roots.
    fn relations() -> &'static [&'static str] {
        &[]
    }

    fn preload(
        rows: &mut [Self],
        relation: &str,
        rest: Option<&str>,
        executor: &dyn StoreExecutor,
        ctx: &CallContext,
    ) -> Result<(), QuarryError> {
        let _ = (rows, rest, executor, ctx);
        log::debug!(
            "{} declares relation {} without a preload hook",
            Self::TABLE_NAME,
            relation
        );
        Ok(())
    }

    fn primary_key_value(&self) -> Value {
        self.to_record()
            .get(Self::PRIMARY_KEY)
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Decode one column of `record` into a field, naming the column on failure.
///
/// Used by derived `from_record` implementations. A missing column decodes as null,
/// so `Option` fields tolerate projections that leave them out.
pub fn decode_field<T: crate::value::TryGetable>(
    record: &Record,
    column: &str,
) -> Result<T, QuarryError> {
    let value = record.get(column).cloned().unwrap_or(Value::Null);
    T::try_get(value).map_err(|e| QuarryError::Decode(format!("column {}: {}", column, e)))
}
