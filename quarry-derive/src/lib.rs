//! Procedural macros for quarry
//!
//! This crate provides `#[derive(Fields)]` and `#[derive(Entity)]`. Both are
//! re-exported from `quarry`; depend on that crate rather than this one.

mod attributes;
mod macros;
mod utils;

use proc_macro::TokenStream;

/// Derive macro for `Fields` - column-level view of a struct
///
/// Generates `field_names()`, `to_record()` and `from_record()`. Field types must
/// convert into `quarry::Value` and implement `quarry::TryGetable`.
///
/// Field attributes:
/// - `#[column_name = "..."]` - column name if it differs from the field name
/// - `#[skip]` - not mapped; filled with `Default::default()` when decoding
#[proc_macro_derive(Fields, attributes(column_name, skip))]
pub fn derive_fields(input: TokenStream) -> TokenStream {
    macros::derive_fields(input)
}

/// Derive macro for `Entity` - a table-backed type
///
/// Generates `Fields` as well as `Entity`.
///
/// Struct attributes:
/// - `#[table_name = "users"]` (defaults to the snake_case struct name)
/// - `#[unique_group = "tenant_id,username"]`, repeatable
/// - `#[relations = "posts,profile"]` - include roots
/// - `#[preload = "path::to::fn"]` - a `quarry::PreloadFn<Self>` for those relations
///
/// Field attributes: `#[primary_key]`, `#[unique]`, `#[soft_delete]`, plus the
/// ones `Fields` accepts. Without `#[primary_key]` a field named `id` is used.
///
/// ```ignore
/// #[derive(Entity)]
/// #[table_name = "users"]
/// pub struct User {
///     #[primary_key]
///     pub id: i64,
///     #[unique]
///     pub email: String,
/// }
/// ```
#[proc_macro_derive(
    Entity,
    attributes(
        table_name,
        unique_group,
        relations,
        preload,
        primary_key,
        column_name,
        unique,
        soft_delete,
        skip
    )
)]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    macros::derive_entity(input)
}
