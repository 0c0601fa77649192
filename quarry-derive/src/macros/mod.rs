//! Macro implementations

pub mod entity;
pub mod fields;

pub use entity::derive_entity;
pub use fields::derive_fields;
