//! Identifier whitelisting.
//!
//! Identifiers are the only strings interpolated into statements, so every field,
//! order-by column, include segment and aggregate target goes through here first.

use crate::error::QuarryError;

/// `true` when `name` is non-empty and matches `[A-Za-z0-9_.]+`.
pub fn is_valid_field(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
}

pub fn validate_field(name: &str) -> Result<(), QuarryError> {
    if is_valid_field(name) {
        Ok(())
    } else {
        Err(QuarryError::InvalidField(name.to_string()))
    }
}

/// Validate a dot-path include; every segment must be a non-empty identifier.
pub fn validate_include(path: &str) -> Result<(), QuarryError> {
    if path.is_empty() || path.split('.').any(|segment| !is_valid_field(segment)) {
        return Err(QuarryError::InvalidField(path.to_string()));
    }
    Ok(())
}
