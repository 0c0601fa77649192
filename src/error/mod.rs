//! Error taxonomy.
//!
//! Every failure the engine reports is a [`QuarryError`]. Parser-level kinds are
//! produced before any statement is issued; store-level kinds come out of
//! [`classify`], which turns the driver's native error shape ([`StoreError`]) into
//! the stable vocabulary below.

use crate::value::ValueExtractionError;
use std::fmt;

mod classify;

pub use classify::classify;

/// Stable, dialect-independent error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    ForeignKeyViolation,
    NullConstraintViolation,
    DataTooLong,
    ConstraintFailed,
    GenericDatabaseError,
    InvalidField,
    InvalidOperator,
    InvalidCondition,
    MissingRequiredField,
    Canceled,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::ForeignKeyViolation => "foreign_key_violation",
            ErrorKind::NullConstraintViolation => "null_constraint_violation",
            ErrorKind::DataTooLong => "data_too_long",
            ErrorKind::ConstraintFailed => "constraint_failed",
            ErrorKind::GenericDatabaseError => "generic_database_error",
            ErrorKind::InvalidField => "invalid_field",
            ErrorKind::InvalidOperator => "invalid_operator",
            ErrorKind::InvalidCondition => "invalid_condition",
            ErrorKind::MissingRequiredField => "missing_required_field",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Timeout => "timeout",
        }
    }
}

/// Error type returned by every engine operation
#[derive(Debug, Clone, PartialEq)]
pub enum QuarryError {
    /// Identifier outside `[A-Za-z0-9_.]+`, or an unknown relation/column
    InvalidField(String),
    /// Operator outside the closed set after normalization
    InvalidOperator(String),
    /// Malformed condition shape or value arity
    InvalidCondition(String),
    /// A required field never appears in the search tree
    MissingRequiredField(String),
    /// No row matched
    NotFound { table: String },
    /// Uniqueness violated; `field` names the column or the `a,b` group
    Duplicate { field: String, value: Option<String> },
    ForeignKeyViolation { field: Option<String>, message: String },
    NullConstraintViolation { field: Option<String>, message: String },
    DataTooLong { field: Option<String>, message: String },
    ConstraintFailed { constraint: Option<String>, message: String },
    /// Unclassified store failure, raw message preserved
    Database(String),
    /// A row could not be decoded into the target type
    Decode(String),
    Canceled,
    Timeout,
}

impl QuarryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuarryError::InvalidField(_) => ErrorKind::InvalidField,
            QuarryError::InvalidOperator(_) => ErrorKind::InvalidOperator,
            QuarryError::InvalidCondition(_) => ErrorKind::InvalidCondition,
            QuarryError::MissingRequiredField(_) => ErrorKind::MissingRequiredField,
            QuarryError::NotFound { .. } => ErrorKind::NotFound,
            QuarryError::Duplicate { .. } => ErrorKind::Duplicate,
            QuarryError::ForeignKeyViolation { .. } => ErrorKind::ForeignKeyViolation,
            QuarryError::NullConstraintViolation { .. } => ErrorKind::NullConstraintViolation,
            QuarryError::DataTooLong { .. } => ErrorKind::DataTooLong,
            QuarryError::ConstraintFailed { .. } => ErrorKind::ConstraintFailed,
            QuarryError::Database(_) | QuarryError::Decode(_) => ErrorKind::GenericDatabaseError,
            QuarryError::Canceled => ErrorKind::Canceled,
            QuarryError::Timeout => ErrorKind::Timeout,
        }
    }

    /// `true` for failures detected from the Query value alone.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidField
                | ErrorKind::InvalidOperator
                | ErrorKind::InvalidCondition
                | ErrorKind::MissingRequiredField
        )
    }

    /// Column or group the error refers to, when known.
    pub fn field(&self) -> Option<&str> {
        match self {
            QuarryError::InvalidField(f) | QuarryError::MissingRequiredField(f) => Some(f),
            QuarryError::Duplicate { field, .. } => Some(field),
            QuarryError::ForeignKeyViolation { field, .. }
            | QuarryError::NullConstraintViolation { field, .. }
            | QuarryError::DataTooLong { field, .. } => field.as_deref(),
            QuarryError::ConstraintFailed { constraint, .. } => constraint.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn not_found(table: &str) -> Self {
        QuarryError::NotFound {
            table: table.to_string(),
        }
    }
}

impl fmt::Display for QuarryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuarryError::InvalidField(name) => write!(f, "Invalid field: {}", name),
            QuarryError::InvalidOperator(op) => write!(f, "Invalid operator: {}", op),
            QuarryError::InvalidCondition(msg) => write!(f, "Invalid condition: {}", msg),
            QuarryError::MissingRequiredField(name) => {
                write!(f, "Missing required field: {}", name)
            }
            QuarryError::NotFound { table } => write!(f, "Record not found in {}", table),
            QuarryError::Duplicate { field, value } => match value {
                Some(v) => write!(f, "Duplicate value '{}' for {}", v, field),
                None => write!(f, "Duplicate value for {}", field),
            },
            QuarryError::ForeignKeyViolation { field, message } => {
                write_with_field(f, "Foreign key violation", field, message)
            }
            QuarryError::NullConstraintViolation { field, message } => {
                write_with_field(f, "Null constraint violation", field, message)
            }
            QuarryError::DataTooLong { field, message } => {
                write_with_field(f, "Data too long", field, message)
            }
            QuarryError::ConstraintFailed {
                constraint,
                message,
            } => write_with_field(f, "Constraint failed", constraint, message),
            QuarryError::Database(msg) => write!(f, "Database error: {}", msg),
            QuarryError::Decode(msg) => write!(f, "Decode error: {}", msg),
            QuarryError::Canceled => write!(f, "Operation canceled"),
            QuarryError::Timeout => write!(f, "Operation timed out"),
        }
    }
}

fn write_with_field(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    field: &Option<String>,
    message: &str,
) -> fmt::Result {
    match field {
        Some(field) => write!(f, "{} on {}: {}", label, field, message),
        None => write!(f, "{}: {}", label, message),
    }
}

impl std::error::Error for QuarryError {}

impl From<ValueExtractionError> for QuarryError {
    fn from(err: ValueExtractionError) -> Self {
        QuarryError::Decode(err.to_string())
    }
}

impl From<StoreError> for QuarryError {
    fn from(err: StoreError) -> Self {
        classify(err)
    }
}

/// Native failure as reported by an executor, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreError {
    /// SQLSTATE (`23505`) or vendor numeric code (`1062`) as text
    pub code: Option<String>,
    pub message: String,
    pub detail: Option<String>,
    pub constraint: Option<String>,
    pub column: Option<String>,
    pub table: Option<String>,
    /// Set when the round-trip was abandoned because of the call context
    pub interrupted: Option<Interruption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Canceled,
    Timeout,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn canceled() -> Self {
        Self {
            message: "canceled".to_string(),
            interrupted: Some(Interruption::Canceled),
            ..Self::default()
        }
    }

    pub fn timeout() -> Self {
        Self {
            message: "timeout".to_string(),
            interrupted: Some(Interruption::Timeout),
            ..Self::default()
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for StoreError {}
