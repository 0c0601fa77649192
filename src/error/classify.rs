//! Error detection and classification utilities.
//!
//! Native errors are classified by code first (PostgreSQL SQLSTATE, MySQL numeric
//! codes) and by message pattern second (MySQL, SQLite and driver messages). The
//! offending column, key or value is extracted whenever the native format carries
//! it. Anything unrecognized becomes [`QuarryError::Database`] with the raw message.

use super::{Interruption, QuarryError, StoreError};
use once_cell::sync::Lazy;
use regex::Regex;

static PG_KEY_DETAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Key \((?P<key>[^)]+)\)=\((?P<value>.*?)\)").unwrap());
static PG_NULL_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"null value in column "(?P<col>[^"]+)""#).unwrap());
static MYSQL_DUPLICATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duplicate entry '(?P<value>.*)' for key '(?P<key>[^']+)'").unwrap()
});
static MYSQL_NULL_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Column '(?P<col>[^']+)' cannot be null").unwrap());
static MYSQL_NO_DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Field '(?P<col>[^']+)' doesn't have a default value").unwrap());
static MYSQL_TOO_LONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Data too long for column '(?P<col>[^']+)'").unwrap());
static MYSQL_FOREIGN_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"FOREIGN KEY \(`(?P<col>[^`]+)`\)").unwrap());
static MYSQL_CHECK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Check constraint '(?P<name>[^']+)' is violated").unwrap());
static SQLITE_CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<kind>UNIQUE|NOT NULL|CHECK) constraint failed: (?P<target>[^\s,]+)").unwrap()
});

/// Classify a native store failure into the taxonomy.
pub fn classify(err: StoreError) -> QuarryError {
    if let Some(interruption) = err.interrupted {
        return match interruption {
            Interruption::Canceled => QuarryError::Canceled,
            Interruption::Timeout => QuarryError::Timeout,
        };
    }

    if let Some(code) = err.code.as_deref() {
        if let Some(classified) = by_code(code, &err) {
            return classified;
        }
    }

    if let Some(classified) = by_message(&err) {
        return classified;
    }

    log::warn!("unclassified store error: {}", err);
    QuarryError::Database(err.message)
}

fn by_code(code: &str, err: &StoreError) -> Option<QuarryError> {
    let classified = match code {
        // PostgreSQL
        "23505" => duplicate_from_detail(err),
        "23503" => QuarryError::ForeignKeyViolation {
            field: err
                .detail
                .as_deref()
                .and_then(|d| capture(&PG_KEY_DETAIL, d, "key"))
                .or_else(|| err.column.clone()),
            message: err.message.clone(),
        },
        "23502" => QuarryError::NullConstraintViolation {
            field: err
                .column
                .clone()
                .or_else(|| capture(&PG_NULL_COLUMN, &err.message, "col")),
            message: err.message.clone(),
        },
        "22001" => QuarryError::DataTooLong {
            field: err.column.clone(),
            message: err.message.clone(),
        },
        "P0002" => QuarryError::NotFound {
            table: err.table.clone().unwrap_or_default(),
        },
        "57014" => QuarryError::Canceled,
        // MySQL
        "1062" | "1586" => match MYSQL_DUPLICATE.captures(&err.message) {
            Some(caps) => QuarryError::Duplicate {
                field: strip_table_prefix(&caps["key"]),
                value: Some(caps["value"].to_string()),
            },
            None => duplicate_from_detail(err),
        },
        "1451" | "1452" | "1216" | "1217" => QuarryError::ForeignKeyViolation {
            field: capture(&MYSQL_FOREIGN_KEY, &err.message, "col"),
            message: err.message.clone(),
        },
        "1048" | "1364" => QuarryError::NullConstraintViolation {
            field: capture(&MYSQL_NULL_COLUMN, &err.message, "col")
                .or_else(|| capture(&MYSQL_NO_DEFAULT, &err.message, "col")),
            message: err.message.clone(),
        },
        "1406" => QuarryError::DataTooLong {
            field: capture(&MYSQL_TOO_LONG, &err.message, "col"),
            message: err.message.clone(),
        },
        "3819" => QuarryError::ConstraintFailed {
            constraint: capture(&MYSQL_CHECK, &err.message, "name"),
            message: err.message.clone(),
        },
        // Remaining PostgreSQL integrity violations (check, exclusion, ...)
        c if c.starts_with("23") => QuarryError::ConstraintFailed {
            constraint: err.constraint.clone(),
            message: err.message.clone(),
        },
        _ => return None,
    };
    Some(classified)
}

fn by_message(err: &StoreError) -> Option<QuarryError> {
    let message = err.message.as_str();

    if let Some(caps) = MYSQL_DUPLICATE.captures(message) {
        return Some(QuarryError::Duplicate {
            field: strip_table_prefix(&caps["key"]),
            value: Some(caps["value"].to_string()),
        });
    }
    if let Some(caps) = SQLITE_CONSTRAINT.captures(message) {
        let target = strip_table_prefix(&caps["target"]);
        let classified = match &caps["kind"] {
            "UNIQUE" => QuarryError::Duplicate {
                field: target,
                value: None,
            },
            "NOT NULL" => QuarryError::NullConstraintViolation {
                field: Some(target),
                message: message.to_string(),
            },
            _ => QuarryError::ConstraintFailed {
                constraint: Some(target),
                message: message.to_string(),
            },
        };
        return Some(classified);
    }

    let lower = message.to_lowercase();
    if lower.contains("duplicate key") || lower.contains("unique constraint") {
        return Some(duplicate_from_detail(err));
    }
    if lower.contains("foreign key constraint") {
        return Some(QuarryError::ForeignKeyViolation {
            field: capture(&MYSQL_FOREIGN_KEY, message, "col").or_else(|| err.column.clone()),
            message: message.to_string(),
        });
    }
    if let Some(col) = capture(&MYSQL_NULL_COLUMN, message, "col")
        .or_else(|| capture(&PG_NULL_COLUMN, message, "col"))
    {
        return Some(QuarryError::NullConstraintViolation {
            field: Some(col),
            message: message.to_string(),
        });
    }
    if let Some(col) = capture(&MYSQL_TOO_LONG, message, "col") {
        return Some(QuarryError::DataTooLong {
            field: Some(col),
            message: message.to_string(),
        });
    }
    if lower.contains("value too long") {
        return Some(QuarryError::DataTooLong {
            field: err.column.clone(),
            message: message.to_string(),
        });
    }
    if lower.contains("check constraint") {
        return Some(QuarryError::ConstraintFailed {
            constraint: capture(&MYSQL_CHECK, message, "name").or_else(|| err.constraint.clone()),
            message: message.to_string(),
        });
    }
    if is_no_rows_message(&lower) {
        return Some(QuarryError::NotFound {
            table: err.table.clone().unwrap_or_default(),
        });
    }
    if lower.contains("canceling statement due to user request") {
        return Some(QuarryError::Canceled);
    }
    None
}

fn duplicate_from_detail(err: &StoreError) -> QuarryError {
    if let Some(caps) = err.detail.as_deref().and_then(|d| PG_KEY_DETAIL.captures(d)) {
        return QuarryError::Duplicate {
            field: caps["key"].replace(' ', ""),
            value: Some(caps["value"].to_string()),
        };
    }
    QuarryError::Duplicate {
        field: err
            .column
            .clone()
            .or_else(|| err.constraint.clone())
            .unwrap_or_default(),
        value: None,
    }
}

/// Only match specific "no rows" patterns, not the broad "not found", so that
/// "table not found" or "column not found" are not mistaken for an empty result.
fn is_no_rows_message(lower: &str) -> bool {
    lower.contains("no rows")
        || lower.contains("no row")
        || lower.contains("row not found")
        || lower.contains("record not found")
        || lower.contains("expected one row")
        || lower.contains("query returned an unexpected number of rows")
}

fn capture(re: &Regex, haystack: &str, group: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.name(group).map(|m| m.as_str().to_string()))
}

/// `users.email` → `email`
fn strip_table_prefix(key: &str) -> String {
    key.rsplit('.').next().unwrap_or(key).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_postgres_unique_violation_extracts_key_and_value() {
        let err = StoreError::new("duplicate key value violates unique constraint \"users_email_key\"")
            .with_code("23505")
            .with_detail("Key (email)=(a@example.com) already exists.");
        assert_eq!(
            classify(err),
            QuarryError::Duplicate {
                field: "email".into(),
                value: Some("a@example.com".into())
            }
        );
    }

    #[test]
    fn test_postgres_composite_unique_violation() {
        let err = StoreError::new("duplicate key value violates unique constraint")
            .with_code("23505")
            .with_detail("Key (org_id, slug)=(1, home) already exists.");
        let classified = classify(err);
        assert_eq!(classified.field(), Some("org_id,slug"));
    }

    #[test]
    fn test_postgres_foreign_key() {
        let err = StoreError::new("insert or update on table \"posts\" violates foreign key constraint")
            .with_code("23503")
            .with_detail("Key (user_id)=(99) is not present in table \"users\".");
        let classified = classify(err);
        assert_eq!(classified.kind(), ErrorKind::ForeignKeyViolation);
        assert_eq!(classified.field(), Some("user_id"));
    }

    #[test]
    fn test_postgres_not_null_from_message() {
        let err = StoreError::new(
            "null value in column \"name\" of relation \"users\" violates not-null constraint",
        )
        .with_code("23502");
        let classified = classify(err);
        assert_eq!(classified.kind(), ErrorKind::NullConstraintViolation);
        assert_eq!(classified.field(), Some("name"));
    }

    #[test]
    fn test_postgres_data_too_long() {
        let err = StoreError::new("value too long for type character varying(10)")
            .with_code("22001")
            .with_column("name");
        let classified = classify(err);
        assert_eq!(classified.kind(), ErrorKind::DataTooLong);
        assert_eq!(classified.field(), Some("name"));
    }

    #[test]
    fn test_postgres_check_violation() {
        let err = StoreError::new("new row violates check constraint \"age_positive\"")
            .with_code("23514")
            .with_constraint("age_positive");
        let classified = classify(err);
        assert_eq!(classified.kind(), ErrorKind::ConstraintFailed);
        assert_eq!(classified.field(), Some("age_positive"));
    }

    #[test]
    fn test_mysql_duplicate_entry() {
        let err = StoreError::new("Error 1062: Duplicate entry 'bob' for key 'users.idx_username'")
            .with_code("1062");
        assert_eq!(
            classify(err),
            QuarryError::Duplicate {
                field: "idx_username".into(),
                value: Some("bob".into())
            }
        );
    }

    #[test]
    fn test_mysql_messages_without_code() {
        let classified = classify(StoreError::new("Column 'email' cannot be null"));
        assert_eq!(classified.kind(), ErrorKind::NullConstraintViolation);
        assert_eq!(classified.field(), Some("email"));

        let classified = classify(StoreError::new("Data too long for column 'title' at row 1"));
        assert_eq!(classified.kind(), ErrorKind::DataTooLong);
        assert_eq!(classified.field(), Some("title"));

        let classified = classify(StoreError::new(
            "Cannot add or update a child row: a foreign key constraint fails (`db`.`posts`, CONSTRAINT `fk` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`))",
        ));
        assert_eq!(classified.kind(), ErrorKind::ForeignKeyViolation);
        assert_eq!(classified.field(), Some("user_id"));
    }

    #[test]
    fn test_sqlite_messages() {
        let classified = classify(StoreError::new("UNIQUE constraint failed: users.email"));
        assert_eq!(
            classified,
            QuarryError::Duplicate {
                field: "email".into(),
                value: None
            }
        );
        let classified = classify(StoreError::new("NOT NULL constraint failed: users.name"));
        assert_eq!(classified.field(), Some("name"));
    }

    #[test]
    fn test_no_rows_is_not_found_but_table_not_found_is_not() {
        assert_eq!(
            classify(StoreError::new("query returned no rows")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            classify(StoreError::new("table not found")).kind(),
            ErrorKind::GenericDatabaseError
        );
    }

    #[test]
    fn test_unparseable_keeps_raw_message() {
        assert_eq!(
            classify(StoreError::new("connection reset by peer")),
            QuarryError::Database("connection reset by peer".into())
        );
    }

    #[test]
    fn test_interruptions() {
        assert_eq!(classify(StoreError::canceled()), QuarryError::Canceled);
        assert_eq!(classify(StoreError::timeout()), QuarryError::Timeout);
    }
}
