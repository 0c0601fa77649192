//! Tests for the Entity and Fields derives

use quarry::{CallContext, Entity, Fields, QuarryError, Record, StoreExecutor, Value};

#[derive(Debug, Clone, PartialEq, Entity)]
#[table_name = "users"]
#[unique_group = "tenant_id,username"]
#[relations = "posts"]
#[preload = "load_posts"]
pub struct User {
    #[primary_key]
    pub id: i64,
    #[unique]
    pub email: String,
    pub tenant_id: i64,
    pub username: String,
    #[column_name = "display_name"]
    pub name: Option<String>,
    #[soft_delete]
    pub deleted_at: Option<String>,
    #[skip]
    pub post_titles: Vec<String>,
}

fn load_posts(
    rows: &mut [User],
    relation: &str,
    rest: Option<&str>,
    _executor: &dyn StoreExecutor,
    _ctx: &CallContext,
) -> Result<(), QuarryError> {
    assert_eq!(relation, "posts");
    for row in rows.iter_mut() {
        row.post_titles = vec![format!("{}:{}", row.id, rest.unwrap_or("-"))];
    }
    Ok(())
}

#[derive(Debug, PartialEq, Fields)]
pub struct UserSummary {
    pub id: i64,
    #[column_name = "display_name"]
    pub name: Option<String>,
}

#[derive(Debug, Entity)]
pub struct AuditLog {
    pub id: i64,
    pub message: String,
}

fn sample() -> User {
    User {
        id: 1,
        email: "ann@example.com".into(),
        tenant_id: 3,
        username: "ann".into(),
        name: Some("Ann".into()),
        deleted_at: None,
        post_titles: Vec::new(),
    }
}

#[test]
fn test_entity_metadata() {
    assert_eq!(User::TABLE_NAME, "users");
    assert_eq!(User::PRIMARY_KEY, "id");
    assert_eq!(User::unique_fields(), &["email"]);
    assert_eq!(User::unique_groups(), &[&["tenant_id", "username"][..]]);
    assert_eq!(User::soft_delete_column(), Some("deleted_at"));
    assert_eq!(User::relations(), &["posts"]);
}

#[test]
fn test_defaults_without_attributes() {
    assert_eq!(AuditLog::TABLE_NAME, "audit_log");
    assert_eq!(AuditLog::PRIMARY_KEY, "id");
    assert!(AuditLog::unique_fields().is_empty());
    assert!(AuditLog::unique_groups().is_empty());
    assert_eq!(AuditLog::soft_delete_column(), None);
}

#[test]
fn test_field_names_skip_and_rename() {
    assert_eq!(
        User::field_names(),
        &["id", "email", "tenant_id", "username", "display_name", "deleted_at"]
    );
}

#[test]
fn test_record_round_trip() {
    let user = sample();
    let record = user.to_record();
    assert_eq!(record.get("display_name"), Some(&Value::from("Ann")));
    assert_eq!(record.get("deleted_at"), Some(&Value::Null));
    assert!(!record.contains("post_titles"));

    let back = User::from_record(&record).unwrap();
    assert_eq!(back, user);
    assert_eq!(back.primary_key_value(), Value::Int(1));
}

#[test]
fn test_from_record_reports_bad_column() {
    let record = Record::new()
        .with("id", "not a number")
        .with("email", "x@y.z")
        .with("tenant_id", 1)
        .with("username", "x");
    let err = User::from_record(&record).unwrap_err();
    assert!(matches!(err, QuarryError::Decode(ref msg) if msg.starts_with("column id")));
}

#[test]
fn test_preload_hook_is_wired() {
    let mock = quarry::MockExecutor::new();
    let mut rows = vec![sample()];
    User::preload(
        &mut rows,
        "posts",
        Some("comments"),
        &mock,
        &CallContext::background(),
    )
    .unwrap();
    assert_eq!(rows[0].post_titles, vec!["1:comments".to_string()]);
}

#[test]
fn test_fields_derive_maps_dto() {
    let summary: UserSummary = quarry::map_into(&sample()).unwrap();
    assert_eq!(
        summary,
        UserSummary {
            id: 1,
            name: Some("Ann".into()),
        }
    );
}
