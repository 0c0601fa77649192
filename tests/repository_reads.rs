//! Read and aggregate paths against the mock executor

mod common;

use common::{count_row, product_row, products, user_row, users};
use quarry::{
    CallContext, Condition, ConditionGroup, Direction, MockExecutor, Operator, QuarryError, Query,
    Record, StatementKind, Value,
};

fn ctx() -> CallContext {
    CallContext::background()
}

#[test]
fn test_invalid_identifiers_execute_nothing() {
    let mock = MockExecutor::new();
    let repo = products(&mock);

    let bad_queries = vec![
        Query::new().filter(["name; DROP TABLE products"]),
        Query::new().order_by("price desc", Direction::Asc),
        Query::new().include(["reviews..author"]),
        Query::new().required(["bad field"]),
    ];
    for query in &bad_queries {
        assert!(matches!(repo.get(query, &ctx()), Err(QuarryError::InvalidField(_))));
        assert!(matches!(repo.page(query, &ctx()), Err(QuarryError::InvalidField(_))));
        assert!(matches!(repo.count(query, &ctx()), Err(_)));
    }
    assert_eq!(mock.total_count(), 0);

    // Search fields are checked when the condition is built
    assert_eq!(
        Condition::eq("na-me", 1),
        Err(QuarryError::InvalidField("na-me".into()))
    );
}

#[test]
fn test_unknown_include_root_is_rejected() {
    let mock = MockExecutor::new();
    let err = products(&mock)
        .get(&Query::new().include(["owner"]), &ctx())
        .unwrap_err();
    assert_eq!(err, QuarryError::InvalidField("owner".into()));
    assert_eq!(mock.total_count(), 0);
}

#[test]
fn test_or_groups_are_parenthesized_and_anded() {
    let mock = MockExecutor::new();
    let g1 = ConditionGroup::any()
        .push("name", Operator::Eq, "a")
        .unwrap()
        .push("name", Operator::Eq, "b")
        .unwrap();
    let g2 = ConditionGroup::any()
        .push("stock", Operator::Gt, 1)
        .unwrap()
        .push("price", Operator::Lt, 5)
        .unwrap();
    products(&mock)
        .get(&Query::new().search(g1).search(g2), &ctx())
        .unwrap();

    let stmt = mock.last_statement().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"products\" WHERE (\"name\" = $1 OR \"name\" = $2) AND (\"stock\" > $3 OR \"price\" < $4)"
    );
    assert_eq!(
        stmt.values,
        vec![Value::from("a"), Value::from("b"), Value::Int(1), Value::Int(5)]
    );
}

#[test]
fn test_page_two_of_twenty_five() {
    let mock = MockExecutor::new();
    mock.push_rows(count_row(25));
    mock.push_rows((11..=20).map(|i| product_row(i, "p")).collect());

    let query = Query::new()
        .and_where(Condition::eq("name", "p").unwrap())
        .order_by("id", Direction::Asc)
        .page(2, 10);
    let page = products(&mock).page(&query, &ctx()).unwrap();

    assert_eq!(page.current_page, 2);
    assert_eq!(page.total, 25);
    assert_eq!(page.last_page, 3);
    assert_eq!(page.data.len(), 10);
    assert_eq!(page.data[0].id, 11);

    let statements = mock.statements();
    assert_eq!(
        statements[0].sql,
        "SELECT COUNT(*) AS \"count\" FROM \"products\" WHERE \"name\" = $1"
    );
    assert_eq!(
        statements[1].sql,
        "SELECT * FROM \"products\" WHERE \"name\" = $1 ORDER BY \"id\" ASC LIMIT $2 OFFSET $3"
    );
    assert_eq!(
        statements[1].values,
        vec![Value::from("p"), Value::Int(10), Value::Int(10)]
    );
}

#[test]
fn test_empty_page_has_last_page_one() {
    let mock = MockExecutor::new();
    mock.push_rows(count_row(0));

    let page = products(&mock).page(&Query::new(), &ctx()).unwrap();
    assert_eq!(page.current_page, 1);
    assert_eq!(page.page_size, 10);
    assert_eq!(page.total, 0);
    assert_eq!(page.last_page, 1);
    assert!(page.data.is_empty());
}

#[test]
fn test_page_size_is_capped() {
    let mock = MockExecutor::new();
    mock.push_rows(count_row(500));
    let page = products(&mock)
        .page(&Query::new().page(0, 1000), &ctx())
        .unwrap();
    assert_eq!((page.current_page, page.page_size, page.last_page), (1, 100, 5));
}

#[test]
fn test_count_and_aggregates_ignore_order_and_paging() {
    let mock = MockExecutor::new();
    mock.push_rows(count_row(4));
    mock.push_rows(vec![Record::new().with("value", 42.5)]);
    mock.push_rows(vec![Record::new().with("value", 7)]);

    let query = Query::new()
        .filter(["id"])
        .and_where(Condition::eq("name", "p").unwrap())
        .order_by("price", Direction::Desc)
        .page(3, 5);
    let repo = products(&mock);
    assert_eq!(repo.count(&query, &ctx()).unwrap(), 4);
    assert_eq!(repo.sum(&query, "price", &ctx()).unwrap(), 42.5);
    assert_eq!(repo.avg(&query, "stock", &ctx()).unwrap(), 7.0);

    let statements = mock.statements();
    for stmt in &statements {
        assert!(!stmt.sql.contains("ORDER BY"), "{}", stmt.sql);
        assert!(!stmt.sql.contains("LIMIT"), "{}", stmt.sql);
        assert!(stmt.sql.ends_with("WHERE \"name\" = $1"), "{}", stmt.sql);
    }
    assert!(statements[1].sql.starts_with("SELECT COALESCE(SUM(\"price\"), 0) AS \"value\""));
}

#[test]
fn test_aggregate_over_nothing_is_zero() {
    let mock = MockExecutor::new();
    mock.push_rows(vec![Record::new().with("value", Value::Null)]);
    let repo = products(&mock);
    assert_eq!(repo.sum(&Query::new(), "price", &ctx()).unwrap(), 0.0);
    // No row at all behaves the same
    assert_eq!(repo.avg(&Query::new(), "price", &ctx()).unwrap(), 0.0);
}

#[test]
fn test_aggregate_field_is_validated() {
    let mock = MockExecutor::new();
    let err = products(&mock)
        .sum(&Query::new(), "price) FROM secrets --", &ctx())
        .unwrap_err();
    assert!(matches!(err, QuarryError::InvalidField(_)));
    assert_eq!(mock.total_count(), 0);
}

#[test]
fn test_required_field_missing_from_search() {
    let mock = MockExecutor::new();
    let query = Query::new()
        .and_where(Condition::eq("name", "p").unwrap())
        .required(["stock"]);
    assert_eq!(
        products(&mock).count(&query, &ctx()),
        Err(QuarryError::MissingRequiredField("stock".into()))
    );
    assert_eq!(mock.total_count(), 0);
}

#[test]
fn test_in_with_scalar_and_between_with_three_values() {
    assert!(matches!(
        Condition::new("id", Operator::In, 5),
        Err(QuarryError::InvalidCondition(_))
    ));
    assert!(matches!(
        Condition::new("id", Operator::Between, vec![1, 2, 3]),
        Err(QuarryError::InvalidCondition(_))
    ));
}

#[test]
fn test_soft_deleted_rows_are_scoped_out() {
    let mock = MockExecutor::new();
    mock.push_rows(vec![user_row(1, "a@x.io")]);
    let found = users(&mock)
        .first(&Query::new().and_where(Condition::eq("email", "a@x.io").unwrap()), &ctx())
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(1));

    let stmt = mock.last_statement().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"users\" WHERE \"email\" = $1 AND \"deleted_at\" IS NULL LIMIT $2"
    );
}

#[test]
fn test_find_by_id_not_found() {
    let mock = MockExecutor::new();
    let err = users(&mock).find_by_id(99, &ctx()).unwrap_err();
    assert_eq!(err, QuarryError::NotFound { table: "users".into() });
    assert_eq!(mock.count(StatementKind::Query), 1);
}

#[test]
fn test_exists_and_exists_by_id() {
    let mock = MockExecutor::new();
    mock.push_rows(count_row(2));
    mock.push_rows(count_row(0));
    let repo = users(&mock);
    assert!(repo
        .exists(&Query::new().and_where(Condition::eq("tenant_id", 1).unwrap()), &ctx())
        .unwrap());
    assert!(!repo.exists_by_id(7, &ctx()).unwrap());
    assert_eq!(
        mock.last_statement().unwrap().sql,
        "SELECT COUNT(*) AS \"count\" FROM \"users\" WHERE \"id\" = $1 AND \"deleted_at\" IS NULL"
    );
}

#[test]
fn test_canceled_context_stops_before_the_store() {
    let mock = MockExecutor::new();
    let token = quarry::CancelToken::new();
    token.cancel();
    let canceled = CallContext::background().with_cancel(token);
    assert_eq!(
        products(&mock).count(&Query::new(), &canceled),
        Err(QuarryError::Canceled)
    );
    assert_eq!(mock.total_count(), 0);
}
