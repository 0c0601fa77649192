//! Entities and helpers shared by the integration tests

#![allow(dead_code)]

use quarry::{Entity, MockExecutor, Record, Repository};

#[derive(Debug, Clone, PartialEq, Entity)]
#[table_name = "users"]
#[unique_group = "tenant_id,username"]
pub struct User {
    #[primary_key]
    pub id: i64,
    #[unique]
    pub email: String,
    pub tenant_id: i64,
    pub username: String,
    #[soft_delete]
    pub deleted_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Entity)]
#[table_name = "products"]
#[relations = "reviews"]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

pub fn user(id: i64, email: &str) -> User {
    User {
        id,
        email: email.to_string(),
        tenant_id: 1,
        username: format!("user{}", id),
        deleted_at: None,
    }
}

pub fn user_row(id: i64, email: &str) -> Record {
    quarry::Fields::to_record(&user(id, email))
}

pub fn product_row(id: i64, name: &str) -> Record {
    Record::new()
        .with("id", id)
        .with("name", name)
        .with("price", 9.5)
        .with("stock", 3)
}

pub fn count_row(n: i64) -> Vec<Record> {
    vec![Record::new().with("count", n)]
}

pub fn users(mock: &MockExecutor) -> Repository<User, &MockExecutor> {
    Repository::new(mock)
}

pub fn products(mock: &MockExecutor) -> Repository<Product, &MockExecutor> {
    Repository::new(mock)
}
