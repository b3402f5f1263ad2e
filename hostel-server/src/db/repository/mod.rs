//! Repository Module
//!
//! Free async functions over `&SqlitePool`, one module per table.
//! Mutations of records with lifecycle rules follow load → shared model
//! method → [`save`](order::save)-style full row update.

pub mod announcement;
pub mod cart;
pub mod category;
pub mod dining_menu;
pub mod maintenance;
pub mod meal_rating;
pub mod menu_item;
pub mod order;
pub mod outpass;
pub mod user;

use std::collections::BTreeMap;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepoError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                RepoError::Validation(db_err.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// `(key, count)` rows → bucket map, keeping zero buckets already present
pub(crate) fn merge_counts(buckets: &mut BTreeMap<String, i64>, rows: Vec<(String, i64)>) {
    for (key, count) in rows {
        *buckets.entry(key).or_insert(0) += count;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;

    use crate::db::DbService;

    pub async fn pool() -> SqlitePool {
        DbService::memory().await.unwrap().pool
    }

    /// Insert a bare user row (carts and ratings reference users)
    pub async fn insert_user(pool: &SqlitePool, id: i64, role: &str) {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, 'x', ?, 1, 0, 0)",
        )
        .bind(id)
        .bind(format!("user{id}"))
        .bind(format!("user{id}@example.com"))
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
    }
}
