//! User Repository

use super::{RepoError, RepoResult};
use shared::models::{Role, User, UserCreate};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, name, email, role, room_number, floor, hostel_block, phone, is_active, created_at, updated_at";

/// User row together with its password hash (login only)
#[derive(Debug, sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_credentials(
    pool: &SqlitePool,
    email: &str,
) -> RepoResult<Option<UserCredentials>> {
    let row = sqlx::query_as::<_, UserCredentials>(&format!(
        "SELECT {COLUMNS}, password_hash FROM users WHERE email = ? LIMIT 1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert a user; `data.email` must already be normalized
pub async fn create(
    pool: &SqlitePool,
    id: i64,
    data: &UserCreate,
    password_hash: &str,
    now: i64,
) -> RepoResult<User> {
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, room_number, floor, hostel_block, phone, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.email)
    .bind(password_hash)
    .bind(data.role)
    .bind(&data.room_number)
    .bind(data.floor)
    .bind(&data.hostel_block)
    .bind(&data.phone)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("Email '{}' is already registered", data.email))
        }
        other => other,
    })?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

/// Paginated listing, optionally filtered by role
pub async fn list(
    pool: &SqlitePool,
    role: Option<Role>,
    offset: u32,
    limit: u32,
) -> RepoResult<(Vec<User>, u64)> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE (?1 IS NULL OR role = ?1) \
         ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
    ))
    .bind(role)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE (?1 IS NULL OR role = ?1)")
            .bind(role)
            .fetch_one(pool)
            .await?;

    Ok((users, total as u64))
}

pub async fn set_active(pool: &SqlitePool, id: i64, is_active: bool, now: i64) -> RepoResult<User> {
    let rows = sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(is_active)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("User {id} not found")))
}
