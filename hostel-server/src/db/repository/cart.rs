//! Cart Repository
//!
//! 每个用户最多一行，首次访问时创建。

use super::RepoResult;
use shared::models::Cart;
use shared::util::snowflake_id;
use sqlx::{SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, user_id, items, total_amount, item_count, created_at, updated_at";

pub async fn find_by_user(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
) -> RepoResult<Option<Cart>> {
    let cart = sqlx::query_as::<_, Cart>(&format!("SELECT {COLUMNS} FROM carts WHERE user_id = ?"))
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    Ok(cart)
}

/// Load the user's cart, creating an empty one on first access
pub async fn get_or_create(pool: &SqlitePool, user_id: i64, now: i64) -> RepoResult<Cart> {
    if let Some(cart) = find_by_user(pool, user_id).await? {
        return Ok(cart);
    }

    let cart = Cart::new(snowflake_id(), user_id, now);
    // 并发首次访问：后到者忽略插入，再读一次
    sqlx::query(
        "INSERT INTO carts (id, user_id, items, total_amount, item_count, created_at, updated_at) \
         VALUES (?, ?, '[]', 0, 0, ?, ?) ON CONFLICT(user_id) DO NOTHING",
    )
    .bind(cart.id)
    .bind(user_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(find_by_user(pool, user_id).await?.unwrap_or(cart))
}

/// Persist lines and the recomputed totals
pub async fn save(executor: impl SqliteExecutor<'_>, cart: &Cart) -> RepoResult<()> {
    sqlx::query(
        "UPDATE carts SET items = ?, total_amount = ?, item_count = ?, updated_at = ? WHERE id = ?",
    )
    .bind(sqlx::types::Json(&cart.items))
    .bind(cart.total_amount)
    .bind(cart.item_count)
    .bind(cart.updated_at)
    .bind(cart.id)
    .execute(executor)
    .await?;
    Ok(())
}
