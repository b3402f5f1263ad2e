//! Menu Item Repository

use super::{RepoError, RepoResult};
use shared::models::{MenuItem, MenuItemCreate};
use sqlx::{SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, name, description, category_id, price, original_price, image, is_veg, \
                       is_available, is_active, stock, order_count, preparation_time_mins, tags, \
                       created_at, updated_at";

/// List filters (inactive items are never listed)
#[derive(Debug, Clone, Default)]
pub struct MenuItemFilter {
    pub category_id: Option<i64>,
    pub is_veg: Option<bool>,
    pub available_only: bool,
    /// Case-insensitive name substring
    pub search: Option<String>,
}

const FILTER: &str = "is_active = 1 \
    AND (?1 IS NULL OR category_id = ?1) \
    AND (?2 IS NULL OR is_veg = ?2) \
    AND (?3 = 0 OR is_available = 1) \
    AND (?4 IS NULL OR name LIKE '%' || ?4 || '%')";

pub async fn find_by_id(
    executor: impl SqliteExecutor<'_>,
    id: i64,
) -> RepoResult<Option<MenuItem>> {
    let item = sqlx::query_as::<_, MenuItem>(&format!(
        "SELECT {COLUMNS} FROM menu_items WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(item)
}

pub async fn list(
    pool: &SqlitePool,
    filter: &MenuItemFilter,
    offset: u32,
    limit: u32,
) -> RepoResult<(Vec<MenuItem>, u64)> {
    let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let items = sqlx::query_as::<_, MenuItem>(&format!(
        "SELECT {COLUMNS} FROM menu_items WHERE {FILTER} \
         ORDER BY order_count DESC, name LIMIT ?5 OFFSET ?6"
    ))
    .bind(filter.category_id)
    .bind(filter.is_veg)
    .bind(filter.available_only)
    .bind(search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM menu_items WHERE {FILTER}"))
        .bind(filter.category_id)
        .bind(filter.is_veg)
        .bind(filter.available_only)
        .bind(search)
        .fetch_one(pool)
        .await?;

    Ok((items, total as u64))
}

pub async fn create(
    pool: &SqlitePool,
    id: i64,
    data: MenuItemCreate,
    now: i64,
) -> RepoResult<MenuItem> {
    sqlx::query(
        "INSERT INTO menu_items (id, name, description, category_id, price, original_price, image, is_veg, \
         is_available, is_active, stock, order_count, preparation_time_mins, tags, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, 0, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.category_id)
    .bind(data.price)
    .bind(data.original_price)
    .bind(&data.image)
    .bind(data.is_veg)
    .bind(data.is_available)
    .bind(data.stock)
    .bind(data.preparation_time_mins)
    .bind(sqlx::types::Json(&data.tags))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create menu item".into()))
}

/// Full row update of the editable fields (counters are left alone)
pub async fn save(pool: &SqlitePool, item: &MenuItem) -> RepoResult<()> {
    let rows = sqlx::query(
        "UPDATE menu_items SET name = ?, description = ?, category_id = ?, price = ?, original_price = ?, \
         image = ?, is_veg = ?, is_available = ?, is_active = ?, stock = ?, preparation_time_mins = ?, \
         tags = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.category_id)
    .bind(item.price)
    .bind(item.original_price)
    .bind(&item.image)
    .bind(item.is_veg)
    .bind(item.is_available)
    .bind(item.is_active)
    .bind(item.stock)
    .bind(item.preparation_time_mins)
    .bind(sqlx::types::Json(&item.tags))
    .bind(item.updated_at)
    .bind(item.id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Menu item {} not found", item.id)));
    }
    Ok(())
}

/// Record a sale: `order_count += qty`, finite stock decremented.
///
/// Guarded by `stock >= qty`; returns false (nothing written) when the
/// item ran out in the meantime.
pub async fn record_sale(
    executor: impl SqliteExecutor<'_>,
    id: i64,
    quantity: i32,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE menu_items SET order_count = order_count + ?1, \
         stock = CASE WHEN stock = -1 THEN -1 ELSE stock - ?1 END, updated_at = ?2 \
         WHERE id = ?3 AND is_active = 1 AND is_available = 1 AND (stock = -1 OR stock >= ?1)",
    )
    .bind(quantity)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() == 1)
}
