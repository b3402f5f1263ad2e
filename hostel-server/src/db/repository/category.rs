//! Menu Category Repository

use super::{RepoError, RepoResult};
use shared::models::{MenuCategory, MenuCategoryCreate, MenuCategoryUpdate};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, name, description, sort_order, is_active, created_at, updated_at";

/// Active categories ordered by sort_order (all of them with `include_inactive`)
pub async fn find_all(pool: &SqlitePool, include_inactive: bool) -> RepoResult<Vec<MenuCategory>> {
    let categories = sqlx::query_as::<_, MenuCategory>(&format!(
        "SELECT {COLUMNS} FROM menu_categories WHERE (?1 OR is_active = 1) ORDER BY sort_order, name"
    ))
    .bind(include_inactive)
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<MenuCategory>> {
    let category = sqlx::query_as::<_, MenuCategory>(&format!(
        "SELECT {COLUMNS} FROM menu_categories WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(category)
}

pub async fn find_active_by_name(
    pool: &SqlitePool,
    name: &str,
) -> RepoResult<Option<MenuCategory>> {
    let category = sqlx::query_as::<_, MenuCategory>(&format!(
        "SELECT {COLUMNS} FROM menu_categories WHERE name = ? AND is_active = 1 LIMIT 1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(category)
}

pub async fn create(
    pool: &SqlitePool,
    id: i64,
    data: MenuCategoryCreate,
    now: i64,
) -> RepoResult<MenuCategory> {
    if find_active_by_name(pool, &data.name).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Category '{}' already exists",
            data.name
        )));
    }

    sqlx::query(
        "INSERT INTO menu_categories (id, name, description, sort_order, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.sort_order.unwrap_or(0))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create category".into()))
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: MenuCategoryUpdate,
    now: i64,
) -> RepoResult<MenuCategory> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Category {id} not found")))?;

    // Check duplicate name if changing
    if let Some(ref new_name) = data.name
        && new_name != &existing.name
        && find_active_by_name(pool, new_name).await?.is_some()
    {
        return Err(RepoError::Duplicate(format!(
            "Category '{new_name}' already exists"
        )));
    }

    sqlx::query(
        "UPDATE menu_categories SET name = COALESCE(?1, name), description = COALESCE(?2, description), \
         sort_order = COALESCE(?3, sort_order), is_active = COALESCE(?4, is_active), updated_at = ?5 WHERE id = ?6",
    )
    .bind(data.name)
    .bind(data.description)
    .bind(data.sort_order)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Category {id} not found")))
}

/// Number of active menu items in a category
pub async fn count_active_items(pool: &SqlitePool, id: i64) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM menu_items WHERE category_id = ? AND is_active = 1",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Soft delete; the caller checks [`count_active_items`] first
pub async fn soft_delete(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE menu_categories SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::pool;

    fn dto(name: &str, sort_order: i32) -> MenuCategoryCreate {
        MenuCategoryCreate {
            name: name.into(),
            description: None,
            sort_order: Some(sort_order),
        }
    }

    #[tokio::test]
    async fn test_create_list_and_duplicate() {
        let pool = pool().await;
        create(&pool, 1, dto("Snacks", 2), 1).await.unwrap();
        create(&pool, 2, dto("Beverages", 1), 1).await.unwrap();

        let all = find_all(&pool, false).await.unwrap();
        assert_eq!(all[0].name, "Beverages");

        let err = create(&pool, 3, dto("Snacks", 3), 1).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_rename_conflict_and_soft_delete_frees_name() {
        let pool = pool().await;
        create(&pool, 1, dto("Rolls", 0), 1).await.unwrap();
        create(&pool, 2, dto("Wraps", 0), 1).await.unwrap();

        let err = update(
            &pool,
            2,
            MenuCategoryUpdate {
                name: Some("Rolls".into()),
                ..Default::default()
            },
            2,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));

        assert!(soft_delete(&pool, 1, 3).await.unwrap());
        assert!(!soft_delete(&pool, 1, 4).await.unwrap());
        assert_eq!(find_all(&pool, false).await.unwrap().len(), 1);
        assert_eq!(find_all(&pool, true).await.unwrap().len(), 2);

        // name of a deleted category can be reused
        create(&pool, 3, dto("Rolls", 0), 5).await.unwrap();
    }
}
