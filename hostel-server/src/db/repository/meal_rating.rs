//! Meal Rating Repository

use super::{RepoError, RepoResult};
use shared::models::{MealRating, MealRatingStats};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, user_id, menu_id, rating, taste, quality, quantity, feedback, improvements, \
                       would_recommend, is_anonymous, created_at, updated_at";

pub async fn find_by_user_and_menu(
    pool: &SqlitePool,
    user_id: i64,
    menu_id: i64,
) -> RepoResult<Option<MealRating>> {
    let rating = sqlx::query_as::<_, MealRating>(&format!(
        "SELECT {COLUMNS} FROM meal_ratings WHERE user_id = ? AND menu_id = ?"
    ))
    .bind(user_id)
    .bind(menu_id)
    .fetch_optional(pool)
    .await?;
    Ok(rating)
}

/// Insert or overwrite the caller's rating for a menu.
///
/// On conflict the existing row keeps its id and created_at.
pub async fn upsert(pool: &SqlitePool, rating: &MealRating) -> RepoResult<MealRating> {
    sqlx::query(&format!(
        "INSERT INTO meal_ratings ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(user_id, menu_id) DO UPDATE SET \
           rating = excluded.rating, taste = excluded.taste, quality = excluded.quality, \
           quantity = excluded.quantity, feedback = excluded.feedback, \
           improvements = excluded.improvements, would_recommend = excluded.would_recommend, \
           is_anonymous = excluded.is_anonymous, updated_at = excluded.updated_at"
    ))
    .bind(rating.id)
    .bind(rating.user_id)
    .bind(rating.menu_id)
    .bind(rating.rating)
    .bind(rating.taste)
    .bind(rating.quality)
    .bind(rating.quantity)
    .bind(&rating.feedback)
    .bind(sqlx::types::Json(&rating.improvements))
    .bind(rating.would_recommend)
    .bind(rating.is_anonymous)
    .bind(rating.created_at)
    .bind(rating.updated_at)
    .execute(pool)
    .await?;

    find_by_user_and_menu(pool, rating.user_id, rating.menu_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to store meal rating".into()))
}

/// Newest first
pub async fn list_by_menu(
    pool: &SqlitePool,
    menu_id: i64,
    offset: u32,
    limit: u32,
) -> RepoResult<(Vec<MealRating>, u64)> {
    let ratings = sqlx::query_as::<_, MealRating>(&format!(
        "SELECT {COLUMNS} FROM meal_ratings WHERE menu_id = ? \
         ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?"
    ))
    .bind(menu_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meal_ratings WHERE menu_id = ?")
        .bind(menu_id)
        .fetch_one(pool)
        .await?;

    Ok((ratings, total as u64))
}

/// Rating aggregates for one menu, or across all menus
pub async fn stats(pool: &SqlitePool, menu_id: Option<i64>) -> RepoResult<MealRatingStats> {
    let ratings = sqlx::query_as::<_, MealRating>(&format!(
        "SELECT {COLUMNS} FROM meal_ratings WHERE (?1 IS NULL OR menu_id = ?1)"
    ))
    .bind(menu_id)
    .fetch_all(pool)
    .await?;
    Ok(MealRatingStats::from_ratings(menu_id, &ratings))
}
