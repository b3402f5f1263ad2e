//! Dining Menu Repository

use super::{RepoError, RepoResult};
use shared::models::{DiningMenu, DiningMenuQuery};
use sqlx::SqlitePool;

const COLUMNS: &str =
    "id, date, meal_type, items, start_time, end_time, is_active, created_by, created_at, updated_at";

/// At most one active menu per (date, meal_type)
pub async fn insert(pool: &SqlitePool, menu: &DiningMenu) -> RepoResult<()> {
    sqlx::query(&format!(
        "INSERT INTO dining_menus ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(menu.id)
    .bind(menu.date)
    .bind(menu.meal_type)
    .bind(sqlx::types::Json(&menu.items))
    .bind(&menu.start_time)
    .bind(&menu.end_time)
    .bind(menu.is_active)
    .bind(menu.created_by)
    .bind(menu.created_at)
    .bind(menu.updated_at)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Duplicate(format!(
            "A {} menu for {} already exists",
            menu.meal_type.as_str(),
            menu.date
        )),
        other => other,
    })?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<DiningMenu>> {
    let menu = sqlx::query_as::<_, DiningMenu>(&format!(
        "SELECT {COLUMNS} FROM dining_menus WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(menu)
}

pub async fn save(pool: &SqlitePool, menu: &DiningMenu) -> RepoResult<()> {
    let rows = sqlx::query(
        "UPDATE dining_menus SET items = ?, start_time = ?, end_time = ?, is_active = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(sqlx::types::Json(&menu.items))
    .bind(&menu.start_time)
    .bind(&menu.end_time)
    .bind(menu.is_active)
    .bind(menu.updated_at)
    .bind(menu.id)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        // re-activating over a newer menu for the same slot
        RepoError::Duplicate(_) => RepoError::Duplicate(format!(
            "A {} menu for {} already exists",
            menu.meal_type.as_str(),
            menu.date
        )),
        other => other,
    })?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Menu {} not found", menu.id)));
    }
    Ok(())
}

/// Active menus, in serving order within a day
pub async fn list(pool: &SqlitePool, query: &DiningMenuQuery) -> RepoResult<Vec<DiningMenu>> {
    let menus = sqlx::query_as::<_, DiningMenu>(&format!(
        "SELECT {COLUMNS} FROM dining_menus \
         WHERE is_active = 1 AND (?1 IS NULL OR date = ?1) AND (?2 IS NULL OR meal_type = ?2) \
         ORDER BY date DESC, CASE meal_type \
           WHEN 'breakfast' THEN 0 WHEN 'lunch' THEN 1 WHEN 'snacks' THEN 2 ELSE 3 END"
    ))
    .bind(query.date)
    .bind(query.meal_type)
    .fetch_all(pool)
    .await?;
    Ok(menus)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;
    use shared::models::{DiningMenu, DiningMenuCreate, Dish, MealType};

    pub fn menu(id: i64, day: u32, meal_type: MealType) -> DiningMenu {
        DiningMenu::new(
            id,
            DiningMenuCreate {
                date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
                meal_type,
                items: vec![Dish {
                    name: "Poha".into(),
                    description: None,
                    is_veg: true,
                }],
                start_time: "07:30".into(),
                end_time: "09:30".into(),
            },
            1,
            0,
        )
        .unwrap()
    }
}
