//! Maintenance Request Repository

use super::{RepoError, RepoResult, merge_counts};
use shared::models::{
    MaintenanceCategory, MaintenanceRequest, MaintenanceStats, MaintenanceStatus, Priority,
};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, title, description, category, priority, location, photos, status, \
                       assigned_to, assigned_at, expected_completion_date, actual_completion_date, \
                       resolution_notes, rating, requested_by, is_emergency, estimated_cost, \
                       actual_cost, status_history, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct MaintenanceFilter {
    pub requested_by: Option<i64>,
    pub assigned_to: Option<i64>,
    pub status: Option<MaintenanceStatus>,
    pub category: Option<MaintenanceCategory>,
    pub priority: Option<Priority>,
}

const FILTER: &str = "(?1 IS NULL OR requested_by = ?1) \
    AND (?2 IS NULL OR assigned_to = ?2) \
    AND (?3 IS NULL OR status = ?3) \
    AND (?4 IS NULL OR category = ?4) \
    AND (?5 IS NULL OR priority = ?5)";

pub async fn insert(pool: &SqlitePool, request: &MaintenanceRequest) -> RepoResult<()> {
    sqlx::query(&format!(
        "INSERT INTO maintenance_requests ({COLUMNS}) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(request.id)
    .bind(&request.title)
    .bind(&request.description)
    .bind(request.category)
    .bind(request.priority)
    .bind(sqlx::types::Json(&request.location))
    .bind(sqlx::types::Json(&request.photos))
    .bind(request.status)
    .bind(request.assigned_to)
    .bind(request.assigned_at)
    .bind(request.expected_completion_date)
    .bind(request.actual_completion_date)
    .bind(&request.resolution_notes)
    .bind(sqlx::types::Json(&request.rating))
    .bind(request.requested_by)
    .bind(request.is_emergency)
    .bind(request.estimated_cost)
    .bind(request.actual_cost)
    .bind(sqlx::types::Json(&request.status_history))
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<MaintenanceRequest>> {
    let request = sqlx::query_as::<_, MaintenanceRequest>(&format!(
        "SELECT {COLUMNS} FROM maintenance_requests WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(request)
}

/// Write back everything a lifecycle method may have touched
pub async fn save(pool: &SqlitePool, request: &MaintenanceRequest) -> RepoResult<()> {
    let rows = sqlx::query(
        "UPDATE maintenance_requests SET status = ?, assigned_to = ?, assigned_at = ?, \
         expected_completion_date = ?, actual_completion_date = ?, resolution_notes = ?, rating = ?, \
         estimated_cost = ?, actual_cost = ?, status_history = ?, updated_at = ? WHERE id = ?",
    )
    .bind(request.status)
    .bind(request.assigned_to)
    .bind(request.assigned_at)
    .bind(request.expected_completion_date)
    .bind(request.actual_completion_date)
    .bind(&request.resolution_notes)
    .bind(sqlx::types::Json(&request.rating))
    .bind(request.estimated_cost)
    .bind(request.actual_cost)
    .bind(sqlx::types::Json(&request.status_history))
    .bind(request.updated_at)
    .bind(request.id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Maintenance request {} not found",
            request.id
        )));
    }
    Ok(())
}

/// Emergencies first, then newest
pub async fn list(
    pool: &SqlitePool,
    filter: &MaintenanceFilter,
    offset: u32,
    limit: u32,
) -> RepoResult<(Vec<MaintenanceRequest>, u64)> {
    let requests = sqlx::query_as::<_, MaintenanceRequest>(&format!(
        "SELECT {COLUMNS} FROM maintenance_requests WHERE {FILTER} \
         ORDER BY is_emergency DESC, created_at DESC, id DESC LIMIT ?6 OFFSET ?7"
    ))
    .bind(filter.requested_by)
    .bind(filter.assigned_to)
    .bind(filter.status)
    .bind(filter.category)
    .bind(filter.priority)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM maintenance_requests WHERE {FILTER}"
    ))
    .bind(filter.requested_by)
    .bind(filter.assigned_to)
    .bind(filter.status)
    .bind(filter.category)
    .bind(filter.priority)
    .fetch_one(pool)
    .await?;

    Ok((requests, total as u64))
}

pub async fn stats(pool: &SqlitePool) -> RepoResult<MaintenanceStats> {
    let mut stats = MaintenanceStats::zeroed();

    for (column, target) in [
        ("status", &mut stats.by_status),
        ("category", &mut stats.by_category),
        ("priority", &mut stats.by_priority),
    ] {
        let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT {column}, COUNT(*) FROM maintenance_requests GROUP BY {column}"
        ))
        .fetch_all(pool)
        .await?;
        merge_counts(target, rows);
    }
    stats.total_requests = stats.by_status.values().sum();

    stats.emergency_open = sqlx::query_scalar(
        "SELECT COUNT(*) FROM maintenance_requests \
         WHERE is_emergency = 1 AND status NOT IN ('completed', 'cancelled', 'rejected')",
    )
    .fetch_one(pool)
    .await?;

    let average_rating: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(json_extract(rating, '$.score')) FROM maintenance_requests WHERE rating != 'null'",
    )
    .fetch_one(pool)
    .await?;
    stats.average_rating = average_rating.map(|v| (v * 10.0).round() / 10.0);

    let average_millis: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(actual_completion_date - created_at) FROM maintenance_requests \
         WHERE status = 'completed' AND actual_completion_date IS NOT NULL",
    )
    .fetch_one(pool)
    .await?;
    stats.average_resolution_hours =
        average_millis.map(|ms| (ms / 3_600_000.0 * 10.0).round() / 10.0);

    Ok(stats)
}
