//! Announcement Repository
//!
//! 阅读回执和活动报名是并发写入的热点：
//! - 阅读回执用单条 SQL 原子追加
//! - 活动报名用 updated_at 做乐观锁，调用方冲突时重试

use super::{RepoError, RepoResult, merge_counts};
use shared::models::{Announcement, AnnouncementCategory, AnnouncementStats, Priority};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, title, content, category, priority, target_audience, target_rooms, \
                       target_floors, attachments, event_details, is_active, expires_at, read_by, \
                       views, is_pinned, tags, created_by, created_at, updated_at";

/// Board filters; audience targeting is evaluated on the loaded rows
#[derive(Debug, Clone, Default)]
pub struct AnnouncementFilter {
    pub category: Option<AnnouncementCategory>,
    pub priority: Option<Priority>,
}

pub async fn insert(pool: &SqlitePool, a: &Announcement) -> RepoResult<()> {
    sqlx::query(&format!(
        "INSERT INTO announcements ({COLUMNS}) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(a.id)
    .bind(&a.title)
    .bind(&a.content)
    .bind(a.category)
    .bind(a.priority)
    .bind(a.target_audience)
    .bind(sqlx::types::Json(&a.target_rooms))
    .bind(sqlx::types::Json(&a.target_floors))
    .bind(sqlx::types::Json(&a.attachments))
    .bind(sqlx::types::Json(&a.event_details))
    .bind(a.is_active)
    .bind(a.expires_at)
    .bind(sqlx::types::Json(&a.read_by))
    .bind(a.views)
    .bind(a.is_pinned)
    .bind(sqlx::types::Json(&a.tags))
    .bind(a.created_by)
    .bind(a.created_at)
    .bind(a.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Announcement>> {
    let a = sqlx::query_as::<_, Announcement>(&format!(
        "SELECT {COLUMNS} FROM announcements WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(a)
}

/// Persist editor-owned fields (content, targeting, pin, active flag).
///
/// Read receipts and registrations are left untouched.
pub async fn save(pool: &SqlitePool, a: &Announcement) -> RepoResult<()> {
    let rows = sqlx::query(
        "UPDATE announcements SET title = ?, content = ?, priority = ?, target_audience = ?, \
         target_rooms = ?, target_floors = ?, attachments = ?, is_active = ?, expires_at = ?, \
         is_pinned = ?, tags = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&a.title)
    .bind(&a.content)
    .bind(a.priority)
    .bind(a.target_audience)
    .bind(sqlx::types::Json(&a.target_rooms))
    .bind(sqlx::types::Json(&a.target_floors))
    .bind(sqlx::types::Json(&a.attachments))
    .bind(a.is_active)
    .bind(a.expires_at)
    .bind(a.is_pinned)
    .bind(sqlx::types::Json(&a.tags))
    .bind(a.updated_at)
    .bind(a.id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Announcement {} not found", a.id)));
    }
    Ok(())
}

/// Append a read receipt and bump `views`, once per reader.
///
/// Returns false when the user had already read it.
pub async fn mark_read(pool: &SqlitePool, id: i64, user_id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE announcements \
         SET read_by = json_insert(read_by, '$[#]', json_object('user_id', ?1, 'read_at', ?2)), \
             views = views + 1 \
         WHERE id = ?3 AND NOT EXISTS ( \
             SELECT 1 FROM json_each(announcements.read_by) \
             WHERE json_extract(json_each.value, '$.user_id') = ?1)",
    )
    .bind(user_id)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Compare-and-swap write of the event registrations.
///
/// Succeeds only if the row still carries `expected_updated_at`; false means
/// somebody else registered in between and the caller should reload.
pub async fn save_event_details(
    pool: &SqlitePool,
    a: &Announcement,
    expected_updated_at: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE announcements SET event_details = ?, updated_at = ? WHERE id = ? AND updated_at = ?",
    )
    .bind(sqlx::types::Json(&a.event_details))
    .bind(a.updated_at)
    .bind(a.id)
    .bind(expected_updated_at)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Active, unexpired announcements; pinned first, then newest
pub async fn list_active(
    pool: &SqlitePool,
    filter: &AnnouncementFilter,
    now: i64,
) -> RepoResult<Vec<Announcement>> {
    let rows = sqlx::query_as::<_, Announcement>(&format!(
        "SELECT {COLUMNS} FROM announcements \
         WHERE is_active = 1 AND expires_at > ?1 \
         AND (?2 IS NULL OR category = ?2) AND (?3 IS NULL OR priority = ?3) \
         ORDER BY is_pinned DESC, created_at DESC, id DESC"
    ))
    .bind(now)
    .bind(filter.category)
    .bind(filter.priority)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn stats(pool: &SqlitePool, now: i64) -> RepoResult<AnnouncementStats> {
    let mut stats = AnnouncementStats::zeroed();

    let by_category: Vec<(String, i64)> =
        sqlx::query_as("SELECT category, COUNT(*) FROM announcements GROUP BY category")
            .fetch_all(pool)
            .await?;
    stats.total = by_category.iter().map(|(_, n)| n).sum();
    merge_counts(&mut stats.by_category, by_category);

    let (active, pinned, views): (i64, i64, Option<i64>) = sqlx::query_as(
        "SELECT \
           COALESCE(SUM(CASE WHEN is_active = 1 AND expires_at > ?1 THEN 1 ELSE 0 END), 0), \
           COALESCE(SUM(CASE WHEN is_active = 1 AND expires_at > ?1 AND is_pinned = 1 THEN 1 ELSE 0 END), 0), \
           SUM(views) \
         FROM announcements",
    )
    .bind(now)
    .fetch_one(pool)
    .await?;
    stats.active = active;
    stats.pinned = pinned;
    stats.total_views = views.unwrap_or(0);

    stats.upcoming_events = sqlx::query_scalar(
        "SELECT COUNT(*) FROM announcements WHERE category = 'event' AND is_active = 1 \
         AND event_details != 'null' AND json_extract(event_details, '$.start_date') > ?",
    )
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}
