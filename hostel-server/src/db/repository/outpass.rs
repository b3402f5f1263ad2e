//! Outpass Request Repository

use super::{RepoResult, merge_counts};
use chrono::{NaiveDate, NaiveDateTime};
use shared::models::{OutpassRequest, OutpassStats, OutpassStatus, OutpassType};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, reason, outpass_type, out_date, out_time, in_date, in_time, duration, \
                       destination, contact_number, emergency_contact, transport_mode, parent_approval, \
                       status, reviewed_by, reviewed_at, review_notes, actual_out_time, actual_in_time, \
                       checked_out_by, checked_in_by, status_history, documents, rules_acknowledged, \
                       requested_by, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct OutpassFilter {
    pub requested_by: Option<i64>,
    pub status: Option<OutpassStatus>,
    pub outpass_type: Option<OutpassType>,
    /// Departure on or after this date
    pub out_from: Option<NaiveDate>,
    /// Departure on or before this date
    pub out_to: Option<NaiveDate>,
}

const FILTER: &str = "(?1 IS NULL OR requested_by = ?1) \
    AND (?2 IS NULL OR status = ?2) \
    AND (?3 IS NULL OR outpass_type = ?3) \
    AND (?4 IS NULL OR out_date >= ?4) \
    AND (?5 IS NULL OR out_date <= ?5)";

pub async fn insert(pool: &SqlitePool, request: &OutpassRequest) -> RepoResult<()> {
    sqlx::query(&format!(
        "INSERT INTO outpass_requests ({COLUMNS}) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(request.id)
    .bind(&request.reason)
    .bind(request.outpass_type)
    .bind(request.out_date)
    .bind(&request.out_time)
    .bind(request.in_date)
    .bind(&request.in_time)
    .bind(sqlx::types::Json(&request.duration))
    .bind(&request.destination)
    .bind(&request.contact_number)
    .bind(sqlx::types::Json(&request.emergency_contact))
    .bind(request.transport_mode)
    .bind(sqlx::types::Json(&request.parent_approval))
    .bind(request.status)
    .bind(request.reviewed_by)
    .bind(request.reviewed_at)
    .bind(&request.review_notes)
    .bind(request.actual_out_time)
    .bind(request.actual_in_time)
    .bind(request.checked_out_by)
    .bind(request.checked_in_by)
    .bind(sqlx::types::Json(&request.status_history))
    .bind(sqlx::types::Json(&request.documents))
    .bind(request.rules_acknowledged)
    .bind(request.requested_by)
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<OutpassRequest>> {
    let request = sqlx::query_as::<_, OutpassRequest>(&format!(
        "SELECT {COLUMNS} FROM outpass_requests WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(request)
}

/// Compare-and-swap write of the lifecycle fields; duration is recomputed first.
///
/// 只有行上的 `updated_at` 仍等于 `expected_updated_at` 才写入。返回 false 表示
/// 其间有人改过 (门卫签入 vs 逾期巡检)，调用方需要重新加载。
pub async fn save(
    pool: &SqlitePool,
    request: &mut OutpassRequest,
    expected_updated_at: i64,
) -> RepoResult<bool> {
    request.recompute_duration();
    // updated_at 必须严格递增，否则同一毫秒内的两次写无法区分
    request.updated_at = request.updated_at.max(expected_updated_at + 1);
    let rows = sqlx::query(
        "UPDATE outpass_requests SET duration = ?, parent_approval = ?, status = ?, reviewed_by = ?, \
         reviewed_at = ?, review_notes = ?, actual_out_time = ?, actual_in_time = ?, \
         checked_out_by = ?, checked_in_by = ?, status_history = ?, updated_at = ? \
         WHERE id = ? AND updated_at = ?",
    )
    .bind(sqlx::types::Json(&request.duration))
    .bind(sqlx::types::Json(&request.parent_approval))
    .bind(request.status)
    .bind(request.reviewed_by)
    .bind(request.reviewed_at)
    .bind(&request.review_notes)
    .bind(request.actual_out_time)
    .bind(request.actual_in_time)
    .bind(request.checked_out_by)
    .bind(request.checked_in_by)
    .bind(sqlx::types::Json(&request.status_history))
    .bind(request.updated_at)
    .bind(request.id)
    .bind(expected_updated_at)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() == 1)
}

pub async fn list(
    pool: &SqlitePool,
    filter: &OutpassFilter,
    offset: u32,
    limit: u32,
) -> RepoResult<(Vec<OutpassRequest>, u64)> {
    let requests = sqlx::query_as::<_, OutpassRequest>(&format!(
        "SELECT {COLUMNS} FROM outpass_requests WHERE {FILTER} \
         ORDER BY created_at DESC, id DESC LIMIT ?6 OFFSET ?7"
    ))
    .bind(filter.requested_by)
    .bind(filter.status)
    .bind(filter.outpass_type)
    .bind(filter.out_from)
    .bind(filter.out_to)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM outpass_requests WHERE {FILTER}"
    ))
    .bind(filter.requested_by)
    .bind(filter.status)
    .bind(filter.outpass_type)
    .bind(filter.out_from)
    .bind(filter.out_to)
    .fetch_one(pool)
    .await?;

    Ok((requests, total as u64))
}

/// Every outpass currently in `checked_out` (overdue sweep input)
pub async fn find_checked_out(pool: &SqlitePool) -> RepoResult<Vec<OutpassRequest>> {
    let requests = sqlx::query_as::<_, OutpassRequest>(&format!(
        "SELECT {COLUMNS} FROM outpass_requests WHERE status = 'checked_out' ORDER BY in_date, in_time"
    ))
    .fetch_all(pool)
    .await?;
    Ok(requests)
}

/// Outpass aggregates; `overdue_now` evaluates the overdue predicate at `now_local`
/// so it also counts checked-out passes the sweep has not reached yet.
pub async fn stats(pool: &SqlitePool, now_local: NaiveDateTime) -> RepoResult<OutpassStats> {
    let mut stats = OutpassStats::zeroed();

    let by_status: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM outpass_requests GROUP BY status")
            .fetch_all(pool)
            .await?;
    merge_counts(&mut stats.by_status, by_status);

    let by_type: Vec<(String, i64)> =
        sqlx::query_as("SELECT outpass_type, COUNT(*) FROM outpass_requests GROUP BY outpass_type")
            .fetch_all(pool)
            .await?;
    merge_counts(&mut stats.by_type, by_type);

    stats.total_requests = stats.by_status.values().sum();
    let count = |status: OutpassStatus| stats.by_status.get(status.as_str()).copied().unwrap_or(0);
    stats.currently_out = OutpassStatus::ALL
        .into_iter()
        .filter(|s| s.is_out())
        .map(count)
        .sum();
    let overdue = count(OutpassStatus::Overdue);

    let pending_overdue = find_checked_out(pool)
        .await?
        .iter()
        .filter(|r| r.is_overdue_at(now_local))
        .count() as i64;
    stats.overdue_now = overdue + pending_overdue;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{EmergencyContact, OutpassCreate, TransportMode};

    use crate::db::repository::test_support::pool;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn create(
        id: i64,
        student: i64,
        outpass_type: OutpassType,
        out_day: u32,
        in_day: u32,
    ) -> OutpassRequest {
        OutpassRequest::new(
            id,
            OutpassCreate {
                reason: "Visiting family".into(),
                outpass_type,
                out_date: date(out_day),
                out_time: "09:00".into(),
                in_date: date(in_day),
                in_time: "18:30".into(),
                destination: "Pune".into(),
                contact_number: "9876543210".into(),
                emergency_contact: EmergencyContact {
                    name: "Parent".into(),
                    phone: "9876543211".into(),
                    relation: "father".into(),
                },
                transport_mode: TransportMode::Train,
                parent_approval_required: None,
                documents: vec![],
                rules_acknowledged: true,
            },
            student,
            id,
        )
        .unwrap()
    }

    fn check_out(request: &mut OutpassRequest) {
        request.review(true, 2, None, 10).unwrap();
        request.check_out(3, Some("Main gate".into()), 20).unwrap();
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_dates_and_duration() {
        let pool = pool().await;
        let mut request = create(1, 10, OutpassType::Home, 1, 3);
        insert(&pool, &request).await.unwrap();

        let stored = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(stored.out_date, date(1));
        assert_eq!(stored.in_time, "18:30");
        assert_eq!(stored.duration.days, 2);
        assert_eq!(stored.duration.hours, 9);
        assert!(stored.parent_approval.is_required);

        let expected = request.updated_at;
        check_out(&mut request);
        assert!(save(&pool, &mut request, expected).await.unwrap());
        let stored = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(stored.status, OutpassStatus::CheckedOut);
        assert_eq!(stored.checked_out_by, Some(3));
        assert_eq!(
            stored.status_history.last().unwrap().location.as_deref(),
            Some("Main gate")
        );
    }

    #[tokio::test]
    async fn test_list_filters() {
        let pool = pool().await;
        insert(&pool, &create(1, 10, OutpassType::Home, 1, 3)).await.unwrap();
        insert(&pool, &create(2, 10, OutpassType::Local, 5, 5)).await.unwrap();
        insert(&pool, &create(3, 11, OutpassType::Local, 8, 9)).await.unwrap();

        let own = OutpassFilter {
            requested_by: Some(10),
            ..Default::default()
        };
        let (rows, total) = list(&pool, &own, 0, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].id, 2);

        let local = OutpassFilter {
            outpass_type: Some(OutpassType::Local),
            ..Default::default()
        };
        assert_eq!(list(&pool, &local, 0, 10).await.unwrap().1, 2);

        let window = OutpassFilter {
            out_from: Some(date(2)),
            out_to: Some(date(6)),
            ..Default::default()
        };
        let (rows, _) = list(&pool, &window, 0, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 2);
    }

    #[tokio::test]
    async fn test_checked_out_and_stats() {
        let pool = pool().await;
        let mut late = create(1, 10, OutpassType::Home, 1, 3);
        check_out(&mut late);
        insert(&pool, &late).await.unwrap();
        let mut on_time = create(2, 11, OutpassType::Local, 5, 5);
        check_out(&mut on_time);
        insert(&pool, &on_time).await.unwrap();
        insert(&pool, &create(3, 12, OutpassType::Medical, 4, 4)).await.unwrap();

        assert_eq!(find_checked_out(&pool).await.unwrap().len(), 2);

        let now_local = date(4).and_hms_opt(12, 0, 0).unwrap();
        let stats = stats(&pool, now_local).await.unwrap();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.by_status["checked_out"], 2);
        assert_eq!(stats.by_status["pending"], 1);
        assert_eq!(stats.by_status["returned"], 0);
        assert_eq!(stats.by_type["medical"], 1);
        assert_eq!(stats.by_type["emergency"], 0);
        assert_eq!(stats.currently_out, 2);
        assert_eq!(stats.overdue_now, 1);
    }

    #[tokio::test]
    async fn test_stale_copy_cannot_overwrite_check_in() {
        let pool = pool().await;
        let mut request = create(1, 10, OutpassType::Home, 1, 3);
        check_out(&mut request);
        insert(&pool, &request).await.unwrap();

        // 巡检先读到 checked_out 的副本
        let mut stale = find_checked_out(&pool).await.unwrap().remove(0);
        let stale_expected = stale.updated_at;

        // 门卫在此期间签入
        let mut fresh = find_by_id(&pool, 1).await.unwrap().unwrap();
        let expected = fresh.updated_at;
        fresh.check_in(4, Some("Main gate".into()), 30).unwrap();
        assert!(save(&pool, &mut fresh, expected).await.unwrap());

        // 巡检用旧副本判定逾期并写回，必须失败
        let late = date(5).and_hms_opt(9, 0, 0).unwrap();
        assert!(stale.check_overdue_status(late, 0, 40).unwrap());
        assert!(!save(&pool, &mut stale, stale_expected).await.unwrap());

        let stored = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(stored.status, OutpassStatus::Returned);
        assert_eq!(stored.checked_in_by, Some(4));
        assert!(stored.actual_in_time.is_some());
        assert_eq!(stored.status_history.last().unwrap().status, OutpassStatus::Returned);
    }
}
