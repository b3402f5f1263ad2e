//! Announcement API Handlers
//!
//! 列表按读者 (角色/房间/楼层) 过滤可见性后再分页。
//! 已读回执与活动报名都是原子写入:
//! - 已读: 单条 UPDATE，同一读者只计一次
//! - 报名: 以 `updated_at` 做 CAS，冲突时重新加载重试

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::PaginatedResponse;
use shared::models::{
    Announcement, AnnouncementCategory, AnnouncementCreate, AnnouncementStats, AnnouncementUpdate,
    AnnouncementView, Audience, PinRequest, Priority, User,
};
use shared::util::{now_millis, snowflake_id};

use crate::auth::{Capability, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::announcement::{self, AnnouncementFilter};
use crate::db::repository::user;
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, PaginationParams, validate_payload};

const RESOURCE: &str = "announcement";

/// CAS 重试次数
const REGISTRATION_ATTEMPTS: usize = 3;

#[derive(Debug, Default, Deserialize)]
pub struct AnnouncementListQuery {
    pub category: Option<AnnouncementCategory>,
    pub priority: Option<Priority>,
}

/// Reader profile used for audience targeting
async fn reader(state: &ServerState, current_user: &CurrentUser) -> AppResult<User> {
    user::find_by_id(&state.pool, current_user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))
}

fn audience<'a>(current_user: &CurrentUser, profile: &'a User) -> Audience<'a> {
    Audience {
        user_id: current_user.id,
        role: current_user.role,
        room_number: profile.room_number.as_deref(),
        floor: profile.floor,
    }
}

async fn load(state: &ServerState, id: i64) -> AppResult<Announcement> {
    announcement::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AnnouncementNotFound))
}

/// Load an announcement the caller may see (managers see everything)
async fn load_visible(
    state: &ServerState,
    current_user: &CurrentUser,
    id: i64,
) -> AppResult<Announcement> {
    let found = load(state, id).await?;
    if current_user.has(Capability::AnnouncementsManage) {
        return Ok(found);
    }
    let profile = reader(state, current_user).await?;
    if found.is_visible_to(&audience(current_user, &profile), now_millis()) {
        Ok(found)
    } else {
        Err(AppError::new(ErrorCode::AnnouncementNotFound))
    }
}

/// POST /api/announcements - 发布公告
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<AnnouncementCreate>,
) -> AppResult<Json<ApiResponse<Announcement>>> {
    current_user.require(Capability::AnnouncementsManage)?;
    validate_payload(&payload)?;

    let created = Announcement::new(snowflake_id(), payload, current_user.id, now_millis())?;
    announcement::insert(&state.pool, &created).await?;

    tracing::info!(
        announcement_id = created.id,
        category = created.category.as_str(),
        audience = ?created.target_audience,
        "Announcement published"
    );

    state
        .broadcast_sync(RESOURCE, "created", &created.id.to_string(), Some(&created))
        .await;
    Ok(Json(ApiResponse::success(created)))
}

/// GET /api/announcements - 当前读者可见的公告 (置顶优先)
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Query(query): Query<AnnouncementListQuery>,
    Query(p): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<AnnouncementView>>>> {
    let now = now_millis();
    let profile = reader(&state, &current_user).await?;
    let audience = audience(&current_user, &profile);

    let filter = AnnouncementFilter {
        category: query.category,
        priority: query.priority,
    };
    let visible: Vec<Announcement> = announcement::list_active(&state.pool, &filter, now)
        .await?
        .into_iter()
        .filter(|a| a.is_visible_to(&audience, now))
        .collect();

    let total = visible.len() as u64;
    let rows = visible
        .into_iter()
        .skip(p.offset() as usize)
        .take(p.limit() as usize)
        .map(|a| AnnouncementView::for_user(a, current_user.id))
        .collect();

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        rows,
        total,
        p.page(),
        p.limit(),
    ))))
}

/// GET /api/announcements/stats
pub async fn stats(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<AnnouncementStats>>> {
    current_user.require(Capability::StatsView)?;
    let stats = announcement::stats(&state.pool, now_millis()).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/announcements/{id} - 查看即记为已读
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<AnnouncementView>>> {
    let mut found = load_visible(&state, &current_user, id).await?;

    let now = now_millis();
    if announcement::mark_read(&state.pool, id, current_user.id, now).await? {
        found.mark_read(current_user.id, now);
    }
    Ok(Json(ApiResponse::success(AnnouncementView::for_user(
        found,
        current_user.id,
    ))))
}

/// POST /api/announcements/{id}/read
pub async fn mark_read(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<AnnouncementView>>> {
    get_by_id(State(state), current_user, Path(id)).await
}

/// PUT /api/announcements/{id}
pub async fn update(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<AnnouncementUpdate>,
) -> AppResult<Json<ApiResponse<Announcement>>> {
    current_user.require(Capability::AnnouncementsManage)?;
    validate_payload(&payload)?;

    let mut found = load(&state, id).await?;
    found.apply_update(payload, now_millis())?;
    announcement::save(&state.pool, &found).await?;

    state
        .broadcast_sync(RESOURCE, "updated", &id.to_string(), Some(&found))
        .await;
    Ok(Json(ApiResponse::success(found)))
}

/// PUT /api/announcements/{id}/pin
pub async fn pin(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<PinRequest>,
) -> AppResult<Json<ApiResponse<Announcement>>> {
    current_user.require(Capability::AnnouncementsManage)?;

    let mut found = load(&state, id).await?;
    found.is_pinned = payload.is_pinned;
    found.updated_at = now_millis();
    announcement::save(&state.pool, &found).await?;

    state
        .broadcast_sync(RESOURCE, "updated", &id.to_string(), Some(&found))
        .await;
    Ok(Json(ApiResponse::success(found)))
}

/// DELETE /api/announcements/{id} - 软删除
pub async fn delete(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(Capability::AnnouncementsManage)?;

    let mut found = load(&state, id).await?;
    found.is_active = false;
    found.updated_at = now_millis();
    announcement::save(&state.pool, &found).await?;

    state
        .broadcast_sync::<()>(RESOURCE, "deleted", &id.to_string(), None)
        .await;
    Ok(Json(ApiResponse::ok()))
}

/// POST /api/announcements/{id}/register - 活动报名
pub async fn register(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<AnnouncementView>>> {
    update_registration(&state, &current_user, id, true).await
}

/// DELETE /api/announcements/{id}/register - 取消报名
pub async fn unregister(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<AnnouncementView>>> {
    update_registration(&state, &current_user, id, false).await
}

async fn update_registration(
    state: &ServerState,
    current_user: &CurrentUser,
    id: i64,
    join: bool,
) -> AppResult<Json<ApiResponse<AnnouncementView>>> {
    for attempt in 1..=REGISTRATION_ATTEMPTS {
        let mut found = load_visible(state, current_user, id).await?;
        let expected = found.updated_at;
        // updated_at 必须严格递增
        let now = now_millis().max(expected + 1);

        if join {
            found.register_for_event(current_user.id, now)?;
        } else {
            found.unregister_from_event(current_user.id, now)?;
        }

        if announcement::save_event_details(&state.pool, &found, expected).await? {
            let action = if join { "registered" } else { "unregistered" };
            state
                .broadcast_sync(RESOURCE, action, &id.to_string(), Some(&found))
                .await;
            return Ok(Json(ApiResponse::success(AnnouncementView::for_user(
                found,
                current_user.id,
            ))));
        }
        tracing::debug!(announcement_id = id, attempt, "Event registration raced, retrying");
    }

    Err(AppError::conflict(
        "Event registration changed concurrently, please retry",
    ))
}
