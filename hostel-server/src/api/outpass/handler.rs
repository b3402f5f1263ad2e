//! Outpass API Handlers
//!
//! 生命周期:
//!
//! ```text
//! pending ─▶ under_review ─▶ approved ─▶ checked_out ─▶ returned
//!    │             │                         │              ▲
//!    │             └─▶ rejected              └─▶ overdue ───┘
//!    └─▶ cancelled (requester)
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::PaginatedResponse;
use shared::message::NotificationPayload;
use shared::models::{
    GateAction, OutpassCreate, OutpassRequest, OutpassReview, OutpassStats, OutpassStatus,
    OutpassType, OverdueCheckResult, ParentApprovalInput,
};
use shared::util::{now_millis, snowflake_id};

use crate::auth::{Capability, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::outpass::{self, OutpassFilter};
use crate::services::run_overdue_check;
use crate::utils::time::local_now;
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, PaginationParams, validate_payload};

const RESOURCE: &str = "outpass";

#[derive(Debug, Default, Deserialize)]
pub struct OutpassListQuery {
    pub status: Option<OutpassStatus>,
    pub outpass_type: Option<OutpassType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

async fn load(state: &ServerState, id: i64) -> AppResult<OutpassRequest> {
    outpass::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OutpassNotFound))
}

/// `expected_updated_at` 是 load 时的版本，与逾期巡检或其他门卫并发时返回冲突
async fn commit(
    state: &ServerState,
    current_user: &CurrentUser,
    request: &mut OutpassRequest,
    expected_updated_at: i64,
    action: &str,
) -> AppResult<()> {
    if !outpass::save(&state.pool, request, expected_updated_at).await? {
        return Err(AppError::conflict(
            "Outpass changed concurrently, please reload and retry",
        ));
    }
    state
        .broadcast_sync(RESOURCE, action, &request.id.to_string(), Some(&*request))
        .await;

    if request.requested_by != current_user.id {
        state.notify(
            request.requested_by,
            NotificationPayload::new(
                format!("Outpass to {}", request.destination),
                format!("Your outpass is now {}", request.status.as_str()),
            )
            .with_reference(request.id.to_string()),
        );
    }
    Ok(())
}

/// POST /api/outpass - 申请出门
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<OutpassCreate>,
) -> AppResult<Json<ApiResponse<OutpassRequest>>> {
    validate_payload(&payload)?;

    let request = OutpassRequest::new(snowflake_id(), payload, current_user.id, now_millis())?;
    outpass::insert(&state.pool, &request).await?;

    tracing::info!(
        outpass_id = request.id,
        requested_by = current_user.id,
        outpass_type = ?request.outpass_type,
        out_date = %request.out_date,
        in_date = %request.in_date,
        "Outpass requested"
    );

    state
        .broadcast_sync(RESOURCE, "created", &request.id.to_string(), Some(&request))
        .await;
    Ok(Json(ApiResponse::success(request)))
}

/// GET /api/outpass - 自己的申请；outpass:review / outpass:gate 可查看全部
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Query(query): Query<OutpassListQuery>,
    Query(p): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<OutpassRequest>>>> {
    let sees_all =
        current_user.has(Capability::OutpassReview) || current_user.has(Capability::OutpassGate);
    let filter = OutpassFilter {
        requested_by: (!sees_all).then_some(current_user.id),
        status: query.status,
        outpass_type: query.outpass_type,
        out_from: query.from,
        out_to: query.to,
    };

    let (requests, total) = outpass::list(&state.pool, &filter, p.offset(), p.limit()).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        requests,
        total,
        p.page(),
        p.limit(),
    ))))
}

/// GET /api/outpass/stats - overdue_now 按当前业务时间实时判定
pub async fn stats(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<OutpassStats>>> {
    current_user.require(Capability::StatsView)?;
    let stats = outpass::stats(&state.pool, local_now(state.config.timezone)).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// POST /api/outpass/check-overdue - 手动触发逾期巡检
pub async fn check_overdue(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<OverdueCheckResult>>> {
    current_user.require(Capability::OutpassReview)?;

    let result = run_overdue_check(&state, current_user.id).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/outpass/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<OutpassRequest>>> {
    let request = load(&state, id).await?;
    if !current_user.has(Capability::OutpassGate) {
        current_user.require_owner_or(request.requested_by, Capability::OutpassReview)?;
    }
    Ok(Json(ApiResponse::success(request)))
}

/// PUT /api/outpass/{id}/under-review
pub async fn mark_under_review(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<OutpassRequest>>> {
    current_user.require(Capability::OutpassReview)?;

    let mut request = load(&state, id).await?;
    let expected = request.updated_at;
    request.mark_under_review(current_user.id, now_millis())?;
    commit(&state, &current_user, &mut request, expected, "status_updated").await?;
    Ok(Json(ApiResponse::success(request)))
}

/// PUT /api/outpass/{id}/review - 批准/驳回
pub async fn review(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<OutpassReview>,
) -> AppResult<Json<ApiResponse<OutpassRequest>>> {
    current_user.require(Capability::OutpassReview)?;
    validate_payload(&payload)?;

    let mut request = load(&state, id).await?;
    let expected = request.updated_at;
    request.review(payload.approve, current_user.id, payload.notes, now_millis())?;
    commit(&state, &current_user, &mut request, expected, "reviewed").await?;

    tracing::info!(
        outpass_id = id,
        approved = payload.approve,
        by = current_user.id,
        "Outpass reviewed"
    );
    Ok(Json(ApiResponse::success(request)))
}

/// PUT /api/outpass/{id}/parent-approval - 记录家长确认结果
pub async fn parent_approval(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ParentApprovalInput>,
) -> AppResult<Json<ApiResponse<OutpassRequest>>> {
    current_user.require(Capability::OutpassReview)?;
    validate_payload(&payload)?;

    let mut request = load(&state, id).await?;
    let expected = request.updated_at;
    request.record_parent_approval(payload, now_millis())?;
    commit(&state, &current_user, &mut request, expected, "updated").await?;
    Ok(Json(ApiResponse::success(request)))
}

/// POST /api/outpass/{id}/checkout - 门卫登记出门
pub async fn check_out(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    payload: Option<Json<GateAction>>,
) -> AppResult<Json<ApiResponse<OutpassRequest>>> {
    current_user.require(Capability::OutpassGate)?;
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    validate_payload(&payload)?;

    let mut request = load(&state, id).await?;
    let expected = request.updated_at;
    request.check_out(current_user.id, payload.location, now_millis())?;
    commit(&state, &current_user, &mut request, expected, "checked_out").await?;
    Ok(Json(ApiResponse::success(request)))
}

/// POST /api/outpass/{id}/checkin - 门卫登记返校 (含逾期返校)
pub async fn check_in(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    payload: Option<Json<GateAction>>,
) -> AppResult<Json<ApiResponse<OutpassRequest>>> {
    current_user.require(Capability::OutpassGate)?;
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    validate_payload(&payload)?;

    let mut request = load(&state, id).await?;
    let expected = request.updated_at;
    let was_overdue = request.status == OutpassStatus::Overdue;
    request.check_in(current_user.id, payload.location, now_millis())?;
    commit(&state, &current_user, &mut request, expected, "checked_in").await?;

    if was_overdue {
        tracing::warn!(
            outpass_id = id,
            requested_by = request.requested_by,
            "Late return recorded"
        );
    }
    Ok(Json(ApiResponse::success(request)))
}

/// POST /api/outpass/{id}/cancel - 申请人撤回 (仅 pending)
pub async fn cancel(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<OutpassRequest>>> {
    let mut request = load(&state, id).await?;
    let expected = request.updated_at;
    current_user.require_owner(request.requested_by)?;
    request.cancel_by_requester(current_user.id, now_millis())?;
    commit(&state, &current_user, &mut request, expected, "cancelled").await?;
    Ok(Json(ApiResponse::success(request)))
}
