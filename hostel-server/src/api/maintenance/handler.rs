//! Maintenance Request API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::PaginatedResponse;
use shared::message::NotificationPayload;
use shared::models::{
    MaintenanceAssign, MaintenanceCancel, MaintenanceCategory, MaintenanceCostUpdate,
    MaintenanceCreate, MaintenanceRatingInput, MaintenanceRequest, MaintenanceStats,
    MaintenanceStatus, MaintenanceStatusUpdate, Priority,
};
use shared::util::{now_millis, snowflake_id};

use crate::api::ensure_staff_member;
use crate::auth::{Capability, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::maintenance::{self, MaintenanceFilter};
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, PaginationParams, validate_payload};

const RESOURCE: &str = "maintenance";

#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceListQuery {
    pub status: Option<MaintenanceStatus>,
    pub category: Option<MaintenanceCategory>,
    pub priority: Option<Priority>,
    /// 仅管理端生效
    pub assigned_to: Option<i64>,
}

async fn load(state: &ServerState, id: i64) -> AppResult<MaintenanceRequest> {
    maintenance::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MaintenanceNotFound))
}

async fn commit(
    state: &ServerState,
    current_user: &CurrentUser,
    request: &MaintenanceRequest,
    action: &str,
) -> AppResult<()> {
    maintenance::save(&state.pool, request).await?;
    state
        .broadcast_sync(RESOURCE, action, &request.id.to_string(), Some(request))
        .await;

    if request.requested_by != current_user.id {
        state.notify(
            request.requested_by,
            NotificationPayload::new(
                request.title.clone(),
                format!("Your maintenance request is now {}", request.status.as_str()),
            )
            .with_reference(request.id.to_string()),
        );
    }
    Ok(())
}

/// POST /api/maintenance - 报修
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<MaintenanceCreate>,
) -> AppResult<Json<ApiResponse<MaintenanceRequest>>> {
    validate_payload(&payload)?;

    let request = MaintenanceRequest::new(snowflake_id(), payload, current_user.id, now_millis());
    maintenance::insert(&state.pool, &request).await?;

    if request.is_emergency {
        tracing::warn!(
            request_id = request.id,
            room = %request.location.room_number,
            "Emergency maintenance request raised"
        );
    } else {
        tracing::info!(
            request_id = request.id,
            category = ?request.category,
            "Maintenance request created"
        );
    }

    state
        .broadcast_sync(RESOURCE, "created", &request.id.to_string(), Some(&request))
        .await;
    Ok(Json(ApiResponse::success(request)))
}

/// GET /api/maintenance - 自己的报修；maintenance:manage 可查看全部
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Query(query): Query<MaintenanceListQuery>,
    Query(p): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<MaintenanceRequest>>>> {
    let manager = current_user.has(Capability::MaintenanceManage);
    let filter = MaintenanceFilter {
        requested_by: (!manager).then_some(current_user.id),
        assigned_to: query.assigned_to.filter(|_| manager),
        status: query.status,
        category: query.category,
        priority: query.priority,
    };

    let (requests, total) = maintenance::list(&state.pool, &filter, p.offset(), p.limit()).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        requests,
        total,
        p.page(),
        p.limit(),
    ))))
}

/// GET /api/maintenance/stats
pub async fn stats(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<MaintenanceStats>>> {
    current_user.require(Capability::StatsView)?;
    let stats = maintenance::stats(&state.pool).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/maintenance/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<MaintenanceRequest>>> {
    let request = load(&state, id).await?;
    current_user.require_owner_or(request.requested_by, Capability::MaintenanceManage)?;
    Ok(Json(ApiResponse::success(request)))
}

/// PUT /api/maintenance/{id}/status
pub async fn update_status(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<MaintenanceStatusUpdate>,
) -> AppResult<Json<ApiResponse<MaintenanceRequest>>> {
    current_user.require(Capability::MaintenanceManage)?;
    validate_payload(&payload)?;

    let mut request = load(&state, id).await?;
    request.update_status(payload.status, current_user.id, payload.notes, now_millis())?;
    commit(&state, &current_user, &request, "status_updated").await?;

    tracing::info!(
        request_id = id,
        status = request.status.as_str(),
        by = current_user.id,
        "Maintenance status updated"
    );
    Ok(Json(ApiResponse::success(request)))
}

/// PUT /api/maintenance/{id}/assign - 指派维修人员 (pending 自动确认)
pub async fn assign(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<MaintenanceAssign>,
) -> AppResult<Json<ApiResponse<MaintenanceRequest>>> {
    current_user.require(Capability::MaintenanceManage)?;
    ensure_staff_member(&state, payload.assigned_to).await?;

    let mut request = load(&state, id).await?;
    request.assign(
        payload.assigned_to,
        payload.expected_completion_date,
        current_user.id,
        now_millis(),
    )?;
    commit(&state, &current_user, &request, "assigned").await?;

    state.notify(
        payload.assigned_to,
        NotificationPayload::new(request.title.clone(), "A maintenance request was assigned to you")
            .with_reference(request.id.to_string()),
    );
    Ok(Json(ApiResponse::success(request)))
}

/// PUT /api/maintenance/{id}/cost
pub async fn update_cost(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<MaintenanceCostUpdate>,
) -> AppResult<Json<ApiResponse<MaintenanceRequest>>> {
    current_user.require(Capability::MaintenanceManage)?;
    validate_payload(&payload)?;

    let mut request = load(&state, id).await?;
    request.update_costs(payload, now_millis());
    maintenance::save(&state.pool, &request).await?;
    state
        .broadcast_sync(RESOURCE, "updated", &id.to_string(), Some(&request))
        .await;
    Ok(Json(ApiResponse::success(request)))
}

/// POST /api/maintenance/{id}/rating - 报修人评分 (完成后)
pub async fn rate(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<MaintenanceRatingInput>,
) -> AppResult<Json<ApiResponse<MaintenanceRequest>>> {
    validate_payload(&payload)?;

    let mut request = load(&state, id).await?;
    current_user.require_owner(request.requested_by)?;
    request.submit_rating(payload, now_millis())?;
    commit(&state, &current_user, &request, "rated").await?;
    Ok(Json(ApiResponse::success(request)))
}

/// POST /api/maintenance/{id}/cancel - 报修人撤回 (仅 pending)
pub async fn cancel(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    payload: Option<Json<MaintenanceCancel>>,
) -> AppResult<Json<ApiResponse<MaintenanceRequest>>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    validate_payload(&payload)?;

    let mut request = load(&state, id).await?;
    current_user.require_owner(request.requested_by)?;
    request.cancel_by_requester(current_user.id, payload.reason, now_millis())?;
    commit(&state, &current_user, &request, "cancelled").await?;
    Ok(Json(ApiResponse::success(request)))
}
