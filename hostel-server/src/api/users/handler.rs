//! User management handlers (admin)

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::PaginatedResponse;
use shared::models::{Role, User, UserCreate};
use shared::util::now_millis;

use crate::api::auth::create_account;
use crate::auth::{Capability, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::{RepoError, user};
use crate::utils::validation::normalize_email;
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, PaginationParams, validate_payload};

const RESOURCE: &str = "user";

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveUpdate {
    pub is_active: bool,
}

/// POST /api/users - 创建任意角色账号
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(mut payload): Json<UserCreate>,
) -> AppResult<Json<ApiResponse<User>>> {
    current_user.require(Capability::UsersManage)?;
    validate_payload(&payload)?;
    payload.email = normalize_email(&payload.email);

    let created = create_account(&state, &payload).await?;
    tracing::info!(
        user_id = created.id,
        role = %created.role,
        created_by = current_user.id,
        "User account created"
    );
    Ok(Json(ApiResponse::success(created)))
}

/// GET /api/users?role=&page=&page_size=
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Query(query): Query<UserListQuery>,
    Query(p): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<User>>>> {
    current_user.require(Capability::UsersManage)?;
    let (users, total) = user::list(&state.pool, query.role, p.offset(), p.limit()).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        users,
        total,
        p.page(),
        p.limit(),
    ))))
}

/// GET /api/users/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<User>>> {
    current_user.require_owner_or(id, Capability::UsersManage)?;
    let found = user::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(Json(ApiResponse::success(found)))
}

/// PUT /api/users/{id}/active - 启用/停用账号
pub async fn set_active(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ActiveUpdate>,
) -> AppResult<Json<ApiResponse<User>>> {
    current_user.require(Capability::UsersManage)?;
    if id == current_user.id && !payload.is_active {
        return Err(AppError::validation("You cannot disable your own account"));
    }

    let updated = user::set_active(&state.pool, id, payload.is_active, now_millis())
        .await
        .map_err(|e| match e {
            RepoError::NotFound(_) => AppError::new(ErrorCode::UserNotFound),
            other => other.into(),
        })?;

    state
        .broadcast_sync(RESOURCE, "updated", &id.to_string(), Some(&updated))
        .await;
    tracing::info!(user_id = id, is_active = payload.is_active, "User active flag changed");
    Ok(Json(ApiResponse::success(updated)))
}
