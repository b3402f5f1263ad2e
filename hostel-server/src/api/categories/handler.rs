//! Menu Category API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{MenuCategory, MenuCategoryCreate, MenuCategoryUpdate};
use shared::util::{now_millis, snowflake_id};

use crate::auth::{Capability, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::{RepoError, category};
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, validate_payload};

const RESOURCE: &str = "menu_category";

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

fn map_repo_error(err: RepoError) -> AppError {
    match err {
        RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::CategoryNameExists, msg),
        RepoError::NotFound(_) => AppError::new(ErrorCode::CategoryNotFound),
        other => other.into(),
    }
}

/// GET /api/categories - 获取分类 (停用的仅管理端可见)
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Query(query): Query<CategoryListQuery>,
) -> AppResult<Json<ApiResponse<Vec<MenuCategory>>>> {
    let include_inactive = query.include_inactive && current_user.has(Capability::MenuManage);
    let categories = category::find_all(&state.pool, include_inactive).await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// GET /api/categories/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<MenuCategory>>> {
    let found = category::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound))?;
    Ok(Json(ApiResponse::success(found)))
}

/// POST /api/categories - 创建分类
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<MenuCategoryCreate>,
) -> AppResult<Json<ApiResponse<MenuCategory>>> {
    current_user.require(Capability::MenuManage)?;
    validate_payload(&payload)?;

    let created = category::create(&state.pool, snowflake_id(), payload, now_millis())
        .await
        .map_err(map_repo_error)?;

    state
        .broadcast_sync(RESOURCE, "created", &created.id.to_string(), Some(&created))
        .await;
    Ok(Json(ApiResponse::success(created)))
}

/// PUT /api/categories/{id} - 更新分类
pub async fn update(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<MenuCategoryUpdate>,
) -> AppResult<Json<ApiResponse<MenuCategory>>> {
    current_user.require(Capability::MenuManage)?;
    validate_payload(&payload)?;

    let updated = category::update(&state.pool, id, payload, now_millis())
        .await
        .map_err(map_repo_error)?;

    state
        .broadcast_sync(RESOURCE, "updated", &id.to_string(), Some(&updated))
        .await;
    Ok(Json(ApiResponse::success(updated)))
}

/// DELETE /api/categories/{id} - 删除分类 (软删除，仍有在售菜品时拒绝)
pub async fn delete(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(Capability::MenuManage)?;

    let active_items = category::count_active_items(&state.pool, id).await?;
    if active_items > 0 {
        return Err(AppError::new(ErrorCode::CategoryHasItems)
            .with_detail("active_items", active_items));
    }

    if !category::soft_delete(&state.pool, id, now_millis()).await? {
        return Err(AppError::new(ErrorCode::CategoryNotFound));
    }

    state
        .broadcast_sync::<()>(RESOURCE, "deleted", &id.to_string(), None)
        .await;
    Ok(Json(ApiResponse::ok()))
}
