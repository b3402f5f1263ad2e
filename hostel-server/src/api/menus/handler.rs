//! Dining Menu API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{DiningMenu, DiningMenuCreate, DiningMenuQuery, DiningMenuUpdate};
use shared::util::{now_millis, snowflake_id};

use crate::auth::{Capability, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::{RepoError, dining_menu};
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, validate_payload};

const RESOURCE: &str = "dining_menu";

fn map_repo_error(err: RepoError) -> AppError {
    match err {
        RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::DiningMenuExists, msg),
        RepoError::NotFound(_) => AppError::new(ErrorCode::DiningMenuNotFound),
        other => other.into(),
    }
}

async fn load(state: &ServerState, id: i64) -> AppResult<DiningMenu> {
    dining_menu::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::DiningMenuNotFound))
}

/// GET /api/menus?date=&meal_type=
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<DiningMenuQuery>,
) -> AppResult<Json<ApiResponse<Vec<DiningMenu>>>> {
    let menus = dining_menu::list(&state.pool, &query).await?;
    Ok(Json(ApiResponse::success(menus)))
}

/// GET /api/menus/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<DiningMenu>>> {
    let menu = load(&state, id).await?;
    Ok(Json(ApiResponse::success(menu)))
}

/// POST /api/menus - 同一日期同一餐次只能有一份有效餐单
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<DiningMenuCreate>,
) -> AppResult<Json<ApiResponse<DiningMenu>>> {
    current_user.require(Capability::DiningManage)?;
    validate_payload(&payload)?;

    let menu = DiningMenu::new(snowflake_id(), payload, current_user.id, now_millis())?;
    dining_menu::insert(&state.pool, &menu)
        .await
        .map_err(map_repo_error)?;

    tracing::info!(
        menu_id = menu.id,
        date = %menu.date,
        meal_type = menu.meal_type.as_str(),
        "Dining menu published"
    );
    state
        .broadcast_sync(RESOURCE, "created", &menu.id.to_string(), Some(&menu))
        .await;
    Ok(Json(ApiResponse::success(menu)))
}

/// PUT /api/menus/{id}
pub async fn update(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<DiningMenuUpdate>,
) -> AppResult<Json<ApiResponse<DiningMenu>>> {
    current_user.require(Capability::DiningManage)?;
    validate_payload(&payload)?;

    let mut menu = load(&state, id).await?;
    menu.apply_update(payload, now_millis())?;
    dining_menu::save(&state.pool, &menu)
        .await
        .map_err(map_repo_error)?;

    state
        .broadcast_sync(RESOURCE, "updated", &id.to_string(), Some(&menu))
        .await;
    Ok(Json(ApiResponse::success(menu)))
}

/// DELETE /api/menus/{id} - 软删除 (评分保留)
pub async fn delete(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(Capability::DiningManage)?;

    let mut menu = load(&state, id).await?;
    menu.is_active = false;
    menu.updated_at = now_millis();
    dining_menu::save(&state.pool, &menu)
        .await
        .map_err(map_repo_error)?;

    state
        .broadcast_sync::<()>(RESOURCE, "deleted", &id.to_string(), None)
        .await;
    Ok(Json(ApiResponse::ok()))
}
