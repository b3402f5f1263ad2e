//! Meal Rating API Handlers
//!
//! 每人每份餐单一条评分，重复提交即覆盖。匿名评分对外不暴露 user_id。

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::PaginatedResponse;
use shared::models::{MealRating, MealRatingInput, MealRatingStats, MealRatingView};
use shared::util::{now_millis, snowflake_id};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{dining_menu, meal_rating};
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, PaginationParams, validate_payload};

const RESOURCE: &str = "meal_rating";

async fn ensure_menu(state: &ServerState, menu_id: i64) -> AppResult<()> {
    dining_menu::find_by_id(&state.pool, menu_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::new(ErrorCode::DiningMenuNotFound).with_detail("menu_id", menu_id))
}

/// POST /api/ratings - 提交/更新评分
pub async fn submit(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<MealRatingInput>,
) -> AppResult<Json<ApiResponse<MealRating>>> {
    validate_payload(&payload)?;
    ensure_menu(&state, payload.menu_id).await?;

    let rating = MealRating::new(snowflake_id(), current_user.id, payload, now_millis());
    let stored = meal_rating::upsert(&state.pool, &rating).await?;

    tracing::info!(
        menu_id = stored.menu_id,
        user_id = current_user.id,
        rating = stored.rating,
        "Meal rated"
    );
    state
        .broadcast_sync::<()>(RESOURCE, "updated", &stored.menu_id.to_string(), None)
        .await;
    Ok(Json(ApiResponse::success(stored)))
}

/// GET /api/ratings/menu/{menu_id}
pub async fn list_for_menu(
    State(state): State<ServerState>,
    Path(menu_id): Path<i64>,
    Query(p): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<MealRatingView>>>> {
    ensure_menu(&state, menu_id).await?;
    let (ratings, total) =
        meal_rating::list_by_menu(&state.pool, menu_id, p.offset(), p.limit()).await?;
    let page =
        PaginatedResponse::new(ratings, total, p.page(), p.limit()).map(MealRatingView::from);
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/ratings/menu/{menu_id}/mine
pub async fn mine(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(menu_id): Path<i64>,
) -> AppResult<Json<ApiResponse<MealRating>>> {
    let rating = meal_rating::find_by_user_and_menu(&state.pool, current_user.id, menu_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MealRatingNotFound))?;
    Ok(Json(ApiResponse::success(rating)))
}

/// GET /api/ratings/menu/{menu_id}/stats
pub async fn stats(
    State(state): State<ServerState>,
    Path(menu_id): Path<i64>,
) -> AppResult<Json<ApiResponse<MealRatingStats>>> {
    ensure_menu(&state, menu_id).await?;
    let stats = meal_rating::stats(&state.pool, Some(menu_id)).await?;
    Ok(Json(ApiResponse::success(stats)))
}
