//! Menu Item API Handlers
//!
//! 所有读接口返回 [`MenuItemView`] (含折扣百分比、库存状态)

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::PaginatedResponse;
use shared::models::{AvailabilityUpdate, MenuItem, MenuItemCreate, MenuItemUpdate, MenuItemView};
use shared::util::{now_millis, snowflake_id};

use crate::auth::{Capability, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::{category, menu_item};
use crate::db::repository::menu_item::MenuItemFilter;
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, PaginationParams, validate_payload};

const RESOURCE: &str = "menu_item";

#[derive(Debug, Default, Deserialize)]
pub struct MenuItemQuery {
    pub category_id: Option<i64>,
    pub is_veg: Option<bool>,
    #[serde(default)]
    pub available_only: bool,
    pub search: Option<String>,
}

impl From<MenuItemQuery> for MenuItemFilter {
    fn from(q: MenuItemQuery) -> Self {
        Self {
            category_id: q.category_id,
            is_veg: q.is_veg,
            available_only: q.available_only,
            search: q.search,
        }
    }
}

async fn load(state: &ServerState, id: i64) -> AppResult<MenuItem> {
    menu_item::find_by_id(&state.pool, id)
        .await?
        .filter(|item| item.is_active)
        .ok_or_else(|| AppError::new(ErrorCode::MenuItemNotFound))
}

async fn ensure_category(state: &ServerState, category_id: i64) -> AppResult<()> {
    match category::find_by_id(&state.pool, category_id).await? {
        Some(c) if c.is_active => Ok(()),
        _ => Err(
            AppError::new(ErrorCode::CategoryNotFound).with_detail("category_id", category_id),
        ),
    }
}

/// GET /api/menu-items?category_id=&is_veg=&available_only=&search=&page=&page_size=
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<MenuItemQuery>,
    Query(p): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<MenuItemView>>>> {
    let filter = MenuItemFilter::from(query);
    let (items, total) = menu_item::list(&state.pool, &filter, p.offset(), p.limit()).await?;
    let page = PaginatedResponse::new(items, total, p.page(), p.limit()).map(MenuItemView::from);
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/menu-items/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<MenuItemView>>> {
    let item = load(&state, id).await?;
    Ok(Json(ApiResponse::success(item.into())))
}

/// POST /api/menu-items
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<MenuItemCreate>,
) -> AppResult<Json<ApiResponse<MenuItemView>>> {
    current_user.require(Capability::MenuManage)?;
    validate_payload(&payload)?;
    ensure_category(&state, payload.category_id).await?;

    let item = menu_item::create(&state.pool, snowflake_id(), payload, now_millis()).await?;
    tracing::info!(menu_item_id = item.id, name = %item.name, "Menu item created");

    state
        .broadcast_sync(RESOURCE, "created", &item.id.to_string(), Some(&item))
        .await;
    Ok(Json(ApiResponse::success(item.into())))
}

/// PUT /api/menu-items/{id}
pub async fn update(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<MenuItemUpdate>,
) -> AppResult<Json<ApiResponse<MenuItemView>>> {
    current_user.require(Capability::MenuManage)?;
    validate_payload(&payload)?;
    if let Some(category_id) = payload.category_id {
        ensure_category(&state, category_id).await?;
    }

    let mut item = load(&state, id).await?;
    item.apply_update(payload, now_millis());
    menu_item::save(&state.pool, &item).await?;

    state
        .broadcast_sync(RESOURCE, "updated", &id.to_string(), Some(&item))
        .await;
    Ok(Json(ApiResponse::success(item.into())))
}

/// PATCH /api/menu-items/{id}/availability - 上/下架
pub async fn set_availability(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<AvailabilityUpdate>,
) -> AppResult<Json<ApiResponse<MenuItemView>>> {
    current_user.require(Capability::MenuManage)?;

    let mut item = load(&state, id).await?;
    item.is_available = payload.is_available;
    item.updated_at = now_millis();
    menu_item::save(&state.pool, &item).await?;

    state
        .broadcast_sync(RESOURCE, "updated", &id.to_string(), Some(&item))
        .await;
    Ok(Json(ApiResponse::success(item.into())))
}

/// DELETE /api/menu-items/{id} - 软删除
pub async fn delete(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(Capability::MenuManage)?;

    let mut item = load(&state, id).await?;
    item.is_active = false;
    item.updated_at = now_millis();
    menu_item::save(&state.pool, &item).await?;

    state
        .broadcast_sync::<()>(RESOURCE, "deleted", &id.to_string(), None)
        .await;
    Ok(Json(ApiResponse::ok()))
}
