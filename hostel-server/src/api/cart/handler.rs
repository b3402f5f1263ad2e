//! Cart API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{AddCartItem, Cart, MenuItem, UpdateCartItem};
use shared::util::now_millis;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{cart, menu_item};
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, validate_payload};

const RESOURCE: &str = "cart";

async fn load_menu_item(state: &ServerState, id: i64) -> AppResult<MenuItem> {
    menu_item::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MenuItemNotFound).with_detail("menu_item_id", id))
}

async fn persist(
    state: &ServerState,
    user_id: i64,
    cart: Cart,
) -> AppResult<Json<ApiResponse<Cart>>> {
    cart::save(&state.pool, &cart).await?;
    state
        .broadcast_sync(RESOURCE, "updated", &user_id.to_string(), Some(&cart))
        .await;
    Ok(Json(ApiResponse::success(cart)))
}

/// GET /api/cart - 首次访问时创建空购物车
pub async fn get_cart(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = cart::get_or_create(&state.pool, current_user.id, now_millis()).await?;
    Ok(Json(ApiResponse::success(cart)))
}

/// POST /api/cart/items - 加入购物车 (同一菜品合并数量)
pub async fn add_item(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<AddCartItem>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    validate_payload(&payload)?;
    let now = now_millis();

    let item = load_menu_item(&state, payload.menu_item_id).await?;
    let mut cart = cart::get_or_create(&state.pool, current_user.id, now).await?;

    // 校验合并后的总数量
    let in_cart = cart
        .items
        .iter()
        .find(|line| line.menu_item_id == item.id)
        .map_or(0, |line| line.quantity);
    item.ensure_orderable(in_cart + payload.quantity)?;

    cart.add_item(&item, payload.quantity, payload.special_instructions, now)?;
    persist(&state, current_user.id, cart).await
}

/// PUT /api/cart/items/{menu_item_id} - 修改数量 (≤ 0 删除该行)
pub async fn update_item(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(menu_item_id): Path<i64>,
    Json(payload): Json<UpdateCartItem>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    validate_payload(&payload)?;
    let now = now_millis();

    let mut cart = cart::get_or_create(&state.pool, current_user.id, now).await?;
    if payload.quantity > 0 {
        load_menu_item(&state, menu_item_id)
            .await?
            .ensure_orderable(payload.quantity)?;
    }

    cart.update_item_quantity(menu_item_id, payload.quantity, now)?;
    persist(&state, current_user.id, cart).await
}

/// DELETE /api/cart/items/{menu_item_id}
pub async fn remove_item(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(menu_item_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let now = now_millis();
    let mut cart = cart::get_or_create(&state.pool, current_user.id, now).await?;
    cart.remove_item(menu_item_id, now)?;
    persist(&state, current_user.id, cart).await
}

/// DELETE /api/cart - 清空
pub async fn clear(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let now = now_millis();
    let mut cart = cart::get_or_create(&state.pool, current_user.id, now).await?;
    cart.clear(now);
    persist(&state, current_user.id, cart).await
}
