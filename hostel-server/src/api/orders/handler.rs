//! Order API Handlers
//!
//! 下单走 [`place_order`](crate::services::place_order) 事务；其余操作都是
//! 加载 → 模型状态机方法 → 整行保存 → 广播。

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::PaginatedResponse;
use shared::message::NotificationPayload;
use shared::models::{
    AssignDeliveryRequest, CancelOrderRequest, Order, OrderRatingInput, OrderStats, OrderStatus,
    OrderStatusUpdate, PlaceOrderRequest,
};
use shared::util::now_millis;

use crate::api::ensure_staff_member;
use crate::auth::{Capability, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::order::{self, OrderFilter};
use crate::services::place_order;
use crate::utils::time::{day_end_millis, day_start_millis};
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, PaginationParams, validate_payload};

const RESOURCE: &str = "order";

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    /// 业务时区日期，含
    pub from: Option<NaiveDate>,
    /// 业务时区日期，含
    pub to: Option<NaiveDate>,
}

async fn load(state: &ServerState, id: i64) -> AppResult<Order> {
    order::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))
}

/// Persist, broadcast, and tell the customer when someone else changed their order
async fn commit(
    state: &ServerState,
    current_user: &CurrentUser,
    order: &Order,
    action: &str,
) -> AppResult<()> {
    order::save(&state.pool, order).await?;
    state
        .broadcast_sync(RESOURCE, action, &order.id.to_string(), Some(order))
        .await;

    if order.user_id != current_user.id {
        state.notify(
            order.user_id,
            NotificationPayload::new(
                format!("Order {}", order.order_number),
                format!("Your order is now {}", order.status.as_str()),
            )
            .with_reference(order.id.to_string()),
        );
    }
    Ok(())
}

/// POST /api/orders - 购物车下单
pub async fn place(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<PlaceOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    validate_payload(&payload)?;

    let created = place_order(
        &state.pool,
        current_user.id,
        payload,
        &state.config.delivery,
        state.config.timezone,
        now_millis(),
    )
    .await?;

    tracing::info!(
        order_id = created.id,
        order_number = %created.order_number,
        user_id = current_user.id,
        final_amount = created.final_amount,
        "Order placed"
    );

    state
        .broadcast_sync(RESOURCE, "created", &created.id.to_string(), Some(&created))
        .await;
    // 购物车已在事务内清空
    state
        .broadcast_sync::<()>("cart", "updated", &current_user.id.to_string(), None)
        .await;
    Ok(Json(ApiResponse::success(created)))
}

/// GET /api/orders - 自己的订单；orders:manage 可查看全部
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Query(query): Query<OrderListQuery>,
    Query(p): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<Order>>>> {
    let tz = state.config.timezone;
    let filter = OrderFilter {
        user_id: (!current_user.has(Capability::OrdersManage)).then_some(current_user.id),
        status: query.status,
        created_from: query.from.map(|d| day_start_millis(d, tz)),
        created_to: query.to.map(|d| day_end_millis(d, tz)),
    };

    let (orders, total) = order::list(&state.pool, &filter, p.offset(), p.limit()).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        orders,
        total,
        p.page(),
        p.limit(),
    ))))
}

/// GET /api/orders/stats
pub async fn stats(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<OrderStats>>> {
    current_user.require(Capability::StatsView)?;
    let stats = order::stats(&state.pool).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let found = load(&state, id).await?;
    current_user.require_owner_or(found.user_id, Capability::OrdersManage)?;
    Ok(Json(ApiResponse::success(found)))
}

/// PUT /api/orders/{id}/status - 推进订单状态
pub async fn update_status(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<OrderStatusUpdate>,
) -> AppResult<Json<ApiResponse<Order>>> {
    current_user.require(Capability::OrdersManage)?;
    validate_payload(&payload)?;

    let mut found = load(&state, id).await?;
    let from = found.status;
    found.update_status(payload.status, current_user.id, payload.notes, now_millis())?;
    commit(&state, &current_user, &found, "status_updated").await?;

    tracing::info!(
        order_id = id,
        from = from.as_str(),
        to = found.status.as_str(),
        by = current_user.id,
        "Order status updated"
    );
    Ok(Json(ApiResponse::success(found)))
}

/// PUT /api/orders/{id}/assign - 指派配送员
pub async fn assign_delivery(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<AssignDeliveryRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    current_user.require(Capability::OrdersManage)?;
    ensure_staff_member(&state, payload.delivery_person_id).await?;

    let mut found = load(&state, id).await?;
    found.assign_delivery_person(
        payload.delivery_person_id,
        current_user.id,
        now_millis(),
    )?;
    commit(&state, &current_user, &found, "updated").await?;
    Ok(Json(ApiResponse::success(found)))
}

/// POST /api/orders/{id}/cancel - 本人或 orders:manage
pub async fn cancel(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CancelOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    validate_payload(&payload)?;

    let mut found = load(&state, id).await?;
    current_user.require_owner_or(found.user_id, Capability::OrdersManage)?;
    found.cancel_order(payload.reason, current_user.id, now_millis())?;
    commit(&state, &current_user, &found, "cancelled").await?;

    tracing::info!(order_id = id, by = current_user.id, "Order cancelled");
    Ok(Json(ApiResponse::success(found)))
}

/// POST /api/orders/{id}/rating - 仅下单本人，且已送达
pub async fn rate(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<OrderRatingInput>,
) -> AppResult<Json<ApiResponse<Order>>> {
    validate_payload(&payload)?;

    let mut found = load(&state, id).await?;
    current_user.require_owner(found.user_id)?;
    found.add_rating(payload, now_millis())?;
    commit(&state, &current_user, &found, "rated").await?;
    Ok(Json(ApiResponse::success(found)))
}
