//! Cart API 模块 (仅当前用户自己的购物车)

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/cart", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::get_cart).delete(handler::clear))
        .route("/items", post(handler::add_item))
        .route(
            "/items/{menu_item_id}",
            put(handler::update_item).delete(handler::remove_item),
        )
}
