//! Order API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::place))
        // 静态路径放在 /{id} 之前
        .route("/stats", get(handler::stats))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/assign", put(handler::assign_delivery))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/rating", post(handler::rate))
}
