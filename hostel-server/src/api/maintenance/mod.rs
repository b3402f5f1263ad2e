//! Maintenance Request API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/maintenance", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/stats", get(handler::stats))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/assign", put(handler::assign))
        .route("/{id}/cost", put(handler::update_cost))
        .route("/{id}/rating", post(handler::rate))
        .route("/{id}/cancel", post(handler::cancel))
}
