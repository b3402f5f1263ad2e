//! Outpass API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/outpass", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/stats", get(handler::stats))
        .route("/check-overdue", post(handler::check_overdue))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/under-review", put(handler::mark_under_review))
        .route("/{id}/review", put(handler::review))
        .route("/{id}/parent-approval", put(handler::parent_approval))
        .route("/{id}/checkout", post(handler::check_out))
        .route("/{id}/checkin", post(handler::check_in))
        .route("/{id}/cancel", post(handler::cancel))
}
