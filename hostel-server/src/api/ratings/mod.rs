//! Meal Rating API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/ratings", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::submit))
        .route("/menu/{menu_id}", get(handler::list_for_menu))
        .route("/menu/{menu_id}/mine", get(handler::mine))
        .route("/menu/{menu_id}/stats", get(handler::stats))
}
