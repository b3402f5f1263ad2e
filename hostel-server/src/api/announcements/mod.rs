//! Announcement API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/announcements", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/stats", get(handler::stats))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .put(handler::update)
                .delete(handler::delete),
        )
        .route("/{id}/read", post(handler::mark_read))
        .route("/{id}/pin", put(handler::pin))
        .route(
            "/{id}/register",
            post(handler::register).delete(handler::unregister),
        )
}
