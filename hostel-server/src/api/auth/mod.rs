//! Authentication Routes

mod handler;

pub(crate) use handler::create_account;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

/// - /api/auth/register, /api/auth/login: public
/// - /api/auth/me: protected (global require_auth middleware)
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/auth/register", post(handler::register))
        .route("/api/auth/login", post(handler::login))
        .route("/api/auth/me", get(handler::me))
}
