//! 请求日志中间件
//!
//! 记录所有进入的 HTTP 请求，包含用户信息、状态码和耗时

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::auth::CurrentUser;

/// 请求日志中间件
///
/// - 请求 ID (x-request-id)
/// - HTTP 方法和路由模板 (`/api/orders/{id}`)
/// - 认证用户 (如果存在)
/// - 响应状态码、延迟 (毫秒)
///
/// 4xx/5xx 记为 warn。
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();

    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let user_info = req
        .extensions()
        .get::<CurrentUser>()
        .map(|u| format!("{}({}, {})", u.name, u.id, u.role));

    debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        user = ?user_info,
        "Request started"
    );

    let response = next.run(req).await;

    let latency_ms = start.elapsed().as_millis();
    let status = response.status();

    if status.is_server_error() || status.is_client_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = %latency_ms,
            user = ?user_info,
            "Request failed"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = %latency_ms,
            user = ?user_info,
            "Request completed"
        );
    }

    response
}
