//! Statistics API Handlers
//!
//! 只读聚合，所有分桶缺省为 0

use axum::{Json, extract::State};
use serde::Serialize;
use shared::models::{
    AnnouncementStats, MaintenanceStats, MealRatingStats, OrderStats, OutpassStats,
};
use shared::util::now_millis;

use crate::auth::{Capability, CurrentUser};
use crate::core::ServerState;
use crate::db::repository::{announcement, maintenance, meal_rating, order, outpass};
use crate::utils::time::local_now;
use crate::utils::{ApiResponse, AppResult};

/// 仪表盘汇总
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub orders: OrderStats,
    pub maintenance: MaintenanceStats,
    pub outpass: OutpassStats,
    pub announcements: AnnouncementStats,
    pub meal_ratings: MealRatingStats,
    /// 统计时间 (Unix millis)
    pub generated_at: i64,
}

/// GET /api/stats/dashboard
pub async fn dashboard(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    current_user.require(Capability::StatsView)?;

    let now = now_millis();
    let pool = &state.pool;
    let (orders, maintenance, outpass, announcements, meal_ratings) = tokio::try_join!(
        order::stats(pool),
        maintenance::stats(pool),
        outpass::stats(pool, local_now(state.config.timezone)),
        announcement::stats(pool, now),
        meal_rating::stats(pool, None),
    )?;

    Ok(Json(ApiResponse::success(DashboardStats {
        orders,
        maintenance,
        outpass,
        announcements,
        meal_ratings,
        generated_at: now,
    })))
}
