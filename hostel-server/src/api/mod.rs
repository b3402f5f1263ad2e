//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 注册、登录、当前账号
//! - [`users`] - 账号管理
//! - [`categories`] / [`menu_items`] - 食堂菜单
//! - [`cart`] / [`orders`] - 购物车与订单
//! - [`maintenance`] - 报修
//! - [`outpass`] - 出门申请
//! - [`announcements`] - 公告与活动报名
//! - [`menus`] / [`ratings`] - 每日餐单与评分
//! - [`statistics`] - 仪表盘统计

pub mod auth;
pub mod health;
pub mod users;

pub mod announcements;
pub mod cart;
pub mod categories;
pub mod maintenance;
pub mod menu_items;
pub mod menus;
pub mod orders;
pub mod outpass;
pub mod ratings;
pub mod statistics;

// Re-export common types for handlers
pub use crate::utils::{ApiResponse, AppResult};

use shared::models::User;

use crate::core::ServerState;
use crate::db::repository::user;
use crate::utils::{AppError, ErrorCode};

/// 指派目标必须是启用中的非学生账号
pub(crate) async fn ensure_staff_member(state: &ServerState, user_id: i64) -> AppResult<User> {
    let found = user::find_by_id(&state.pool, user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound).with_detail("user_id", user_id))?;
    if found.role.is_student() {
        return Err(AppError::validation("Assignee must be a staff member")
            .with_detail("user_id", user_id));
    }
    Ok(found)
}
