//! Capability Definitions
//!
//! 角色 → 能力 的静态表，每个请求在进入业务逻辑前检查一次。
//!
//! ## 设计原则
//! - 学生的自助操作（下单、报修、申请出门、评分）无需能力，登录即可使用
//! - 管理类操作按模块授权
//! - admin 拥有全部能力

use shared::ErrorCode;
use shared::models::Role;

use crate::auth::CurrentUser;
use crate::security_log;
use crate::utils::{AppError, AppResult};

/// 能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// 食堂菜品/分类 增删改
    MenuManage,
    /// 查看全部订单、推进订单状态、指派配送
    OrdersManage,
    /// 查看全部报修、推进状态、指派、费用
    MaintenanceManage,
    /// 审核出门申请、家长确认、手动逾期巡检
    OutpassReview,
    /// 门卫登记出/入
    OutpassGate,
    /// 发布/编辑/置顶/删除公告
    AnnouncementsManage,
    /// 维护每日餐单
    DiningManage,
    /// 查看统计
    StatsView,
    /// 用户管理
    UsersManage,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Self::MenuManage,
        Self::OrdersManage,
        Self::MaintenanceManage,
        Self::OutpassReview,
        Self::OutpassGate,
        Self::AnnouncementsManage,
        Self::DiningManage,
        Self::StatsView,
        Self::UsersManage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MenuManage => "menu:manage",
            Self::OrdersManage => "orders:manage",
            Self::MaintenanceManage => "maintenance:manage",
            Self::OutpassReview => "outpass:review",
            Self::OutpassGate => "outpass:gate",
            Self::AnnouncementsManage => "announcements:manage",
            Self::DiningManage => "dining:manage",
            Self::StatsView => "stats:view",
            Self::UsersManage => "users:manage",
        }
    }
}

/// 宿舍职员（宿管、维修、门卫）
const STAFF_CAPABILITIES: &[Capability] = &[
    Capability::MaintenanceManage,
    Capability::OutpassReview,
    Capability::OutpassGate,
    Capability::AnnouncementsManage,
    Capability::DiningManage,
    Capability::StatsView,
];

/// 食堂职员
const CANTEEN_CAPABILITIES: &[Capability] = &[
    Capability::MenuManage,
    Capability::OrdersManage,
    Capability::DiningManage,
    Capability::StatsView,
];

/// Capabilities granted to a role
pub fn capabilities_for(role: Role) -> &'static [Capability] {
    match role {
        Role::Student => &[],
        Role::Staff => STAFF_CAPABILITIES,
        Role::Canteen => CANTEEN_CAPABILITIES,
        Role::Admin => &Capability::ALL,
    }
}

impl CurrentUser {
    pub fn has(&self, capability: Capability) -> bool {
        capabilities_for(self.role).contains(&capability)
    }

    /// 要求拥有指定能力，否则 403
    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.has(capability) {
            return Ok(());
        }
        security_log!(
            "WARN",
            "permission_denied",
            user_id = self.id,
            role = self.role.as_str(),
            required = capability.as_str()
        );
        Err(AppError::forbidden(format!(
            "Permission denied: {}",
            capability.as_str()
        )))
    }

    /// 资源属于自己，或拥有指定能力
    pub fn require_owner_or(&self, owner_id: i64, capability: Capability) -> AppResult<()> {
        if owner_id == self.id || self.has(capability) {
            return Ok(());
        }
        security_log!(
            "WARN",
            "not_resource_owner",
            user_id = self.id,
            owner_id = owner_id,
            required = capability.as_str()
        );
        Err(AppError::with_message(
            ErrorCode::NotResourceOwner,
            "You can only access your own records",
        ))
    }

    /// 仅资源本人
    pub fn require_owner(&self, owner_id: i64) -> AppResult<()> {
        if owner_id == self.id {
            return Ok(());
        }
        security_log!(
            "WARN",
            "not_resource_owner",
            user_id = self.id,
            owner_id = owner_id
        );
        Err(AppError::with_message(
            ErrorCode::NotResourceOwner,
            "Only the requester can do this",
        ))
    }
}
