use std::sync::Arc;

use dashmap::DashMap;
use shared::message::{BusMessage, NotificationPayload, SyncPayload};
use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::message::EventBus;
use crate::utils::AppError;

/// 资源版本管理器
///
/// 使用 DashMap 实现无锁并发的版本号管理。
/// 每种资源类型维护独立的版本号，支持原子递增。
///
/// broadcast_sync 时自动生成递增的版本号，
/// 订阅方可以通过版本号判断数据新旧。
#[derive(Debug)]
pub struct ResourceVersions {
    versions: DashMap<String, u64>,
}

impl ResourceVersions {
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
        }
    }

    /// 递增指定资源的版本号并返回新值 (首次返回 1)
    pub fn increment(&self, resource: &str) -> u64 {
        let mut entry = self.versions.entry(resource.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// 当前版本号，未出现过的资源为 0
    pub fn get(&self, resource: &str) -> u64 {
        self.versions.get(resource).map(|v| *v).unwrap_or(0)
    }
}

impl Default for ResourceVersions {
    fn default() -> Self {
        Self::new()
    }
}

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | DbService | SQLite 连接池 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | bus | EventBus | 进程内事件总线 |
/// | resource_versions | Arc<ResourceVersions> | 资源版本管理 |
///
/// Clone 只复制引用计数，handler 之间共享同一份状态。
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    /// `db.pool` 的快捷引用
    pub pool: SqlitePool,
    pub jwt_service: Arc<JwtService>,
    pub bus: EventBus,
    pub resource_versions: Arc<ResourceVersions>,
}

impl ServerState {
    pub fn new(config: Config, db: DbService) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        Self {
            pool: db.pool.clone(),
            config,
            db,
            jwt_service,
            bus: EventBus::new(),
            resource_versions: Arc::new(ResourceVersions::new()),
        }
    }

    /// 初始化服务器状态
    ///
    /// 1. 工作目录 (文件数据库时)
    /// 2. 数据库 + 迁移
    /// 3. JWT / 事件总线
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        if !config.is_memory_db() {
            config.ensure_work_dir().map_err(|e| {
                AppError::internal(format!("Failed to create work directory: {e}"))
            })?;
        }

        let db = DbService::new(&config.database_url).await?;
        Ok(Self::new(config.clone(), db))
    }

    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 广播同步消息
    ///
    /// 版本号由 ResourceVersions 自动递增。发布失败只记录日志，不影响请求结果。
    ///
    /// - `resource`: 资源类型 (如 "order", "maintenance", "announcement")
    /// - `action`: 变更类型 ("created", "updated", "deleted", ...)
    /// - `id`: 资源 ID
    /// - `data`: 资源数据 (deleted 时为 None)
    pub async fn broadcast_sync<T: serde::Serialize>(
        &self,
        resource: &str,
        action: &str,
        id: &str,
        data: Option<&T>,
    ) {
        let version = self.resource_versions.increment(resource);
        let payload = SyncPayload {
            resource: resource.to_string(),
            version,
            action: action.to_string(),
            id: id.to_string(),
            data: data.and_then(|d| serde_json::to_value(d).ok()),
        };
        match BusMessage::sync(&payload) {
            Ok(msg) => {
                self.bus.publish(msg);
            }
            Err(e) => tracing::warn!(resource, action, error = %e, "Failed to encode sync payload"),
        }
    }

    /// 定向通知某个用户 (订单状态变化、报修指派、出门审批结果)
    pub fn notify(&self, user_id: i64, payload: NotificationPayload) {
        match BusMessage::notification(&payload) {
            Ok(msg) => {
                self.bus.publish(msg.with_target(user_id.to_string()));
            }
            Err(e) => tracing::warn!(user_id, error = %e, "Failed to encode notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::EventType;

    #[test]
    fn test_resource_versions_increment_per_resource() {
        let versions = ResourceVersions::new();
        assert_eq!(versions.get("order"), 0);
        assert_eq!(versions.increment("order"), 1);
        assert_eq!(versions.increment("order"), 2);
        assert_eq!(versions.increment("outpass"), 1);
        assert_eq!(versions.get("order"), 2);
    }

    #[tokio::test]
    async fn test_broadcast_and_notify_reach_subscribers() {
        let db = DbService::memory().await.unwrap();
        let state = ServerState::new(Config::for_tests(), db);
        let mut rx = state.bus.subscribe();

        state
            .broadcast_sync(
                "order",
                "created",
                "42",
                Some(&serde_json::json!({"id": 42})),
            )
            .await;
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event_type, EventType::Sync);
        let payload: SyncPayload = msg.parse_payload().unwrap();
        assert_eq!(payload.version, 1);
        assert_eq!(payload.id, "42");
        assert!(payload.data.is_some());

        state.notify(7, NotificationPayload::new("Outpass approved", "Have a safe trip"));
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event_type, EventType::Notification);
        assert_eq!(msg.target.as_deref(), Some("7"));
    }
}
