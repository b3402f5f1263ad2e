//! Hostel Server - 宿舍综合服务后端
//!
//! # 架构概述
//!
//! - **HTTP API** (`api`): 食堂点餐、报修、出门申请、公告、餐单评分、统计
//! - **认证** (`auth`): JWT + Argon2，角色 → 能力 静态授权表
//! - **数据库** (`db`): SQLite (sqlx)，仓储层为无状态的 async 函数
//! - **消息总线** (`message`): 进程内 broadcast，持久化成功后发布变更
//! - **后台任务** (`services`): 出门逾期巡检
//!
//! # 模块结构
//!
//! ```text
//! hostel-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── auth/          # JWT 认证、能力表、提取器
//! ├── api/           # HTTP 路由和处理器
//! ├── routes/        # 路由汇总 + 中间件栈
//! ├── middleware/    # 请求日志
//! ├── services/      # 下单事务、逾期巡检
//! ├── message/       # 事件总线
//! ├── db/            # 连接池、迁移、仓储
//! └── utils/         # 错误、分页、时区、日志初始化
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod message;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use message::EventBus;
pub use routes::build_app;
pub use utils::{ApiResponse, AppError, AppResult, ErrorCode};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 初始化日志 (未配置 LOG_DIR 时写入 work_dir/logs)
///
/// 生产环境输出 JSON 日志
pub fn setup_environment(config: &Config) {
    let log_dir = config.log_dir.clone().or_else(|| {
        (!config.is_memory_db())
            .then(|| config.work_dir().join("logs").to_string_lossy().into_owned())
    });
    init_logger_with_file(&config.log_level, config.is_production(), log_dir.as_deref());
}

pub fn print_banner() {
    println!(
        r#"
    __  __           __       __
   / / / /___  _____/ /____  / /
  / /_/ / __ \/ ___/ __/ _ \/ /
 / __  / /_/ (__  ) /_/  __/ /
/_/ /_/\____/____/\__/\___/_/
        Hostel Server v{}
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
