use std::path::PathBuf;

use chrono_tz::Tz;
use shared::models::DeliveryPricing;

use crate::auth::JwtConfig;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | DATABASE_URL | sqlite:<WORK_DIR>/hostel.db | SQLite 连接串 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | TIMEZONE | Asia/Kolkata | 业务时区 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
/// | DELIVERY_FEE | 10 | 配送费 |
/// | FREE_DELIVERY_THRESHOLD | 100 | 免配送费门槛 |
/// | OVERDUE_CHECK_INTERVAL_SECS | 300 | 逾期巡检周期 (0 = 关闭) |
///
/// JWT 相关变量见 [`JwtConfig`]。
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/srv/hostel HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和日志
    pub work_dir: String,
    /// SQLite 连接串
    pub database_url: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 业务时区 (订单号日期、出入时间)
    pub timezone: Tz,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// 食堂配送费规则
    pub delivery: DeliveryPricing,
    /// 逾期巡检周期 (秒)，0 表示不启动巡检任务
    pub overdue_check_interval_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite:{}/hostel.db", work_dir));

        let timezone = std::env::var("TIMEZONE")
            .ok()
            .and_then(|tz| {
                tz.parse::<Tz>()
                    .inspect_err(|e| tracing::warn!("Invalid TIMEZONE '{}': {}", tz, e))
                    .ok()
            })
            .unwrap_or(chrono_tz::Asia::Kolkata);

        Self {
            work_dir,
            database_url,
            http_port: env_or("HTTP_PORT", 3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone,
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            delivery: DeliveryPricing {
                delivery_fee: env_or("DELIVERY_FEE", 10.0),
                free_delivery_threshold: env_or("FREE_DELIVERY_THRESHOLD", 100.0),
            },
            overdue_check_interval_secs: env_or("OVERDUE_CHECK_INTERVAL_SECS", 300),
        }
    }

    /// 测试配置：内存数据库、固定密钥、关闭巡检任务
    pub fn for_tests() -> Self {
        Self {
            work_dir: std::env::temp_dir().to_string_lossy().into_owned(),
            database_url: "sqlite::memory:".into(),
            http_port: 0,
            jwt: JwtConfig {
                secret: "test-secret-key-that-is-at-least-32-chars".into(),
                expiration_minutes: 60,
                issuer: "hostel-server".into(),
                audience: "hostel-clients".into(),
                from_env: true,
            },
            environment: "test".into(),
            timezone: chrono_tz::Asia::Kolkata,
            request_timeout_ms: 30000,
            log_level: "debug".into(),
            log_dir: None,
            delivery: DeliveryPricing {
                delivery_fee: 10.0,
                free_delivery_threshold: 100.0,
            },
            overdue_check_interval_secs: 0,
        }
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
    }

    /// 确保工作目录存在
    pub fn ensure_work_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.work_dir())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 内存数据库 (测试)
    pub fn is_memory_db(&self) -> bool {
        self.database_url.contains(":memory:")
    }

    /// 启动前检查：生产环境必须显式配置 JWT_SECRET
    pub fn validate(&self) -> Result<(), String> {
        if self.is_production() && !self.jwt.from_env {
            return Err("JWT_SECRET environment variable must be set in production".into());
        }
        if self.jwt.secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters long".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
