//! 工具模块 - 通用工具函数和类型
//!
//! - [`AppError`] / [`AppResult`] - 应用错误 (from shared::error)
//! - 请求校验、分页参数、业务时区、日志初始化

pub mod error;
pub mod logger;
pub mod time;
pub mod types;
pub mod validation;

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use types::PaginationParams;
pub use validation::validate_payload;
