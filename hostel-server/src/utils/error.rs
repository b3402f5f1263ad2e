//! 统一错误处理
//!
//! 错误类型定义在 `shared::error`，这里补充仓储层错误到 [`AppError`] 的映射。

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};

use crate::db::repository::RepoError;

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
            RepoError::Duplicate(msg) => AppError::conflict(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                AppError::database("Database operation failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_repo_error_mapping() {
        let err: AppError = RepoError::Duplicate("Email already registered".into()).into();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
        assert_eq!(err.http_status(), StatusCode::CONFLICT);

        let err: AppError = RepoError::NotFound("Order 1 not found".into()).into();
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);

        // 不把 SQL 细节透传给客户端
        let err: AppError = RepoError::Database("no such table: x".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("no such table"));
    }
}
