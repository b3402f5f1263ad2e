//! Authentication Handlers
//!
//! Registration, login and the current account

use std::time::Duration;

use axum::{Json, extract::State};
use shared::models::{LoginRequest, LoginResponse, RegisterRequest, User, UserCreate};
use shared::util::{now_millis, snowflake_id};

use crate::auth::{CurrentUser, hash_password, verify_password};
use crate::core::ServerState;
use crate::db::repository::user;
use crate::security_log;
use crate::utils::validation::normalize_email;
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, validate_payload};

const RESOURCE: &str = "user";

/// Fixed delay before answering a failed login
const AUTH_FAILURE_DELAY_MS: u64 = 300;

/// POST /api/auth/register - 学生自助注册
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    validate_payload(&payload)?;

    let mut data = UserCreate::from(payload);
    data.email = normalize_email(&data.email);
    let created = create_account(&state, &data).await?;

    tracing::info!(user_id = created.id, email = %created.email, "Student registered");
    Ok(Json(ApiResponse::success_with_message(
        "Registration successful",
        created,
    )))
}

/// Hash the password and insert the account (shared with admin creation)
pub(crate) async fn create_account(state: &ServerState, data: &UserCreate) -> AppResult<User> {
    let password_hash = hash_password(&data.password)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))?;

    let created = user::create(&state.pool, snowflake_id(), data, &password_hash, now_millis())
        .await
        .map_err(|e| match AppError::from(e) {
            err if err.code == ErrorCode::AlreadyExists => {
                AppError::with_message(ErrorCode::EmailAlreadyRegistered, err.message)
            }
            err => err,
        })?;

    state
        .broadcast_sync(RESOURCE, "created", &created.id.to_string(), Some(&created))
        .await;
    Ok(created)
}

/// POST /api/auth/login
///
/// Wrong email and wrong password answer identically.
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    validate_payload(&req)?;
    let email = normalize_email(&req.email);

    let credentials = user::find_credentials(&state.pool, &email).await?;

    let account = match credentials {
        Some(c) => {
            let password_valid = verify_password(&req.password, &c.password_hash)
                .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;
            if !password_valid {
                return Err(reject_login(&email, "invalid_password").await);
            }
            if !c.user.is_active {
                security_log!("WARN", "login_disabled_account", email = email.clone());
                return Err(AppError::new(ErrorCode::AccountDisabled));
            }
            c.user
        }
        None => return Err(reject_login(&email, "user_not_found").await),
    };

    let jwt_service = state.get_jwt_service();
    let token = jwt_service
        .generate_token(&account)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    tracing::info!(
        user_id = account.id,
        email = %account.email,
        role = %account.role,
        "User logged in"
    );

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        expires_in: jwt_service.expires_in_seconds(),
        user: account,
    })))
}

async fn reject_login(email: &str, reason: &'static str) -> AppError {
    security_log!("WARN", "login_failed", email = email.to_string(), reason = reason);
    tokio::time::sleep(Duration::from_millis(AUTH_FAILURE_DELAY_MS)).await;
    AppError::invalid_credentials()
}

/// GET /api/auth/me - 当前账号 (从数据库读取最新资料)
pub async fn me(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let account = user::find_by_id(&state.pool, current_user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(Json(ApiResponse::success(account)))
}
