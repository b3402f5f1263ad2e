//! Error kind classification and HTTP status mapping

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error kind
///
/// 客户端根据 kind 分支，不需要匹配 message 文本。
/// Serialized into the `error` field of [`super::ApiResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input (400)
    ValidationFailed,
    /// Referenced entity does not exist or is not accessible (404)
    NotFound,
    /// State machine refuses the transition (422)
    PreconditionFailed,
    /// Uniqueness constraint violated (409)
    Conflict,
    /// Caller's role or ownership does not permit the action (403)
    Forbidden,
    /// Caller is not authenticated (401)
    Unauthenticated,
    /// Menu item inactive, unavailable or out of stock (409)
    Unavailable,
    /// Unexpected server-side failure (500)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "validation_failed",
            Self::NotFound => "not_found",
            Self::PreconditionFailed => "precondition_failed",
            Self::Conflict => "conflict",
            Self::Forbidden => "forbidden",
            Self::Unauthenticated => "unauthenticated",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }

    /// HTTP status for this kind
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::ValidationFailed => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PreconditionFailed => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict | Self::Unavailable => StatusCode::CONFLICT,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorCode {
    /// Get the error kind for this error code
    pub fn kind(&self) -> Option<ErrorKind> {
        let kind = match self {
            Self::Success => return None,

            Self::ValidationFailed
            | Self::ValueOutOfRange => ErrorKind::ValidationFailed,

            Self::NotFound
            | Self::AnnouncementNotFound
            | Self::OrderNotFound
            | Self::CartItemNotFound
            | Self::MaintenanceNotFound
            | Self::MenuItemNotFound
            | Self::CategoryNotFound
            | Self::DiningMenuNotFound
            | Self::MealRatingNotFound
            | Self::OutpassNotFound
            | Self::UserNotFound => ErrorKind::NotFound,

            Self::PreconditionFailed
            | Self::NotAnEvent
            | Self::EventFull
            | Self::NotRegistered
            | Self::OrderInvalidTransition
            | Self::OrderEmpty
            | Self::OrderNotDelivered
            | Self::MaintenanceInvalidTransition
            | Self::MaintenanceNotCompleted
            | Self::CategoryHasItems
            | Self::OutpassInvalidTransition
            | Self::OutpassReviewClosed => ErrorKind::PreconditionFailed,

            Self::AlreadyExists
            | Self::EmailAlreadyRegistered
            | Self::AlreadyRegistered
            | Self::OrderNumberConflict
            | Self::CategoryNameExists
            | Self::DiningMenuExists => ErrorKind::Conflict,

            Self::PermissionDenied
            | Self::NotResourceOwner => ErrorKind::Forbidden,

            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::AccountDisabled => ErrorKind::Unauthenticated,

            Self::MenuItemUnavailable | Self::OutOfStock => ErrorKind::Unavailable,

            Self::Unknown
            | Self::InternalError
            | Self::DatabaseError => ErrorKind::Internal,
        };
        Some(kind)
    }

    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        self.kind()
            .map(|k| k.http_status())
            .unwrap_or(StatusCode::OK)
    }
}
