//! Unified error codes for the hostel server
//!
//! Error codes are organized by domain:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Announcement errors
//! - 4xxx: Canteen order / cart errors
//! - 5xxx: Maintenance errors
//! - 6xxx: Menu catalog / dining errors
//! - 7xxx: Outpass errors
//! - 8xxx: User errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Operation not permitted in the current state
    PreconditionFailed = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1007,
    /// Email already registered
    EmailAlreadyRegistered = 1101,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Caller does not own the resource
    NotResourceOwner = 2004,

    // ==================== 3xxx: Announcement ====================
    /// Announcement not found
    AnnouncementNotFound = 3001,
    /// Announcement is not an event
    NotAnEvent = 3002,
    /// Event registration cap reached
    EventFull = 3003,
    /// Already registered for the event
    AlreadyRegistered = 3004,
    /// Not registered for the event
    NotRegistered = 3005,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order status transition not allowed
    OrderInvalidTransition = 4002,
    /// Cart is empty
    OrderEmpty = 4003,
    /// Order number already issued
    OrderNumberConflict = 4004,
    /// Order has not been delivered yet
    OrderNotDelivered = 4005,
    /// Cart line not found
    CartItemNotFound = 4101,

    // ==================== 5xxx: Maintenance ====================
    /// Maintenance request not found
    MaintenanceNotFound = 5001,
    /// Maintenance status transition not allowed
    MaintenanceInvalidTransition = 5002,
    /// Maintenance request is not completed
    MaintenanceNotCompleted = 5003,

    // ==================== 6xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item inactive or unavailable
    MenuItemUnavailable = 6003,
    /// Menu item out of stock
    OutOfStock = 6004,
    /// Menu category not found
    CategoryNotFound = 6101,
    /// Menu category still has active items
    CategoryHasItems = 6102,
    /// Menu category name already exists
    CategoryNameExists = 6103,
    /// Dining menu not found
    DiningMenuNotFound = 6201,
    /// Dining menu already exists for date + meal
    DiningMenuExists = 6202,
    /// Meal rating not found
    MealRatingNotFound = 6301,

    // ==================== 7xxx: Outpass ====================
    /// Outpass request not found
    OutpassNotFound = 7001,
    /// Outpass status transition not allowed
    OutpassInvalidTransition = 7002,
    /// Outpass review window closed
    OutpassReviewClosed = 7003,

    // ==================== 8xxx: User ====================
    /// User not found
    UserNotFound = 8001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::PreconditionFailed => "Operation not allowed in the current state",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::EmailAlreadyRegistered => "Email is already registered",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::NotResourceOwner => "You do not own this resource",

            // Announcement
            ErrorCode::AnnouncementNotFound => "Announcement not found",
            ErrorCode::NotAnEvent => "Announcement is not an event",
            ErrorCode::EventFull => "Event registration is full",
            ErrorCode::AlreadyRegistered => "Already registered for this event",
            ErrorCode::NotRegistered => "Not registered for this event",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderInvalidTransition => "Order status transition not allowed",
            ErrorCode::OrderEmpty => "Cart is empty",
            ErrorCode::OrderNumberConflict => "Order number already issued",
            ErrorCode::OrderNotDelivered => "Order has not been delivered",
            ErrorCode::CartItemNotFound => "Item not found in cart",

            // Maintenance
            ErrorCode::MaintenanceNotFound => "Maintenance request not found",
            ErrorCode::MaintenanceInvalidTransition => {
                "Maintenance status transition not allowed"
            }
            ErrorCode::MaintenanceNotCompleted => "Maintenance request is not completed",

            // Menu
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemUnavailable => "Menu item is not available",
            ErrorCode::OutOfStock => "Menu item is out of stock",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::CategoryHasItems => "Category still has active items",
            ErrorCode::CategoryNameExists => "Category name already exists",
            ErrorCode::DiningMenuNotFound => "Dining menu not found",
            ErrorCode::DiningMenuExists => "Dining menu already exists for this meal",
            ErrorCode::MealRatingNotFound => "Meal rating not found",

            // Outpass
            ErrorCode::OutpassNotFound => "Outpass request not found",
            ErrorCode::OutpassInvalidTransition => "Outpass status transition not allowed",
            ErrorCode::OutpassReviewClosed => "Outpass request has already been reviewed",

            // User
            ErrorCode::UserNotFound => "User not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when a u16 does not map to a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::PreconditionFailed),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1007 => Ok(ErrorCode::AccountDisabled),
            1101 => Ok(ErrorCode::EmailAlreadyRegistered),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2004 => Ok(ErrorCode::NotResourceOwner),

            // Announcement
            3001 => Ok(ErrorCode::AnnouncementNotFound),
            3002 => Ok(ErrorCode::NotAnEvent),
            3003 => Ok(ErrorCode::EventFull),
            3004 => Ok(ErrorCode::AlreadyRegistered),
            3005 => Ok(ErrorCode::NotRegistered),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderInvalidTransition),
            4003 => Ok(ErrorCode::OrderEmpty),
            4004 => Ok(ErrorCode::OrderNumberConflict),
            4005 => Ok(ErrorCode::OrderNotDelivered),
            4101 => Ok(ErrorCode::CartItemNotFound),

            // Maintenance
            5001 => Ok(ErrorCode::MaintenanceNotFound),
            5002 => Ok(ErrorCode::MaintenanceInvalidTransition),
            5003 => Ok(ErrorCode::MaintenanceNotCompleted),

            // Menu
            6001 => Ok(ErrorCode::MenuItemNotFound),
            6003 => Ok(ErrorCode::MenuItemUnavailable),
            6004 => Ok(ErrorCode::OutOfStock),
            6101 => Ok(ErrorCode::CategoryNotFound),
            6102 => Ok(ErrorCode::CategoryHasItems),
            6103 => Ok(ErrorCode::CategoryNameExists),
            6201 => Ok(ErrorCode::DiningMenuNotFound),
            6202 => Ok(ErrorCode::DiningMenuExists),
            6301 => Ok(ErrorCode::MealRatingNotFound),

            // Outpass
            7001 => Ok(ErrorCode::OutpassNotFound),
            7002 => Ok(ErrorCode::OutpassInvalidTransition),
            7003 => Ok(ErrorCode::OutpassReviewClosed),

            // User
            8001 => Ok(ErrorCode::UserNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::PreconditionFailed.code(), 9);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::EventFull.code(), 3003);
        assert_eq!(ErrorCode::OrderInvalidTransition.code(), 4002);
        assert_eq!(ErrorCode::CartItemNotFound.code(), 4101);
        assert_eq!(ErrorCode::MaintenanceNotCompleted.code(), 5003);
        assert_eq!(ErrorCode::OutOfStock.code(), 6004);
        assert_eq!(ErrorCode::OutpassReviewClosed.code(), 7003);
        assert_eq!(ErrorCode::UserNotFound.code(), 8001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::Unknown.is_success());
        assert!(!ErrorCode::NotFound.is_success());
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(1001), Ok(ErrorCode::NotAuthenticated));
        assert_eq!(ErrorCode::try_from(4001), Ok(ErrorCode::OrderNotFound));
        assert_eq!(ErrorCode::try_from(7002), Ok(ErrorCode::OutpassInvalidTransition));
        assert_eq!(ErrorCode::try_from(9001), Ok(ErrorCode::InternalError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&ErrorCode::OrderNotFound).unwrap();
        assert_eq!(json, "4001");

        let code: ErrorCode = serde_json::from_str("5002").unwrap();
        assert_eq!(code, ErrorCode::MaintenanceInvalidTransition);

        let result: Result<ErrorCode, _> = serde_json::from_str("999");
        assert!(result.is_err());
    }

    #[test]
    fn test_message() {
        assert_eq!(ErrorCode::NotFound.message(), "Resource not found");
        assert_eq!(ErrorCode::OrderNotFound.message(), "Order not found");
        assert_eq!(ErrorCode::OrderEmpty.message(), "Cart is empty");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::Success), "0");
        assert_eq!(format!("{}", ErrorCode::OutpassNotFound), "7001");
        assert_eq!(
            format!("{}", InvalidErrorCode(999)),
            "invalid error code: 999"
        );
    }
}
