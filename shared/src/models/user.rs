//! User Model

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::validate_phone;

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum Role {
    #[default]
    Student,
    /// Warden, maintenance and security staff
    Staff,
    /// Canteen staff
    Canteen,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Staff => "staff",
            Self::Canteen => "canteen",
            Self::Admin => "admin",
        }
    }

    pub fn is_student(&self) -> bool {
        matches!(self, Self::Student)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "staff" => Ok(Self::Staff),
            "canteen" => Ok(Self::Canteen),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// User entity (password hash is never part of this type)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub room_number: Option<String>,
    pub floor: Option<i32>,
    pub hostel_block: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Self-registration payload (always creates a student)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 20))]
    pub room_number: Option<String>,
    #[validate(range(min = 0, max = 200))]
    pub floor: Option<i32>,
    #[validate(length(max = 50))]
    pub hostel_block: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
}

/// Admin-side account creation (any role)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[validate(length(max = 20))]
    pub room_number: Option<String>,
    #[validate(range(min = 0, max = 200))]
    pub floor: Option<i32>,
    #[validate(length(max = 50))]
    pub hostel_block: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
}

impl From<RegisterRequest> for UserCreate {
    fn from(req: RegisterRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
            role: Role::Student,
            room_number: req.room_number,
            floor: req.floor,
            hostel_block: req.hostel_block,
            phone: req.phone,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip_str() {
        for role in [Role::Student, Role::Staff, Role::Canteen, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("warden".parse::<Role>().is_err());
    }

    #[test]
    fn test_register_validation() {
        let mut req = RegisterRequest {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            password: "longenough".into(),
            room_number: Some("B-204".into()),
            floor: Some(2),
            hostel_block: Some("B".into()),
            phone: Some("9876543210".into()),
        };
        assert!(req.validate().is_ok());

        req.email = "not-an-email".into();
        req.password = "short".into();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_register_forces_student_role() {
        let req = RegisterRequest {
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            password: "password1".into(),
            room_number: None,
            floor: None,
            hostel_block: None,
            phone: None,
        };
        let create: UserCreate = req.into();
        assert_eq!(create.role, Role::Student);
    }
}
