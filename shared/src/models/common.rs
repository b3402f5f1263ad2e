//! Building blocks shared by several record types

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Actor id recorded when the server itself changes a record
/// (e.g. the overdue reconciliation task).
pub const SYSTEM_ACTOR: i64 = 0;

/// Priority shared by maintenance requests and announcements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Stored file metadata (photos, documents, attachments).
///
/// 上传由外部存储完成，这里只原样保存返回的 path / filename / size。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FileRef {
    #[validate(length(min = 1, max = 2048))]
    pub path: String,
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(range(min = 0))]
    pub size: i64,
}

/// One entry of an append-only status log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange<S> {
    pub status: S,
    pub timestamp: i64,
    pub changed_by: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl<S> StatusChange<S> {
    pub fn new(status: S, changed_by: i64, notes: Option<String>, timestamp: i64) -> Self {
        Self {
            status,
            timestamp,
            changed_by,
            notes,
            location: None,
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }
}

/// Parse a `HH:MM` clock time
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Combine a calendar date with a `HH:MM` clock time
pub fn combine(date: NaiveDate, clock: &str) -> Option<NaiveDateTime> {
    parse_clock(clock).map(|t| date.and_time(t))
}

/// validator hook: `HH:MM`
pub fn validate_clock(value: &str) -> Result<(), ValidationError> {
    if parse_clock(value).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("clock_format").with_message("expected HH:MM".into()))
    }
}

/// validator hook: phone number with 10 to 15 digits (optional leading `+`)
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    if (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone_format")
            .with_message("phone number must have 10 to 15 digits".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_clock("23:59"), NaiveTime::from_hms_opt(23, 59, 0));
        assert!(parse_clock("24:00").is_none());
        assert!(parse_clock("9am").is_none());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("+919876543210").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("98765-43210").is_err());
    }

    #[test]
    fn test_status_change_serialization_skips_empty_fields() {
        let entry = StatusChange::new(Priority::High, 7, None, 1000);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "high");
        assert!(json.get("notes").is_none());
        assert!(json.get("location").is_none());
    }
}
