//! Maintenance Request Model (报修)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::error::{AppError, AppResult, ErrorCode};

use super::common::{FileRef, Priority, StatusChange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum MaintenanceCategory {
    Electrical,
    Plumbing,
    Carpentry,
    Cleaning,
    Appliance,
    Internet,
    PestControl,
    Other,
}

impl MaintenanceCategory {
    pub const ALL: [MaintenanceCategory; 8] = [
        Self::Electrical,
        Self::Plumbing,
        Self::Carpentry,
        Self::Cleaning,
        Self::Appliance,
        Self::Internet,
        Self::PestControl,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrical => "electrical",
            Self::Plumbing => "plumbing",
            Self::Carpentry => "carpentry",
            Self::Cleaning => "cleaning",
            Self::Appliance => "appliance",
            Self::Internet => "internet",
            Self::PestControl => "pest_control",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum MaintenanceStatus {
    #[default]
    Pending,
    Acknowledged,
    InProgress,
    WaitingParts,
    Completed,
    Cancelled,
    Rejected,
}

impl MaintenanceStatus {
    pub const ALL: [MaintenanceStatus; 7] = [
        Self::Pending,
        Self::Acknowledged,
        Self::InProgress,
        Self::WaitingParts,
        Self::Completed,
        Self::Cancelled,
        Self::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Acknowledged => "acknowledged",
            Self::InProgress => "in_progress",
            Self::WaitingParts => "waiting_parts",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MaintenanceLocation {
    #[validate(length(max = 50))]
    pub building: Option<String>,
    pub floor: Option<i32>,
    #[validate(length(min = 1, max = 20))]
    pub room_number: String,
    #[validate(length(max = 200))]
    pub specific_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRating {
    pub score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub rated_at: i64,
}

/// Maintenance request entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MaintenanceRequest {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: MaintenanceCategory,
    pub priority: Priority,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub location: MaintenanceLocation,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub photos: Vec<FileRef>,
    pub status: MaintenanceStatus,
    pub assigned_to: Option<i64>,
    pub assigned_at: Option<i64>,
    pub expected_completion_date: Option<i64>,
    pub actual_completion_date: Option<i64>,
    pub resolution_notes: Option<String>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub rating: Option<MaintenanceRating>,
    pub requested_by: i64,
    pub is_emergency: bool,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub status_history: Vec<StatusChange<MaintenanceStatus>>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create maintenance request payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MaintenanceCreate {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(min = 5, max = 2000))]
    pub description: String,
    pub category: MaintenanceCategory,
    #[serde(default)]
    pub priority: Priority,
    #[validate(nested)]
    pub location: MaintenanceLocation,
    #[serde(default)]
    #[validate(nested)]
    pub photos: Vec<FileRef>,
    #[serde(default)]
    pub is_emergency: bool,
}

impl MaintenanceRequest {
    /// New request, history seeded with `pending` by the requester.
    /// Emergencies are always urgent.
    pub fn new(id: i64, input: MaintenanceCreate, requested_by: i64, now: i64) -> Self {
        let priority = if input.is_emergency {
            Priority::Urgent
        } else {
            input.priority
        };

        Self {
            id,
            title: input.title,
            description: input.description,
            category: input.category,
            priority,
            location: input.location,
            photos: input.photos,
            status: MaintenanceStatus::Pending,
            assigned_to: None,
            assigned_at: None,
            expected_completion_date: None,
            actual_completion_date: None,
            resolution_notes: None,
            rating: None,
            requested_by,
            is_emergency: input.is_emergency,
            estimated_cost: None,
            actual_cost: None,
            status_history: vec![StatusChange::new(
                MaintenanceStatus::Pending,
                requested_by,
                None,
                now,
            )],
            created_at: now,
            updated_at: now,
        }
    }

    fn ensure_open(&self) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::MaintenanceInvalidTransition,
                format!("Request is already {}", self.status.as_str()),
            ));
        }
        Ok(())
    }

    /// Staff status change. `completed` stamps the completion date and keeps
    /// the notes as resolution notes.
    pub fn update_status(
        &mut self,
        new_status: MaintenanceStatus,
        actor: i64,
        notes: Option<String>,
        now: i64,
    ) -> AppResult<()> {
        self.ensure_open()?;
        if new_status == MaintenanceStatus::Cancelled {
            return Err(AppError::with_message(
                ErrorCode::MaintenanceInvalidTransition,
                "Only the requester can cancel a request",
            ));
        }

        if new_status == MaintenanceStatus::Completed {
            self.actual_completion_date = Some(now);
            if notes.is_some() {
                self.resolution_notes = notes.clone();
            }
        }
        self.record_status(new_status, actor, notes, now);
        Ok(())
    }

    /// Assign to a staff member; a pending request is acknowledged on the way
    pub fn assign(
        &mut self,
        staff_id: i64,
        expected_completion_date: Option<i64>,
        actor: i64,
        now: i64,
    ) -> AppResult<()> {
        self.ensure_open()?;
        self.assigned_to = Some(staff_id);
        self.assigned_at = Some(now);
        if expected_completion_date.is_some() {
            self.expected_completion_date = expected_completion_date;
        }
        if self.status == MaintenanceStatus::Pending {
            self.record_status(
                MaintenanceStatus::Acknowledged,
                actor,
                Some("Assigned to staff".to_string()),
                now,
            );
        } else {
            self.updated_at = now;
        }
        Ok(())
    }

    pub fn submit_rating(&mut self, input: MaintenanceRatingInput, now: i64) -> AppResult<()> {
        if self.status != MaintenanceStatus::Completed {
            return Err(AppError::new(ErrorCode::MaintenanceNotCompleted));
        }
        self.rating = Some(MaintenanceRating {
            score: input.score,
            feedback: input.feedback,
            rated_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Requester withdraws a request that nobody has picked up yet
    pub fn cancel_by_requester(
        &mut self,
        actor: i64,
        reason: Option<String>,
        now: i64,
    ) -> AppResult<()> {
        if self.status != MaintenanceStatus::Pending {
            return Err(AppError::with_message(
                ErrorCode::MaintenanceInvalidTransition,
                "Only pending requests can be cancelled",
            ));
        }
        self.record_status(MaintenanceStatus::Cancelled, actor, reason, now);
        Ok(())
    }

    pub fn update_costs(&mut self, input: MaintenanceCostUpdate, now: i64) {
        if input.estimated_cost.is_some() {
            self.estimated_cost = input.estimated_cost;
        }
        if input.actual_cost.is_some() {
            self.actual_cost = input.actual_cost;
        }
        self.updated_at = now;
    }

    /// Hours from submission to completion
    pub fn resolution_hours(&self) -> Option<f64> {
        self.actual_completion_date
            .map(|done| (done - self.created_at) as f64 / 3_600_000.0)
    }

    fn record_status(
        &mut self,
        status: MaintenanceStatus,
        actor: i64,
        notes: Option<String>,
        now: i64,
    ) {
        self.status = status;
        self.status_history
            .push(StatusChange::new(status, actor, notes, now));
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MaintenanceStatusUpdate {
    pub status: MaintenanceStatus,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceAssign {
    pub assigned_to: i64,
    pub expected_completion_date: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MaintenanceCostUpdate {
    #[validate(range(min = 0.0))]
    pub estimated_cost: Option<f64>,
    #[validate(range(min = 0.0))]
    pub actual_cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MaintenanceRatingInput {
    #[validate(range(min = 1, max = 5))]
    pub score: i32,
    #[validate(length(max = 1000))]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MaintenanceCancel {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Maintenance aggregates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceStats {
    pub total_requests: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
    pub emergency_open: i64,
    pub average_rating: Option<f64>,
    pub average_resolution_hours: Option<f64>,
}

impl MaintenanceStats {
    /// Empty stats with every bucket present
    pub fn zeroed() -> Self {
        Self {
            by_status: MaintenanceStatus::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect(),
            by_category: MaintenanceCategory::ALL
                .iter()
                .map(|c| (c.as_str().to_string(), 0))
                .collect(),
            by_priority: Priority::ALL
                .iter()
                .map(|p| (p.as_str().to_string(), 0))
                .collect(),
            ..Default::default()
        }
    }
}
