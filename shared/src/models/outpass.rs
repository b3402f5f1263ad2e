//! Outpass (leave) Request Model
//!
//! 出入时间以宿舍所在时区的本地日期 + HH:MM 保存；所有时间比较都在本地时间上进行。

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult, ErrorCode};

use super::common::{FileRef, StatusChange, combine, validate_clock, validate_phone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum OutpassType {
    Home,
    Local,
    Medical,
    Emergency,
    Other,
}

impl OutpassType {
    pub const ALL: [OutpassType; 5] = [
        Self::Home,
        Self::Local,
        Self::Medical,
        Self::Emergency,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Local => "local",
            Self::Medical => "medical",
            Self::Emergency => "emergency",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum TransportMode {
    Bus,
    Train,
    Car,
    Bike,
    Walk,
    Flight,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum OutpassStatus {
    #[default]
    Pending,
    UnderReview,
    Approved,
    Rejected,
    CheckedOut,
    Overdue,
    Returned,
    Cancelled,
}

impl OutpassStatus {
    pub const ALL: [OutpassStatus; 8] = [
        Self::Pending,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
        Self::CheckedOut,
        Self::Overdue,
        Self::Returned,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::CheckedOut => "checked_out",
            Self::Overdue => "overdue",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Returned | Self::Cancelled)
    }

    pub fn is_reviewable(&self) -> bool {
        matches!(self, Self::Pending | Self::UnderReview)
    }

    /// Student is physically outside the hostel
    pub fn is_out(&self) -> bool {
        matches!(self, Self::CheckedOut | Self::Overdue)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutpassDuration {
    pub days: i64,
    pub hours: i64,
}

impl OutpassDuration {
    /// Split whole hours between two instants; negative spans clamp to zero
    pub fn between(out_at: NaiveDateTime, in_at: NaiveDateTime) -> Self {
        let total_hours = (in_at - out_at).num_hours().max(0);
        Self {
            days: total_hours / 24,
            hours: total_hours % 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmergencyContact {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1, max = 50))]
    pub relation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentContactMethod {
    Call,
    Sms,
    Email,
    InPerson,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentApproval {
    pub is_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    /// Name of the parent/guardian who answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_method: Option<ParentContactMethod>,
}

/// Outpass request entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OutpassRequest {
    pub id: i64,
    pub reason: String,
    pub outpass_type: OutpassType,
    pub out_date: NaiveDate,
    /// HH:MM
    pub out_time: String,
    pub in_date: NaiveDate,
    /// HH:MM
    pub in_time: String,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub duration: OutpassDuration,
    pub destination: String,
    pub contact_number: String,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub emergency_contact: EmergencyContact,
    pub transport_mode: TransportMode,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub parent_approval: ParentApproval,
    pub status: OutpassStatus,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<i64>,
    pub review_notes: Option<String>,
    pub actual_out_time: Option<i64>,
    pub actual_in_time: Option<i64>,
    pub checked_out_by: Option<i64>,
    pub checked_in_by: Option<i64>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub status_history: Vec<StatusChange<OutpassStatus>>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub documents: Vec<FileRef>,
    pub rules_acknowledged: bool,
    pub requested_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

fn must_be_true(value: &bool) -> Result<(), ValidationError> {
    if *value {
        Ok(())
    } else {
        Err(ValidationError::new("rules_not_acknowledged")
            .with_message("hostel rules must be acknowledged".into()))
    }
}

/// Create outpass payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutpassCreate {
    #[validate(length(min = 5, max = 500))]
    pub reason: String,
    pub outpass_type: OutpassType,
    pub out_date: NaiveDate,
    #[validate(custom(function = "validate_clock"))]
    pub out_time: String,
    pub in_date: NaiveDate,
    #[validate(custom(function = "validate_clock"))]
    pub in_time: String,
    #[validate(length(min = 1, max = 300))]
    pub destination: String,
    #[validate(custom(function = "validate_phone"))]
    pub contact_number: String,
    #[validate(nested)]
    pub emergency_contact: EmergencyContact,
    pub transport_mode: TransportMode,
    /// Defaults to required for home visits
    pub parent_approval_required: Option<bool>,
    #[serde(default)]
    #[validate(nested)]
    pub documents: Vec<FileRef>,
    #[validate(custom(function = "must_be_true"))]
    pub rules_acknowledged: bool,
}

impl OutpassRequest {
    /// New request; the return instant must be strictly after departure.
    pub fn new(id: i64, input: OutpassCreate, requested_by: i64, now: i64) -> AppResult<Self> {
        let out_at = combine(input.out_date, &input.out_time)
            .ok_or_else(|| AppError::validation("out_time must be HH:MM"))?;
        let in_at = combine(input.in_date, &input.in_time)
            .ok_or_else(|| AppError::validation("in_time must be HH:MM"))?;
        if in_at <= out_at {
            return Err(AppError::validation("return time must be after departure time")
                .with_detail("field", "in_date"));
        }
        if !input.rules_acknowledged {
            return Err(AppError::validation("hostel rules must be acknowledged")
                .with_detail("field", "rules_acknowledged"));
        }

        let is_required = input
            .parent_approval_required
            .unwrap_or(input.outpass_type == OutpassType::Home);

        let mut request = Self {
            id,
            reason: input.reason,
            outpass_type: input.outpass_type,
            out_date: input.out_date,
            out_time: input.out_time,
            in_date: input.in_date,
            in_time: input.in_time,
            duration: OutpassDuration::default(),
            destination: input.destination,
            contact_number: input.contact_number,
            emergency_contact: input.emergency_contact,
            transport_mode: input.transport_mode,
            parent_approval: ParentApproval {
                is_required,
                ..Default::default()
            },
            status: OutpassStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            actual_out_time: None,
            actual_in_time: None,
            checked_out_by: None,
            checked_in_by: None,
            status_history: vec![StatusChange::new(
                OutpassStatus::Pending,
                requested_by,
                None,
                now,
            )],
            documents: input.documents,
            rules_acknowledged: input.rules_acknowledged,
            requested_by,
            created_at: now,
            updated_at: now,
        };
        request.recompute_duration();
        Ok(request)
    }

    /// Local departure instant
    pub fn scheduled_out(&self) -> Option<NaiveDateTime> {
        combine(self.out_date, &self.out_time)
    }

    /// Local return instant (in_date + in_time)
    pub fn scheduled_return(&self) -> Option<NaiveDateTime> {
        combine(self.in_date, &self.in_time)
    }

    /// Recompute days/hours from the four date/time fields; runs before every persist
    pub fn recompute_duration(&mut self) {
        self.duration = match (self.scheduled_out(), self.scheduled_return()) {
            (Some(out_at), Some(in_at)) => OutpassDuration::between(out_at, in_at),
            _ => OutpassDuration::default(),
        };
    }

    /// True iff checked out and the scheduled return has passed
    pub fn is_overdue_at(&self, now_local: NaiveDateTime) -> bool {
        self.status == OutpassStatus::CheckedOut
            && self
                .scheduled_return()
                .is_some_and(|due| now_local > due)
    }

    /// Generic transition; stamps the review / gate fields that belong to `new_status`
    pub fn update_status(
        &mut self,
        new_status: OutpassStatus,
        actor: i64,
        notes: Option<String>,
        location: Option<String>,
        now: i64,
    ) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::OutpassInvalidTransition,
                format!("Outpass is already {}", self.status.as_str()),
            ));
        }

        match new_status {
            OutpassStatus::Approved | OutpassStatus::Rejected => {
                self.reviewed_by = Some(actor);
                self.reviewed_at = Some(now);
                self.review_notes = notes.clone();
            }
            OutpassStatus::CheckedOut => {
                self.actual_out_time = Some(now);
                self.checked_out_by = Some(actor);
            }
            OutpassStatus::Returned => {
                self.actual_in_time = Some(now);
                self.checked_in_by = Some(actor);
            }
            _ => {}
        }

        self.status = new_status;
        self.status_history
            .push(StatusChange::new(new_status, actor, notes, now).with_location(location));
        self.updated_at = now;
        Ok(())
    }

    fn require(&self, allowed: &[OutpassStatus], action: &str) -> AppResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(AppError::with_message(
                ErrorCode::OutpassInvalidTransition,
                format!("Cannot {action} an outpass that is {}", self.status.as_str()),
            ))
        }
    }

    pub fn mark_under_review(&mut self, actor: i64, now: i64) -> AppResult<()> {
        self.require(&[OutpassStatus::Pending], "start reviewing")?;
        self.update_status(OutpassStatus::UnderReview, actor, None, None, now)
    }

    /// Approve or reject; only from pending / under_review
    pub fn review(
        &mut self,
        approve: bool,
        actor: i64,
        notes: Option<String>,
        now: i64,
    ) -> AppResult<()> {
        if !self.status.is_reviewable() {
            return Err(AppError::with_message(
                ErrorCode::OutpassReviewClosed,
                format!("Outpass is already {}", self.status.as_str()),
            ));
        }
        let status = if approve {
            OutpassStatus::Approved
        } else {
            OutpassStatus::Rejected
        };
        self.update_status(status, actor, notes, None, now)
    }

    pub fn record_parent_approval(
        &mut self,
        input: ParentApprovalInput,
        now: i64,
    ) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::OutpassInvalidTransition,
                format!("Outpass is already {}", self.status.as_str()),
            ));
        }
        self.parent_approval = ParentApproval {
            is_required: self.parent_approval.is_required,
            approved: Some(input.approved),
            approved_by: input.approved_by,
            approved_at: Some(now),
            contact_method: input.contact_method,
        };
        self.updated_at = now;
        Ok(())
    }

    pub fn check_out(&mut self, actor: i64, location: Option<String>, now: i64) -> AppResult<()> {
        self.require(&[OutpassStatus::Approved], "check out")?;
        self.update_status(OutpassStatus::CheckedOut, actor, None, location, now)
    }

    pub fn check_in(&mut self, actor: i64, location: Option<String>, now: i64) -> AppResult<()> {
        self.require(&[OutpassStatus::CheckedOut, OutpassStatus::Overdue], "check in")?;
        self.update_status(OutpassStatus::Returned, actor, None, location, now)
    }

    pub fn cancel_by_requester(&mut self, actor: i64, now: i64) -> AppResult<()> {
        self.require(&[OutpassStatus::Pending], "cancel")?;
        self.update_status(
            OutpassStatus::Cancelled,
            actor,
            Some("Cancelled by student".to_string()),
            None,
            now,
        )
    }

    /// Apply the overdue predicate; returns whether the record changed
    pub fn check_overdue_status(
        &mut self,
        now_local: NaiveDateTime,
        actor: i64,
        now: i64,
    ) -> AppResult<bool> {
        if !self.is_overdue_at(now_local) {
            return Ok(false);
        }
        self.update_status(
            OutpassStatus::Overdue,
            actor,
            Some("Return time exceeded".to_string()),
            None,
            now,
        )?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutpassReview {
    pub approve: bool,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ParentApprovalInput {
    pub approved: bool,
    #[validate(length(max = 200))]
    pub approved_by: Option<String>,
    pub contact_method: Option<ParentContactMethod>,
}

/// Gate action payload (check-out / check-in)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct GateAction {
    #[validate(length(max = 200))]
    pub location: Option<String>,
}

/// Result of an overdue sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverdueCheckResult {
    pub checked: usize,
    pub marked_overdue: Vec<i64>,
}

/// Outpass aggregates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutpassStats {
    pub total_requests: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_type: BTreeMap<String, i64>,
    /// checked_out + overdue
    pub currently_out: i64,
    /// checked_out records past their return time right now
    pub overdue_now: i64,
}

impl OutpassStats {
    /// Empty stats with every bucket present
    pub fn zeroed() -> Self {
        Self {
            by_status: OutpassStatus::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect(),
            by_type: OutpassType::ALL
                .iter()
                .map(|t| (t.as_str().to_string(), 0))
                .collect(),
            ..Default::default()
        }
    }
}
