//! Announcement Model (公告 / 活动报名)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::error::{AppError, AppResult, ErrorCode};

use super::common::{FileRef, Priority};
use super::user::Role;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum AnnouncementCategory {
    #[default]
    General,
    Maintenance,
    Event,
    Emergency,
    Notice,
    Dining,
    Rules,
}

impl AnnouncementCategory {
    pub const ALL: [AnnouncementCategory; 7] = [
        Self::General,
        Self::Maintenance,
        Self::Event,
        Self::Emergency,
        Self::Notice,
        Self::Dining,
        Self::Rules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Maintenance => "maintenance",
            Self::Event => "event",
            Self::Emergency => "emergency",
            Self::Notice => "notice",
            Self::Dining => "dining",
            Self::Rules => "rules",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum TargetAudience {
    #[default]
    All,
    Students,
    Staff,
    SpecificRooms,
    SpecificFloors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: i64,
    pub registered_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub user_id: i64,
    pub read_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EventDetails {
    pub start_date: i64,
    pub end_date: i64,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(range(min = 1))]
    pub max_participants: Option<i32>,
    #[serde(default)]
    pub registration_required: bool,
    #[serde(default)]
    pub registered_participants: Vec<Participant>,
}

/// Who is looking at the announcement board
#[derive(Debug, Clone)]
pub struct Audience<'a> {
    pub user_id: i64,
    pub role: Role,
    pub room_number: Option<&'a str>,
    pub floor: Option<i32>,
}

/// Announcement entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: AnnouncementCategory,
    pub priority: Priority,
    pub target_audience: TargetAudience,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub target_rooms: Vec<String>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub target_floors: Vec<i32>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub attachments: Vec<FileRef>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub event_details: Option<EventDetails>,
    pub is_active: bool,
    pub expires_at: i64,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub read_by: Vec<ReadReceipt>,
    pub views: i64,
    pub is_pinned: bool,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub tags: Vec<String>,
    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create announcement payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnnouncementCreate {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    #[serde(default)]
    pub category: AnnouncementCategory,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub target_rooms: Vec<String>,
    #[serde(default)]
    pub target_floors: Vec<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<FileRef>,
    #[validate(nested)]
    pub event_details: Option<EventDetails>,
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Default lifetime by category when `expires_at` is not supplied
pub fn default_expiry(
    category: AnnouncementCategory,
    event: Option<&EventDetails>,
    now: i64,
) -> i64 {
    match (category, event) {
        (AnnouncementCategory::Emergency, _) => now + 24 * HOUR_MS,
        (AnnouncementCategory::Event, Some(details)) => details.end_date,
        (AnnouncementCategory::Notice, _) => now + 30 * DAY_MS,
        _ => now + 7 * DAY_MS,
    }
}

fn check_targeting(
    audience: TargetAudience,
    rooms: &[String],
    floors: &[i32],
) -> AppResult<()> {
    match audience {
        TargetAudience::SpecificRooms if rooms.is_empty() => Err(AppError::validation(
            "target_rooms must not be empty for specific_rooms",
        )),
        TargetAudience::SpecificFloors if floors.is_empty() => Err(AppError::validation(
            "target_floors must not be empty for specific_floors",
        )),
        _ => Ok(()),
    }
}

impl Announcement {
    pub fn new(id: i64, input: AnnouncementCreate, created_by: i64, now: i64) -> AppResult<Self> {
        if input.category == AnnouncementCategory::Event && input.event_details.is_none() {
            return Err(AppError::validation("event announcements need event_details")
                .with_detail("field", "event_details"));
        }
        if let Some(event) = &input.event_details
            && event.end_date < event.start_date
        {
            return Err(AppError::validation("event end_date is before start_date")
                .with_detail("field", "event_details.end_date"));
        }
        check_targeting(input.target_audience, &input.target_rooms, &input.target_floors)?;

        let priority = if input.category == AnnouncementCategory::Emergency {
            Priority::Urgent
        } else {
            input.priority
        };
        let expires_at = input.expires_at.unwrap_or_else(|| {
            default_expiry(input.category, input.event_details.as_ref(), now)
        });

        // registrations are server-owned
        let event_details = input.event_details.map(|mut e| {
            e.registered_participants.clear();
            e
        });

        Ok(Self {
            id,
            title: input.title,
            content: input.content,
            category: input.category,
            priority,
            target_audience: input.target_audience,
            target_rooms: input.target_rooms,
            target_floors: input.target_floors,
            attachments: input.attachments,
            event_details,
            is_active: true,
            expires_at,
            read_by: Vec::new(),
            views: 0,
            is_pinned: input.is_pinned,
            tags: input.tags,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    pub fn has_read(&self, user_id: i64) -> bool {
        self.read_by.iter().any(|r| r.user_id == user_id)
    }

    /// Record a read receipt; views grow once per distinct reader.
    /// Returns whether this reader is new.
    pub fn mark_read(&mut self, user_id: i64, now: i64) -> bool {
        if self.has_read(user_id) {
            return false;
        }
        self.read_by.push(ReadReceipt {
            user_id,
            read_at: now,
        });
        self.views += 1;
        true
    }

    /// Active, not expired and aimed at this reader
    pub fn is_visible_to(&self, audience: &Audience<'_>, now: i64) -> bool {
        if !self.is_active || self.is_expired(now) {
            return false;
        }
        match self.target_audience {
            TargetAudience::All => true,
            TargetAudience::Students => audience.role.is_student(),
            TargetAudience::Staff => !audience.role.is_student(),
            TargetAudience::SpecificRooms => audience
                .room_number
                .is_some_and(|room| self.target_rooms.iter().any(|r| r == room)),
            TargetAudience::SpecificFloors => audience
                .floor
                .is_some_and(|floor| self.target_floors.contains(&floor)),
        }
    }

    fn event_mut(&mut self) -> AppResult<&mut EventDetails> {
        if self.category != AnnouncementCategory::Event {
            return Err(AppError::new(ErrorCode::NotAnEvent));
        }
        self.event_details
            .as_mut()
            .ok_or_else(|| AppError::new(ErrorCode::NotAnEvent))
    }

    pub fn register_for_event(&mut self, user_id: i64, now: i64) -> AppResult<()> {
        let event = self.event_mut()?;
        if event
            .registered_participants
            .iter()
            .any(|p| p.user_id == user_id)
        {
            return Err(AppError::new(ErrorCode::AlreadyRegistered));
        }
        if let Some(max) = event.max_participants
            && event.registered_participants.len() >= max as usize
        {
            return Err(AppError::new(ErrorCode::EventFull)
                .with_detail("max_participants", max));
        }
        event.registered_participants.push(Participant {
            user_id,
            registered_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn unregister_from_event(&mut self, user_id: i64, now: i64) -> AppResult<()> {
        let event = self.event_mut()?;
        let before = event.registered_participants.len();
        event.registered_participants.retain(|p| p.user_id != user_id);
        if event.registered_participants.len() == before {
            return Err(AppError::new(ErrorCode::NotRegistered));
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn apply_update(&mut self, update: AnnouncementUpdate, now: i64) -> AppResult<()> {
        if let Some(v) = update.title {
            self.title = v;
        }
        if let Some(v) = update.content {
            self.content = v;
        }
        if let Some(v) = update.priority {
            self.priority = v;
        }
        if let Some(v) = update.target_audience {
            self.target_audience = v;
        }
        if let Some(v) = update.target_rooms {
            self.target_rooms = v;
        }
        if let Some(v) = update.target_floors {
            self.target_floors = v;
        }
        if let Some(v) = update.attachments {
            self.attachments = v;
        }
        if let Some(v) = update.expires_at {
            self.expires_at = v;
        }
        if let Some(v) = update.is_active {
            self.is_active = v;
        }
        if let Some(v) = update.tags {
            self.tags = v;
        }
        check_targeting(self.target_audience, &self.target_rooms, &self.target_floors)?;
        if self.category == AnnouncementCategory::Emergency {
            self.priority = Priority::Urgent;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Update announcement payload (category and event details are fixed)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AnnouncementUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10000))]
    pub content: Option<String>,
    pub priority: Option<Priority>,
    pub target_audience: Option<TargetAudience>,
    pub target_rooms: Option<Vec<String>>,
    pub target_floors: Option<Vec<i32>>,
    #[validate(nested)]
    pub attachments: Option<Vec<FileRef>>,
    pub expires_at: Option<i64>,
    pub is_active: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinRequest {
    pub is_pinned: bool,
}

/// Board entry for the current reader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementView {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub is_read: bool,
    pub is_registered: bool,
}

impl AnnouncementView {
    pub fn for_user(announcement: Announcement, user_id: i64) -> Self {
        let is_registered = announcement.event_details.as_ref().is_some_and(|e| {
            e.registered_participants
                .iter()
                .any(|p| p.user_id == user_id)
        });
        Self {
            is_read: announcement.has_read(user_id),
            is_registered,
            announcement,
        }
    }
}

/// Announcement aggregates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnouncementStats {
    pub total: i64,
    pub active: i64,
    pub pinned: i64,
    pub by_category: BTreeMap<String, i64>,
    pub total_views: i64,
    pub upcoming_events: i64,
}

impl AnnouncementStats {
    pub fn zeroed() -> Self {
        Self {
            by_category: AnnouncementCategory::ALL
                .iter()
                .map(|c| (c.as_str().to_string(), 0))
                .collect(),
            ..Default::default()
        }
    }
}
