//! Activities, attendance responses and calendar projections.

use super::{unknown_status, validate_text, AttendanceStatus};
use crate::errors::MeetupError;
use chrono::{DateTime, Utc};
use common::types::{ActivityId, MeetingId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum images attached to one activity.
pub const MAX_ACTIVITY_IMAGES: usize = 10;

const MAX_ACTIVITY_TITLE_CHARS: usize = 100;
const MAX_ACTIVITY_LOCATION_CHARS: usize = 255;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub activity_id: Uuid,
    pub meeting_id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: String,
    pub created_by: Uuid,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub activity_id: ActivityId,
    pub meeting_id: MeetingId,
    pub title: String,
    /// Start instant.
    pub date: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: String,
    pub created_by: UserId,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityRow> for ActivityResponse {
    fn from(row: ActivityRow) -> Self {
        Self {
            activity_id: ActivityId(row.activity_id),
            meeting_id: MeetingId(row.meeting_id),
            title: row.title,
            date: row.starts_at,
            end_time: row.ends_at,
            location: row.location,
            created_by: UserId(row.created_by),
            image_urls: row.image_urls,
            created_at: row.created_at,
        }
    }
}

/// Request body for `POST /api/v1/meetings/:id/activities`, also used for
/// schedule entries nested in a meeting create request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateActivityRequest {
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl CreateActivityRequest {
    pub fn validate(&self) -> Result<(), MeetupError> {
        validate_text("title", &self.title, 1, MAX_ACTIVITY_TITLE_CHARS)?;
        if let Some(location) = &self.location {
            validate_text("location", location, 0, MAX_ACTIVITY_LOCATION_CHARS)?;
        }
        if let Some(end_time) = self.end_time {
            if end_time <= self.date {
                return Err(MeetupError::BadRequest(
                    "end_time must be after date".to_string(),
                ));
            }
        }
        if self.image_urls.len() > MAX_ACTIVITY_IMAGES {
            return Err(MeetupError::BadRequest(format!(
                "At most {MAX_ACTIVITY_IMAGES} images are allowed"
            )));
        }
        if self.image_urls.iter().any(|url| url.trim().is_empty()) {
            return Err(MeetupError::BadRequest(
                "image_urls must not contain blank entries".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    pub attendance_id: Uuid,
    pub activity_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub attendance_id: Uuid,
    pub activity_id: ActivityId,
    pub user_id: UserId,
    pub status: AttendanceStatus,
    pub responded_at: DateTime<Utc>,
}

impl AttendanceRow {
    pub fn into_response(self) -> Result<AttendanceResponse, MeetupError> {
        let status = AttendanceStatus::from_db_str(&self.status)
            .ok_or_else(|| unknown_status("attendance", &self.status))?;
        Ok(AttendanceResponse {
            attendance_id: self.attendance_id,
            activity_id: ActivityId(self.activity_id),
            user_id: UserId(self.user_id),
            status,
            responded_at: self.responded_at,
        })
    }
}

/// Request body for `PUT /api/v1/activities/:id/attendance`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAttendanceRequest {
    pub status: AttendanceStatus,
    /// Skip conflict detection and write unconditionally.
    #[serde(default)]
    pub confirmed: bool,
}

/// An activity the user already attends that overlaps the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub activity_id: ActivityId,
    pub activity_title: String,
    pub meeting_id: MeetingId,
    pub meeting_title: String,
    pub start: DateTime<Utc>,
    /// Effective end used for the overlap test.
    pub end: DateTime<Utc>,
}

/// Result of an attendance update.
///
/// When `has_conflict` is true nothing was written and `attendance` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceOutcome {
    pub has_conflict: bool,
    pub conflicts: Vec<ScheduleConflict>,
    pub attendance: Option<AttendanceResponse>,
}

/// Activity joined with its meeting, used for access checks.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityContextRow {
    #[sqlx(flatten)]
    pub activity: ActivityRow,
    pub meeting_title: String,
    pub meeting_host_id: Uuid,
}

/// Another activity the user has marked ATTENDING.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendingActivityRow {
    pub activity_id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub meeting_id: Uuid,
    pub meeting_title: String,
}

/// Query string for `GET /api/v1/me/calendar`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarQuery {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CalendarEventRow {
    pub activity_id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: String,
    pub meeting_id: Uuid,
    pub meeting_title: String,
    pub meeting_category: String,
    pub meeting_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub activity_id: ActivityId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub location: String,
    pub meeting_id: MeetingId,
    pub meeting_title: String,
    pub meeting_category: String,
    pub meeting_image_url: Option<String>,
}

impl From<CalendarEventRow> for CalendarEvent {
    fn from(row: CalendarEventRow) -> Self {
        Self {
            activity_id: ActivityId(row.activity_id),
            title: row.title,
            start: row.starts_at,
            end: row.ends_at,
            location: row.location,
            meeting_id: MeetingId(row.meeting_id),
            meeting_title: row.meeting_title,
            meeting_category: row.meeting_category,
            meeting_image_url: row.meeting_image_url,
        }
    }
}
