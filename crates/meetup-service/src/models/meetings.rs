//! Meeting request/response types and database rows.

use super::{unknown_status, validate_text, CreateActivityRequest, MeetingStatus, ParticipantStatus};
use crate::errors::MeetupError;
use chrono::{DateTime, Utc};
use common::types::{MeetingId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum meeting capacity.
pub const MIN_CAPACITY: i32 = 2;

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 100;

const MAX_CATEGORY_CHARS: usize = 50;
const MAX_LOCATION_CHARS: usize = 255;
const MAX_DESCRIPTION_CHARS: usize = 5000;

/// Maximum schedule entries accepted with a create request.
pub const MAX_INITIAL_SCHEDULES: usize = 20;

/// Database row for a live (not soft-deleted) meeting.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeetingRow {
    pub meeting_id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub image_url: Option<String>,
    pub capacity: i32,
    pub status: String,
    pub auto_approve: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MeetingRow {
    pub fn status(&self) -> Result<MeetingStatus, MeetupError> {
        MeetingStatus::from_db_str(&self.status).ok_or_else(|| unknown_status("meeting", &self.status))
    }

    pub fn id(&self) -> MeetingId {
        MeetingId(self.meeting_id)
    }

    pub fn host(&self) -> UserId {
        UserId(self.host_id)
    }

    pub fn is_hosted_by(&self, user_id: UserId) -> bool {
        self.host_id == user_id.0
    }

    /// Build the API representation.
    pub fn into_response(
        self,
        host: UserSummary,
        participant_count: i64,
    ) -> Result<MeetingResponse, MeetupError> {
        let status = self.status()?;
        Ok(MeetingResponse {
            meeting_id: MeetingId(self.meeting_id),
            title: self.title,
            description: self.description,
            category: self.category,
            location: self.location,
            image_url: self.image_url,
            capacity: self.capacity,
            status,
            auto_approve: self.auto_approve,
            view_count: self.view_count,
            participant_count,
            host,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Public profile fragment shown for hosts and participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub user_id: Uuid,
    pub nickname: String,
    pub profile_image_url: Option<String>,
}

/// Meeting as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingResponse {
    pub meeting_id: MeetingId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub image_url: Option<String>,
    pub capacity: i32,
    pub status: MeetingStatus,
    pub auto_approve: bool,
    pub view_count: i64,
    /// Number of APPROVED participants.
    pub participant_count: i64,
    pub host: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Meeting plus flags computed for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingDetailResponse {
    #[serde(flatten)]
    pub meeting: MeetingResponse,

    /// False for anonymous viewers.
    pub is_bookmarked: bool,

    /// The viewer's participant status, if they have a record.
    pub participant_status: Option<ParticipantStatus>,
}

/// Request body for `POST /api/v1/meetings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMeetingRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub capacity: i32,
    /// DRAFT or RECRUITING. Defaults to RECRUITING.
    #[serde(default)]
    pub status: Option<MeetingStatus>,
    #[serde(default)]
    pub auto_approve: bool,
    /// Initial schedule, created as activities owned by the host.
    #[serde(default)]
    pub schedules: Vec<CreateActivityRequest>,
}

impl CreateMeetingRequest {
    pub fn validate(&self) -> Result<(), MeetupError> {
        validate_text("title", &self.title, 1, MAX_TITLE_CHARS)?;
        validate_text("category", &self.category, 1, MAX_CATEGORY_CHARS)?;
        if let Some(description) = &self.description {
            validate_text("description", description, 0, MAX_DESCRIPTION_CHARS)?;
        }
        if let Some(location) = &self.location {
            validate_text("location", location, 0, MAX_LOCATION_CHARS)?;
        }
        validate_capacity(self.capacity)?;

        match self.status {
            None | Some(MeetingStatus::Draft) | Some(MeetingStatus::Recruiting) => {}
            Some(other) => {
                return Err(MeetupError::BadRequest(format!(
                    "A meeting cannot be created with status {other}"
                )));
            }
        }

        if self.schedules.len() > MAX_INITIAL_SCHEDULES {
            return Err(MeetupError::BadRequest(format!(
                "At most {MAX_INITIAL_SCHEDULES} schedule entries are allowed"
            )));
        }
        for schedule in &self.schedules {
            schedule.validate()?;
        }

        Ok(())
    }

    pub fn initial_status(&self) -> MeetingStatus {
        self.status.unwrap_or(MeetingStatus::Recruiting)
    }
}

/// Request body for `PATCH /api/v1/meetings/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMeetingRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub capacity: Option<i32>,
    #[serde(default)]
    pub auto_approve: Option<bool>,
    #[serde(default)]
    pub status: Option<MeetingStatus>,
}

impl UpdateMeetingRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.location.is_none()
            && self.image_url.is_none()
            && self.capacity.is_none()
            && self.auto_approve.is_none()
            && self.status.is_none()
    }

    pub fn validate(&self) -> Result<(), MeetupError> {
        if self.is_empty() {
            return Err(MeetupError::BadRequest(
                "At least one field must be provided".to_string(),
            ));
        }
        if let Some(title) = &self.title {
            validate_text("title", title, 1, MAX_TITLE_CHARS)?;
        }
        if let Some(category) = &self.category {
            validate_text("category", category, 1, MAX_CATEGORY_CHARS)?;
        }
        if let Some(description) = &self.description {
            validate_text("description", description, 0, MAX_DESCRIPTION_CHARS)?;
        }
        if let Some(location) = &self.location {
            validate_text("location", location, 0, MAX_LOCATION_CHARS)?;
        }
        if let Some(capacity) = self.capacity {
            validate_capacity(capacity)?;
        }
        if self.status == Some(MeetingStatus::Cancelled) {
            return Err(MeetupError::BadRequest(
                "Use the cancel operation to cancel a meeting".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_capacity(capacity: i32) -> Result<(), MeetupError> {
    if capacity < MIN_CAPACITY {
        return Err(MeetupError::BadRequest(format!(
            "capacity must be at least {MIN_CAPACITY}"
        )));
    }
    Ok(())
}

/// Response for `POST /api/v1/meetings/:id/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelMeetingResponse {
    pub meeting_id: MeetingId,
    pub status: MeetingStatus,
    /// Number of approved participants a cancellation notice was queued for.
    pub notified_participants: usize,
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn create_request() -> CreateMeetingRequest {
        serde_json::from_value(serde_json::json!({
            "title": "Sunday hike",
            "category": "outdoors",
            "capacity": 4
        }))
        .unwrap()
    }

    #[test]
    fn test_create_request_defaults() {
        let request = create_request();
        assert!(request.validate().is_ok());
        assert_eq!(request.initial_status(), MeetingStatus::Recruiting);
        assert!(!request.auto_approve);
        assert!(request.schedules.is_empty());
    }

    #[test]
    fn test_create_request_rejects_small_capacity() {
        let mut request = create_request();
        request.capacity = 1;
        assert!(matches!(request.validate(), Err(MeetupError::BadRequest(_))));
    }

    #[test]
    fn test_create_request_rejects_non_initial_status() {
        let mut request = create_request();
        request.status = Some(MeetingStatus::Ongoing);
        assert!(request.validate().is_err());

        request.status = Some(MeetingStatus::Draft);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_long_title() {
        let mut request = create_request();
        request.title = "a".repeat(101);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_request_rejects_unknown_fields() {
        let result = serde_json::from_value::<CreateMeetingRequest>(serde_json::json!({
            "title": "Sunday hike",
            "category": "outdoors",
            "capacity": 4,
            "host_id": "00000000-0000-0000-0000-000000000001"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_update_request_validation() {
        assert!(UpdateMeetingRequest::default().validate().is_err());

        let request = UpdateMeetingRequest {
            status: Some(MeetingStatus::Cancelled),
            ..Default::default()
        };
        assert!(request.validate().is_err());

        let request = UpdateMeetingRequest {
            capacity: Some(10),
            auto_approve: Some(true),
            ..Default::default()
        };
        assert!(request.validate().is_ok());
    }
}
