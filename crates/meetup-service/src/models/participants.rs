//! Participant records and their API projections.

use super::{unknown_status, MeetingStatus, ParticipantStatus, UserSummary};
use crate::errors::MeetupError;
use chrono::{DateTime, Utc};
use common::types::{MeetingId, ParticipantId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum withdrawal reason length in characters.
pub const MAX_LEAVE_REASON_CHARS: usize = 500;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParticipantRow {
    pub participant_id: Uuid,
    pub meeting_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub leave_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParticipantRow {
    pub fn status(&self) -> Result<ParticipantStatus, MeetupError> {
        ParticipantStatus::from_db_str(&self.status)
            .ok_or_else(|| unknown_status("participant", &self.status))
    }

    pub fn into_response(self) -> Result<ParticipantResponse, MeetupError> {
        let status = self.status()?;
        Ok(ParticipantResponse {
            participant_id: ParticipantId(self.participant_id),
            meeting_id: MeetingId(self.meeting_id),
            user_id: UserId(self.user_id),
            status,
            leave_reason: self.leave_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub participant_id: ParticipantId,
    pub meeting_id: MeetingId,
    pub user_id: UserId,
    pub status: ParticipantStatus,
    pub leave_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Participant joined with the user's profile.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParticipantWithUserRow {
    #[sqlx(flatten)]
    pub participant: ParticipantRow,
    pub nickname: String,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantListItem {
    #[serde(flatten)]
    pub participant: ParticipantResponse,
    pub user: UserSummary,
}

impl ParticipantWithUserRow {
    pub fn into_item(self) -> Result<ParticipantListItem, MeetupError> {
        let user = UserSummary {
            user_id: self.participant.user_id,
            nickname: self.nickname,
            profile_image_url: self.profile_image_url,
        };
        Ok(ParticipantListItem {
            participant: self.participant.into_response()?,
            user,
        })
    }
}

/// The caller's own participant record joined with a meeting summary.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MyParticipationRow {
    #[sqlx(flatten)]
    pub participant: ParticipantRow,
    pub meeting_title: String,
    pub meeting_category: String,
    pub meeting_status: String,
    pub meeting_image_url: Option<String>,
    pub meeting_host_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub meeting_id: MeetingId,
    pub title: String,
    pub category: String,
    pub status: MeetingStatus,
    pub image_url: Option<String>,
    pub host_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyParticipationResponse {
    #[serde(flatten)]
    pub participant: ParticipantResponse,
    pub meeting: MeetingSummary,
}

impl MyParticipationRow {
    pub fn into_response(self) -> Result<MyParticipationResponse, MeetupError> {
        let status = MeetingStatus::from_db_str(&self.meeting_status)
            .ok_or_else(|| unknown_status("meeting", &self.meeting_status))?;
        let meeting = MeetingSummary {
            meeting_id: MeetingId(self.participant.meeting_id),
            title: self.meeting_title,
            category: self.meeting_category,
            status,
            image_url: self.meeting_image_url,
            host_id: UserId(self.meeting_host_id),
        };
        Ok(MyParticipationResponse {
            participant: self.participant.into_response()?,
            meeting,
        })
    }
}

/// Request body for `PATCH /api/v1/meetings/:id/participants/:participant_id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateParticipantStatusRequest {
    pub status: ParticipantStatus,
}

/// Request body for `POST /api/v1/meetings/:id/participants/withdraw`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WithdrawRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl WithdrawRequest {
    /// Trimmed reason, `None` when absent or blank.
    pub fn normalized_reason(&self) -> Result<Option<String>, MeetupError> {
        normalize_leave_reason(self.reason.as_deref())
    }
}

pub fn normalize_leave_reason(reason: Option<&str>) -> Result<Option<String>, MeetupError> {
    let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if reason.chars().count() > MAX_LEAVE_REASON_CHARS {
        return Err(MeetupError::BadRequest(format!(
            "reason must be at most {MAX_LEAVE_REASON_CHARS} characters"
        )));
    }
    Ok(Some(reason.to_string()))
}

/// Query string for participant listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantStatusQuery {
    #[serde(default)]
    pub status: Option<ParticipantStatus>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_leave_reason_normalization() {
        assert_eq!(normalize_leave_reason(None).unwrap(), None);
        assert_eq!(normalize_leave_reason(Some("   ")).unwrap(), None);
        assert_eq!(
            normalize_leave_reason(Some("  moving away ")).unwrap(),
            Some("moving away".to_string())
        );

        let at_limit = "x".repeat(MAX_LEAVE_REASON_CHARS);
        assert!(normalize_leave_reason(Some(&at_limit)).is_ok());

        let over_limit = "x".repeat(MAX_LEAVE_REASON_CHARS + 1);
        assert!(matches!(
            normalize_leave_reason(Some(&over_limit)),
            Err(MeetupError::BadRequest(_))
        ));
    }

    #[test]
    fn test_update_status_request_parses_uppercase() {
        let request: UpdateParticipantStatusRequest =
            serde_json::from_str(r#"{"status":"KICKED"}"#).unwrap();
        assert_eq!(request.status, ParticipantStatus::Kicked);
    }
}
