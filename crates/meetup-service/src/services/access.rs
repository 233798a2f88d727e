//! Host and membership checks shared by the services.

use crate::errors::MeetupError;
use crate::models::{MeetingRow, ParticipantStatus};
use crate::repositories::ParticipantsRepository;
use common::types::UserId;
use sqlx::PgExecutor;
use uuid::Uuid;

/// `Forbidden` unless `caller` hosts `meeting`.
pub fn ensure_host(meeting: &MeetingRow, caller: UserId) -> Result<(), MeetupError> {
    if meeting.is_hosted_by(caller) {
        Ok(())
    } else {
        Err(MeetupError::Forbidden(
            "Only the meeting host can perform this action".to_string(),
        ))
    }
}

/// Whether `user_id` currently holds an APPROVED record on the meeting.
pub async fn is_approved_member<'e, E>(
    executor: E,
    meeting_id: Uuid,
    user_id: UserId,
) -> Result<bool, MeetupError>
where
    E: PgExecutor<'e>,
{
    let record =
        ParticipantsRepository::find_by_meeting_and_user(executor, meeting_id, user_id.0).await?;
    Ok(match record {
        Some(row) => row.status()? == ParticipantStatus::Approved,
        None => false,
    })
}

/// `Forbidden` unless `caller` is the host or an APPROVED participant.
pub async fn ensure_host_or_member<'e, E>(
    executor: E,
    meeting_id: Uuid,
    host_id: Uuid,
    caller: UserId,
) -> Result<(), MeetupError>
where
    E: PgExecutor<'e>,
{
    if host_id == caller.0 || is_approved_member(executor, meeting_id, caller).await? {
        return Ok(());
    }
    Err(MeetupError::Forbidden(
        "Only the host or approved participants can do this".to_string(),
    ))
}
