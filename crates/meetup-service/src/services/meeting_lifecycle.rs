//! Meeting lifecycle service.
//!
//! Creation, update, cancellation with participant fan-out, soft deletion and
//! the public detail view. Writes lock the meeting row the same way the
//! participation service does, so a capacity change or cancellation cannot
//! interleave with an admission.

use crate::errors::MeetupError;
use crate::models::{
    CancelMeetingResponse, CreateMeetingRequest, MeetingDetailResponse, MeetingResponse,
    MeetingRow, MeetingStatus, UpdateMeetingRequest,
};
use crate::repositories::{
    ActivitiesRepository, MeetingsRepository, NewMeeting, NotificationOutboxRepository,
    ParticipantsRepository, UsersRepository,
};
use crate::services::access::ensure_host;
use crate::services::capacity_guard::CapacityGuard;
use crate::services::notices::cancellation_notice;
use common::types::UserId;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct MeetingLifecycleService;

impl MeetingLifecycleService {
    /// Create a meeting and its initial schedule in one transaction.
    ///
    /// Schedule entries become activities owned by the host.
    #[instrument(skip_all, name = "meetup.service.create_meeting", fields(host_id = %host_id))]
    pub async fn create(
        pool: &PgPool,
        host_id: UserId,
        request: &CreateMeetingRequest,
    ) -> Result<MeetingResponse, MeetupError> {
        request.validate()?;

        let mut tx = pool.begin().await?;

        let host = UsersRepository::find_summary(&mut *tx, host_id.0)
            .await?
            .ok_or_else(|| MeetupError::NotFound("User not found".to_string()))?;

        let new_meeting = NewMeeting {
            host_id: host_id.0,
            title: request.title.trim(),
            description: request.description.as_deref().map(str::trim).unwrap_or_default(),
            category: request.category.trim(),
            location: request.location.as_deref().map(str::trim).unwrap_or_default(),
            image_url: request.image_url.as_deref(),
            capacity: request.capacity,
            status: request.initial_status(),
            auto_approve: request.auto_approve,
        };
        let row = MeetingsRepository::insert(&mut tx, &new_meeting).await?;

        for schedule in &request.schedules {
            ActivitiesRepository::insert(&mut *tx, row.meeting_id, host_id.0, schedule).await?;
        }

        tx.commit().await?;

        info!(
            target: "meetup.services.meetings",
            meeting_id = %row.meeting_id,
            host_id = %host_id,
            schedules = request.schedules.len(),
            "Meeting created"
        );

        row.into_response(host, 0)
    }

    /// Patch a meeting. Host only; a CANCELLED meeting cannot be edited.
    ///
    /// Lowering capacity below the current APPROVED count fails with
    /// `InvalidState`.
    #[instrument(skip_all, name = "meetup.service.update_meeting", fields(meeting_id = %meeting_id))]
    pub async fn update(
        pool: &PgPool,
        meeting_id: Uuid,
        caller: UserId,
        patch: &UpdateMeetingRequest,
    ) -> Result<MeetingResponse, MeetupError> {
        patch.validate()?;

        let mut tx = pool.begin().await?;
        let meeting = CapacityGuard::lock(&mut tx, meeting_id).await?;
        ensure_host(meeting.row(), caller)?;

        if meeting.status() == MeetingStatus::Cancelled {
            return Err(MeetupError::InvalidState(
                "A cancelled meeting cannot be edited".to_string(),
            ));
        }

        let approved = CapacityGuard::approved_count(&mut tx, &meeting).await?;
        if let Some(capacity) = patch.capacity {
            if i64::from(capacity) < approved {
                return Err(MeetupError::InvalidState(format!(
                    "Capacity cannot be lower than the {approved} approved participants"
                )));
            }
        }

        let row = MeetingsRepository::update_fields(&mut tx, meeting_id, patch).await?;
        let response = with_host(&mut tx, row, approved).await?;
        tx.commit().await?;

        info!(
            target: "meetup.services.meetings",
            meeting_id = %meeting_id,
            "Meeting updated"
        );

        Ok(response)
    }

    /// Cancel a meeting and notify every APPROVED participant.
    ///
    /// The status write and the whole notification fan-out commit together.
    #[instrument(skip_all, name = "meetup.service.cancel_meeting", fields(meeting_id = %meeting_id))]
    pub async fn cancel(
        pool: &PgPool,
        meeting_id: Uuid,
        caller: UserId,
    ) -> Result<CancelMeetingResponse, MeetupError> {
        let mut tx = pool.begin().await?;
        let meeting = CapacityGuard::lock(&mut tx, meeting_id).await?;
        ensure_host(meeting.row(), caller)?;

        if meeting.status() == MeetingStatus::Cancelled {
            return Err(MeetupError::InvalidState(
                "Meeting is already cancelled".to_string(),
            ));
        }

        let row = MeetingsRepository::set_status(&mut tx, meeting_id, MeetingStatus::Cancelled)
            .await?;

        let recipients = ParticipantsRepository::approved_user_ids(&mut *tx, meeting_id).await?;
        let notices: Vec<_> = recipients
            .into_iter()
            .map(|user_id| cancellation_notice(UserId(user_id), &row))
            .collect();
        let notified = NotificationOutboxRepository::enqueue_all(&mut tx, &notices).await?;

        tx.commit().await?;

        info!(
            target: "meetup.services.meetings",
            meeting_id = %meeting_id,
            notified_participants = notified,
            "Meeting cancelled"
        );

        Ok(CancelMeetingResponse {
            meeting_id: row.id(),
            status: MeetingStatus::Cancelled,
            notified_participants: notified,
            message: "Meeting cancelled".to_string(),
        })
    }

    /// Soft-delete a CANCELLED or COMPLETED meeting. Host only.
    #[instrument(skip_all, name = "meetup.service.delete_meeting", fields(meeting_id = %meeting_id))]
    pub async fn delete(pool: &PgPool, meeting_id: Uuid, caller: UserId) -> Result<(), MeetupError> {
        let mut tx = pool.begin().await?;
        let meeting = CapacityGuard::lock(&mut tx, meeting_id).await?;
        ensure_host(meeting.row(), caller)?;

        match meeting.status() {
            MeetingStatus::Cancelled | MeetingStatus::Completed => {}
            other => {
                return Err(MeetupError::InvalidState(format!(
                    "A {other} meeting cannot be deleted"
                )));
            }
        }

        if !MeetingsRepository::soft_delete(&mut tx, meeting_id).await? {
            return Err(MeetupError::NotFound("Meeting not found".to_string()));
        }
        tx.commit().await?;

        info!(
            target: "meetup.services.meetings",
            meeting_id = %meeting_id,
            "Meeting deleted"
        );

        Ok(())
    }

    /// Meeting detail with viewer flags.
    ///
    /// Bumps the view counter first; a failed bump is logged and ignored.
    #[instrument(skip_all, name = "meetup.service.find_meeting", fields(meeting_id = %meeting_id))]
    pub async fn find_one(
        pool: &PgPool,
        meeting_id: Uuid,
        viewer: Option<UserId>,
    ) -> Result<MeetingDetailResponse, MeetupError> {
        if let Err(e) = MeetingsRepository::increment_view_count(pool, meeting_id).await {
            warn!(
                target: "meetup.services.meetings",
                meeting_id = %meeting_id,
                error = %e,
                "Failed to increment view count"
            );
        }

        let row = MeetingsRepository::find_live(pool, meeting_id)
            .await?
            .ok_or_else(|| MeetupError::NotFound("Meeting not found".to_string()))?;

        let (is_bookmarked, participant_status) = match viewer {
            Some(viewer) => {
                let (bookmarked, record) = tokio::try_join!(
                    UsersRepository::has_bookmarked(pool, viewer.0, meeting_id),
                    ParticipantsRepository::find_by_meeting_and_user(pool, meeting_id, viewer.0),
                )?;
                let status = record.map(|r| r.status()).transpose()?;
                (bookmarked, status)
            }
            None => (false, None),
        };

        let (host, approved) = tokio::try_join!(
            UsersRepository::find_summary(pool, row.host_id),
            ParticipantsRepository::count_approved(pool, meeting_id),
        )?;
        let host = host.ok_or(MeetupError::Internal)?;

        Ok(MeetingDetailResponse {
            meeting: row.into_response(host, approved)?,
            is_bookmarked,
            participant_status,
        })
    }
}

async fn with_host(
    conn: &mut PgConnection,
    row: MeetingRow,
    approved: i64,
) -> Result<MeetingResponse, MeetupError> {
    let host = UsersRepository::find_summary(conn, row.host_id)
        .await?
        .ok_or(MeetupError::Internal)?;
    row.into_response(host, approved)
}
