//! Activity scheduling within a meeting.

use crate::errors::MeetupError;
use crate::models::{ActivityResponse, CreateActivityRequest};
use crate::repositories::{ActivitiesRepository, MeetingsRepository};
use crate::services::access::ensure_host_or_member;
use common::types::UserId;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

pub struct ActivityService;

impl ActivityService {
    /// Add an activity. The host and APPROVED participants may do this.
    #[instrument(skip_all, name = "meetup.service.create_activity", fields(meeting_id = %meeting_id, user_id = %caller))]
    pub async fn create_activity(
        pool: &PgPool,
        meeting_id: Uuid,
        caller: UserId,
        request: &CreateActivityRequest,
    ) -> Result<ActivityResponse, MeetupError> {
        request.validate()?;

        let meeting = MeetingsRepository::find_live(pool, meeting_id)
            .await?
            .ok_or_else(|| MeetupError::NotFound("Meeting not found".to_string()))?;
        ensure_host_or_member(pool, meeting_id, meeting.host_id, caller).await?;

        let row = ActivitiesRepository::insert(pool, meeting_id, caller.0, request).await?;

        info!(
            target: "meetup.services.activities",
            meeting_id = %meeting_id,
            activity_id = %row.activity_id,
            "Activity created"
        );

        Ok(row.into())
    }

    /// Activities of a live meeting ordered by start.
    #[instrument(skip_all, name = "meetup.service.list_activities", fields(meeting_id = %meeting_id))]
    pub async fn list_activities(
        pool: &PgPool,
        meeting_id: Uuid,
    ) -> Result<Vec<ActivityResponse>, MeetupError> {
        if MeetingsRepository::find_live(pool, meeting_id).await?.is_none() {
            return Err(MeetupError::NotFound("Meeting not found".to_string()));
        }

        let rows = ActivitiesRepository::list_for_meeting(pool, meeting_id).await?;
        Ok(rows.into_iter().map(ActivityResponse::from).collect())
    }
}
