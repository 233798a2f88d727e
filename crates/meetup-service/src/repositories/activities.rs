//! Activities repository.

use crate::errors::MeetupError;
use crate::models::{ActivityContextRow, ActivityRow, CreateActivityRequest};
use sqlx::PgExecutor;
use tracing::instrument;
use uuid::Uuid;

pub struct ActivitiesRepository;

impl ActivitiesRepository {
    /// Insert an activity. Image URLs keep their request order.
    #[instrument(skip_all, name = "meetup.repo.insert_activity", fields(meeting_id = %meeting_id))]
    pub async fn insert<'e, E>(
        executor: E,
        meeting_id: Uuid,
        created_by: Uuid,
        activity: &CreateActivityRequest,
    ) -> Result<ActivityRow, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let image_urls: Vec<String> = activity
            .image_urls
            .iter()
            .map(|url| url.trim().to_string())
            .collect();

        let row = sqlx::query_as::<_, ActivityRow>(
            r#"
            INSERT INTO activities (
                activity_id, meeting_id, title, starts_at, ends_at, location,
                created_by, image_urls
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING
                activity_id, meeting_id, title, starts_at, ends_at, location,
                created_by, image_urls, created_at
            "#,
        )
        .bind(Uuid::new_v4()) // $1
        .bind(meeting_id) // $2
        .bind(activity.title.trim()) // $3
        .bind(activity.date) // $4
        .bind(activity.end_time) // $5
        .bind(activity.location.as_deref().map(str::trim).unwrap_or_default()) // $6
        .bind(created_by) // $7
        .bind(image_urls) // $8
        .fetch_one(executor)
        .await?;

        Ok(row)
    }

    /// Activity with its parent meeting, if both exist and the meeting is live.
    #[instrument(skip_all, name = "meetup.repo.find_activity", fields(activity_id = %activity_id))]
    pub async fn find_with_meeting<'e, E>(
        executor: E,
        activity_id: Uuid,
    ) -> Result<Option<ActivityContextRow>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, ActivityContextRow>(
            r#"
            SELECT
                a.activity_id, a.meeting_id, a.title, a.starts_at, a.ends_at, a.location,
                a.created_by, a.image_urls, a.created_at,
                m.title AS meeting_title,
                m.host_id AS meeting_host_id
            FROM activities a
            JOIN live_meetings m ON m.meeting_id = a.meeting_id
            WHERE a.activity_id = $1
            "#,
        )
        .bind(activity_id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    /// Activities of a meeting ordered by start time.
    #[instrument(skip_all, name = "meetup.repo.list_activities", fields(meeting_id = %meeting_id))]
    pub async fn list_for_meeting<'e, E>(
        executor: E,
        meeting_id: Uuid,
    ) -> Result<Vec<ActivityRow>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT
                activity_id, meeting_id, title, starts_at, ends_at, location,
                created_by, image_urls, created_at
            FROM activities
            WHERE meeting_id = $1
            ORDER BY starts_at, created_at
            "#,
        )
        .bind(meeting_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }
}
