//! Attendance records repository.
//!
//! One record per (activity, user), overwritten in place via
//! `INSERT ... ON CONFLICT DO UPDATE`.

use crate::errors::MeetupError;
use crate::models::{AttendanceRow, AttendanceStatus, AttendingActivityRow, CalendarEventRow};
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use tracing::instrument;
use uuid::Uuid;

pub struct AttendancesRepository;

impl AttendancesRepository {
    /// Create or overwrite the user's response; `responded_at` is set to now.
    #[instrument(skip_all, name = "meetup.repo.upsert_attendance", fields(activity_id = %activity_id, user_id = %user_id))]
    pub async fn upsert<'e, E>(
        executor: E,
        activity_id: Uuid,
        user_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<AttendanceRow, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            INSERT INTO activity_attendances (attendance_id, activity_id, user_id, status, responded_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (activity_id, user_id)
            DO UPDATE SET status = EXCLUDED.status, responded_at = NOW()
            RETURNING attendance_id, activity_id, user_id, status, responded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(activity_id)
        .bind(user_id)
        .bind(status.as_db_str())
        .fetch_one(executor)
        .await?;

        Ok(row)
    }

    #[instrument(skip_all, name = "meetup.repo.find_attendance")]
    pub async fn find<'e, E>(
        executor: E,
        activity_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AttendanceRow>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT attendance_id, activity_id, user_id, status, responded_at
            FROM activity_attendances
            WHERE activity_id = $1 AND user_id = $2
            "#,
        )
        .bind(activity_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    /// Every other activity the user currently marks ATTENDING, on live meetings
    /// that have not been cancelled.
    #[instrument(skip_all, name = "meetup.repo.list_other_attending", fields(user_id = %user_id))]
    pub async fn list_other_attending<'e, E>(
        executor: E,
        user_id: Uuid,
        exclude_activity_id: Uuid,
    ) -> Result<Vec<AttendingActivityRow>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, AttendingActivityRow>(
            r#"
            SELECT
                a.activity_id, a.title, a.starts_at, a.ends_at,
                m.meeting_id, m.title AS meeting_title
            FROM activity_attendances aa
            JOIN activities a ON a.activity_id = aa.activity_id
            JOIN live_meetings m ON m.meeting_id = a.meeting_id
            WHERE aa.user_id = $1
              AND aa.status = 'ATTENDING'
              AND aa.activity_id <> $2
              AND m.status <> 'CANCELLED'
            ORDER BY a.starts_at
            "#,
        )
        .bind(user_id)
        .bind(exclude_activity_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// ATTENDING activities whose start falls inside `[start, end]`.
    #[instrument(skip_all, name = "meetup.repo.list_calendar_events", fields(user_id = %user_id))]
    pub async fn list_calendar_events<'e, E>(
        executor: E,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEventRow>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, CalendarEventRow>(
            r#"
            SELECT
                a.activity_id, a.title, a.starts_at, a.ends_at, a.location,
                m.meeting_id,
                m.title AS meeting_title,
                m.category AS meeting_category,
                m.image_url AS meeting_image_url
            FROM activity_attendances aa
            JOIN activities a ON a.activity_id = aa.activity_id
            JOIN live_meetings m ON m.meeting_id = a.meeting_id
            WHERE aa.user_id = $1
              AND aa.status = 'ATTENDING'
              AND a.starts_at BETWEEN $2 AND $3
            ORDER BY a.starts_at, a.activity_id
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }
}
