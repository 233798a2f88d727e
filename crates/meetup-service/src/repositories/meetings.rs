//! Meetings repository.
//!
//! `lock_live` takes a row lock on the meeting for the rest of the caller's
//! transaction. Every participation write goes through it, so writes for one
//! meeting serialize on that row.

use crate::errors::MeetupError;
use crate::models::{MeetingRow, MeetingStatus, UpdateMeetingRequest};
use crate::observability::metrics;
use sqlx::{PgConnection, PgExecutor, PgPool};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Fields for a new meeting row.
#[derive(Debug, Clone)]
pub struct NewMeeting<'a> {
    pub host_id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub location: &'a str,
    pub image_url: Option<&'a str>,
    pub capacity: i32,
    pub status: MeetingStatus,
    pub auto_approve: bool,
}

/// Meetings repository for database operations.
pub struct MeetingsRepository;

impl MeetingsRepository {
    /// Insert a meeting and return the stored row.
    #[instrument(skip_all, name = "meetup.repo.insert_meeting")]
    pub async fn insert(
        conn: &mut PgConnection,
        meeting: &NewMeeting<'_>,
    ) -> Result<MeetingRow, MeetupError> {
        let start = Instant::now();

        let row = sqlx::query_as::<_, MeetingRow>(
            r#"
            INSERT INTO meetings (
                meeting_id, host_id, title, description, category, location,
                image_url, capacity, status, auto_approve
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING
                meeting_id, host_id, title, description, category, location,
                image_url, capacity, status, auto_approve, view_count,
                created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4()) // $1
        .bind(meeting.host_id) // $2
        .bind(meeting.title) // $3
        .bind(meeting.description) // $4
        .bind(meeting.category) // $5
        .bind(meeting.location) // $6
        .bind(meeting.image_url) // $7
        .bind(meeting.capacity) // $8
        .bind(meeting.status.as_db_str()) // $9
        .bind(meeting.auto_approve) // $10
        .fetch_one(conn)
        .await
        .map_err(|e| {
            metrics::record_db_query("insert_meeting", "error", start.elapsed());
            MeetupError::Database(e.to_string())
        })?;

        metrics::record_db_query("insert_meeting", "success", start.elapsed());
        Ok(row)
    }

    /// Find a meeting that has not been soft-deleted.
    #[instrument(skip_all, name = "meetup.repo.find_meeting", fields(meeting_id = %meeting_id))]
    pub async fn find_live<'e, E>(
        executor: E,
        meeting_id: Uuid,
    ) -> Result<Option<MeetingRow>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, MeetingRow>(
            r#"
            SELECT
                meeting_id, host_id, title, description, category, location,
                image_url, capacity, status, auto_approve, view_count,
                created_at, updated_at
            FROM live_meetings
            WHERE meeting_id = $1
            "#,
        )
        .bind(meeting_id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    /// Find a live meeting and lock its row until the transaction ends.
    #[instrument(skip_all, name = "meetup.repo.lock_meeting", fields(meeting_id = %meeting_id))]
    pub async fn lock_live(
        conn: &mut PgConnection,
        meeting_id: Uuid,
    ) -> Result<Option<MeetingRow>, MeetupError> {
        let start = Instant::now();

        let row = sqlx::query_as::<_, MeetingRow>(
            r#"
            SELECT
                meeting_id, host_id, title, description, category, location,
                image_url, capacity, status, auto_approve, view_count,
                created_at, updated_at
            FROM live_meetings
            WHERE meeting_id = $1
            FOR UPDATE
            "#,
        )
        .bind(meeting_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            metrics::record_db_query("lock_meeting", "error", start.elapsed());
            MeetupError::Database(e.to_string())
        })?;

        metrics::record_db_query("lock_meeting", "success", start.elapsed());
        Ok(row)
    }

    /// Apply a partial update. Absent fields keep their stored value.
    #[instrument(skip_all, name = "meetup.repo.update_meeting", fields(meeting_id = %meeting_id))]
    pub async fn update_fields(
        conn: &mut PgConnection,
        meeting_id: Uuid,
        patch: &UpdateMeetingRequest,
    ) -> Result<MeetingRow, MeetupError> {
        let row = sqlx::query_as::<_, MeetingRow>(
            r#"
            UPDATE meetings
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                location = COALESCE($5, location),
                image_url = COALESCE($6, image_url),
                capacity = COALESCE($7, capacity),
                auto_approve = COALESCE($8, auto_approve),
                status = COALESCE($9, status),
                updated_at = NOW()
            WHERE meeting_id = $1 AND deleted_at IS NULL
            RETURNING
                meeting_id, host_id, title, description, category, location,
                image_url, capacity, status, auto_approve, view_count,
                created_at, updated_at
            "#,
        )
        .bind(meeting_id) // $1
        .bind(patch.title.as_deref().map(str::trim)) // $2
        .bind(patch.description.as_deref().map(str::trim)) // $3
        .bind(patch.category.as_deref().map(str::trim)) // $4
        .bind(patch.location.as_deref().map(str::trim)) // $5
        .bind(patch.image_url.as_deref()) // $6
        .bind(patch.capacity) // $7
        .bind(patch.auto_approve) // $8
        .bind(patch.status.map(|s| s.as_db_str())) // $9
        .fetch_one(conn)
        .await?;

        Ok(row)
    }

    /// Overwrite the meeting status.
    #[instrument(skip_all, name = "meetup.repo.set_meeting_status", fields(meeting_id = %meeting_id, status = %status))]
    pub async fn set_status(
        conn: &mut PgConnection,
        meeting_id: Uuid,
        status: MeetingStatus,
    ) -> Result<MeetingRow, MeetupError> {
        let start = Instant::now();

        let row = sqlx::query_as::<_, MeetingRow>(
            r#"
            UPDATE meetings
            SET status = $2, updated_at = NOW()
            WHERE meeting_id = $1 AND deleted_at IS NULL
            RETURNING
                meeting_id, host_id, title, description, category, location,
                image_url, capacity, status, auto_approve, view_count,
                created_at, updated_at
            "#,
        )
        .bind(meeting_id)
        .bind(status.as_db_str())
        .fetch_one(conn)
        .await
        .map_err(|e| {
            metrics::record_db_query("set_meeting_status", "error", start.elapsed());
            MeetupError::Database(e.to_string())
        })?;

        metrics::record_db_query("set_meeting_status", "success", start.elapsed());
        Ok(row)
    }

    /// Set `deleted_at`. Returns false if the meeting was already gone.
    #[instrument(skip_all, name = "meetup.repo.soft_delete_meeting", fields(meeting_id = %meeting_id))]
    pub async fn soft_delete(conn: &mut PgConnection, meeting_id: Uuid) -> Result<bool, MeetupError> {
        let result = sqlx::query(
            r#"
            UPDATE meetings
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE meeting_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(meeting_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bump the view counter. Not transactional with anything else.
    #[instrument(skip_all, name = "meetup.repo.increment_view_count", fields(meeting_id = %meeting_id))]
    pub async fn increment_view_count(pool: &PgPool, meeting_id: Uuid) -> Result<(), MeetupError> {
        sqlx::query(
            r#"
            UPDATE meetings
            SET view_count = view_count + 1
            WHERE meeting_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(meeting_id)
        .execute(pool)
        .await?;

        Ok(())
    }
}
