//! Participant records repository.
//!
//! Records are unique per (meeting, user) and are only ever overwritten in
//! place. Callers that change status must hold the meeting row lock taken by
//! `MeetingsRepository::lock_live`.

use crate::errors::{is_unique_violation, MeetupError};
use crate::models::{MyParticipationRow, ParticipantRow, ParticipantStatus, ParticipantWithUserRow};
use crate::observability::metrics;
use sqlx::{PgConnection, PgExecutor};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Participants repository for database operations.
pub struct ParticipantsRepository;

impl ParticipantsRepository {
    #[instrument(skip_all, name = "meetup.repo.find_participant", fields(meeting_id = %meeting_id, user_id = %user_id))]
    pub async fn find_by_meeting_and_user<'e, E>(
        executor: E,
        meeting_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ParticipantRow>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT participant_id, meeting_id, user_id, status, leave_reason, created_at, updated_at
            FROM meeting_participants
            WHERE meeting_id = $1 AND user_id = $2
            "#,
        )
        .bind(meeting_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    /// Find a participant record by id, scoped to its meeting.
    #[instrument(skip_all, name = "meetup.repo.find_participant_by_id", fields(participant_id = %participant_id))]
    pub async fn find_by_id<'e, E>(
        executor: E,
        meeting_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<ParticipantRow>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT participant_id, meeting_id, user_id, status, leave_reason, created_at, updated_at
            FROM meeting_participants
            WHERE participant_id = $1 AND meeting_id = $2
            "#,
        )
        .bind(participant_id)
        .bind(meeting_id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    /// Create the first record for a (meeting, user) pair.
    ///
    /// A unique-key violation means another request created the record first
    /// and is reported as `DuplicateApplication`.
    #[instrument(skip_all, name = "meetup.repo.insert_participant", fields(meeting_id = %meeting_id, user_id = %user_id))]
    pub async fn insert(
        conn: &mut PgConnection,
        meeting_id: Uuid,
        user_id: Uuid,
        status: ParticipantStatus,
    ) -> Result<ParticipantRow, MeetupError> {
        let start = Instant::now();

        let result = sqlx::query_as::<_, ParticipantRow>(
            r#"
            INSERT INTO meeting_participants (participant_id, meeting_id, user_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING participant_id, meeting_id, user_id, status, leave_reason, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(meeting_id)
        .bind(user_id)
        .bind(status.as_db_str())
        .fetch_one(conn)
        .await;

        match result {
            Ok(row) => {
                metrics::record_db_query("insert_participant", "success", start.elapsed());
                Ok(row)
            }
            Err(e) if is_unique_violation(&e) => {
                metrics::record_db_query("insert_participant", "conflict", start.elapsed());
                Err(MeetupError::DuplicateApplication)
            }
            Err(e) => {
                metrics::record_db_query("insert_participant", "error", start.elapsed());
                Err(MeetupError::Database(e.to_string()))
            }
        }
    }

    /// Overwrite status and leave reason of an existing record.
    #[instrument(skip_all, name = "meetup.repo.update_participant_status", fields(participant_id = %participant_id, status = %status))]
    pub async fn update_status(
        conn: &mut PgConnection,
        participant_id: Uuid,
        status: ParticipantStatus,
        leave_reason: Option<&str>,
    ) -> Result<ParticipantRow, MeetupError> {
        let start = Instant::now();

        let row = sqlx::query_as::<_, ParticipantRow>(
            r#"
            UPDATE meeting_participants
            SET status = $2, leave_reason = $3, updated_at = NOW()
            WHERE participant_id = $1
            RETURNING participant_id, meeting_id, user_id, status, leave_reason, created_at, updated_at
            "#,
        )
        .bind(participant_id)
        .bind(status.as_db_str())
        .bind(leave_reason)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            metrics::record_db_query("update_participant_status", "error", start.elapsed());
            MeetupError::Database(e.to_string())
        })?;

        metrics::record_db_query("update_participant_status", "success", start.elapsed());
        Ok(row)
    }

    /// Count APPROVED records for a meeting.
    #[instrument(skip_all, name = "meetup.repo.count_approved", fields(meeting_id = %meeting_id))]
    pub async fn count_approved<'e, E>(executor: E, meeting_id: Uuid) -> Result<i64, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let start = Instant::now();

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM meeting_participants
            WHERE meeting_id = $1 AND status = 'APPROVED'
            "#,
        )
        .bind(meeting_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            metrics::record_db_query("count_approved", "error", start.elapsed());
            MeetupError::Database(e.to_string())
        })?;

        metrics::record_db_query("count_approved", "success", start.elapsed());
        Ok(count)
    }

    /// User ids of every APPROVED participant.
    #[instrument(skip_all, name = "meetup.repo.approved_user_ids", fields(meeting_id = %meeting_id))]
    pub async fn approved_user_ids<'e, E>(
        executor: E,
        meeting_id: Uuid,
    ) -> Result<Vec<Uuid>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let ids = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM meeting_participants
            WHERE meeting_id = $1 AND status = 'APPROVED'
            ORDER BY created_at
            "#,
        )
        .bind(meeting_id)
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }

    /// Records of one meeting with user profiles, optionally filtered by status.
    #[instrument(skip_all, name = "meetup.repo.list_meeting_participants", fields(meeting_id = %meeting_id))]
    pub async fn list_for_meeting<'e, E>(
        executor: E,
        meeting_id: Uuid,
        status: Option<ParticipantStatus>,
    ) -> Result<Vec<ParticipantWithUserRow>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, ParticipantWithUserRow>(
            r#"
            SELECT
                p.participant_id, p.meeting_id, p.user_id, p.status, p.leave_reason,
                p.created_at, p.updated_at,
                u.nickname, u.profile_image_url
            FROM meeting_participants p
            JOIN users u ON u.user_id = p.user_id
            WHERE p.meeting_id = $1
              AND ($2::text IS NULL OR p.status = $2)
            ORDER BY p.created_at, p.participant_id
            "#,
        )
        .bind(meeting_id)
        .bind(status.map(|s| s.as_db_str()))
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// The user's own records on meetings that are not soft-deleted.
    #[instrument(skip_all, name = "meetup.repo.list_user_participations", fields(user_id = %user_id))]
    pub async fn list_for_user<'e, E>(
        executor: E,
        user_id: Uuid,
        status: Option<ParticipantStatus>,
    ) -> Result<Vec<MyParticipationRow>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, MyParticipationRow>(
            r#"
            SELECT
                p.participant_id, p.meeting_id, p.user_id, p.status, p.leave_reason,
                p.created_at, p.updated_at,
                m.title AS meeting_title,
                m.category AS meeting_category,
                m.status AS meeting_status,
                m.image_url AS meeting_image_url,
                m.host_id AS meeting_host_id
            FROM meeting_participants p
            JOIN live_meetings m ON m.meeting_id = p.meeting_id
            WHERE p.user_id = $1
              AND ($2::text IS NULL OR p.status = $2)
            ORDER BY p.updated_at DESC, p.participant_id
            "#,
        )
        .bind(user_id)
        .bind(status.map(|s| s.as_db_str()))
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }
}
