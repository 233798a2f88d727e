//! Read-only lookups on user data owned by other services: profiles,
//! block relations and bookmarks.

use crate::errors::MeetupError;
use crate::models::UserSummary;
use sqlx::PgExecutor;
use tracing::instrument;
use uuid::Uuid;

pub struct UsersRepository;

impl UsersRepository {
    #[instrument(skip_all, name = "meetup.repo.find_user_summary", fields(user_id = %user_id))]
    pub async fn find_summary<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<UserSummary>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT user_id, nickname, profile_image_url
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    /// True if either user has blocked the other.
    #[instrument(skip_all, name = "meetup.repo.is_blocked_between")]
    pub async fn is_blocked_between<'e, E>(
        executor: E,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<bool, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let blocked: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_blocks
                WHERE (blocker_id = $1 AND blocked_id = $2)
                   OR (blocker_id = $2 AND blocked_id = $1)
            )
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(executor)
        .await?;

        Ok(blocked)
    }

    #[instrument(skip_all, name = "meetup.repo.has_bookmarked")]
    pub async fn has_bookmarked<'e, E>(
        executor: E,
        user_id: Uuid,
        meeting_id: Uuid,
    ) -> Result<bool, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let bookmarked: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM meeting_bookmarks
                WHERE user_id = $1 AND meeting_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(meeting_id)
        .fetch_one(executor)
        .await?;

        Ok(bookmarked)
    }
}
