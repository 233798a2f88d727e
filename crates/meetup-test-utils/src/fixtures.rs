//! Database fixtures.
//!
//! Users, blocks and bookmarks are owned by other services in production, so
//! tests insert them directly. Meetings, participants and attendances can be
//! seeded in any state, including states the service itself would refuse to
//! produce.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a user and return its id.
pub async fn create_user(pool: &PgPool, nickname: &str) -> Result<Uuid, anyhow::Error> {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (user_id, nickname) VALUES ($1, $2)")
        .bind(user_id)
        .bind(nickname)
        .execute(pool)
        .await?;
    Ok(user_id)
}

/// Record that `blocker` blocked `blocked`.
pub async fn block_user(pool: &PgPool, blocker: Uuid, blocked: Uuid) -> Result<(), anyhow::Error> {
    sqlx::query("INSERT INTO user_blocks (blocker_id, blocked_id) VALUES ($1, $2)")
        .bind(blocker)
        .bind(blocked)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn bookmark_meeting(
    pool: &PgPool,
    user_id: Uuid,
    meeting_id: Uuid,
) -> Result<(), anyhow::Error> {
    sqlx::query("INSERT INTO meeting_bookmarks (user_id, meeting_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(meeting_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Meeting seed with sensible defaults: RECRUITING, capacity 4, manual approval.
#[derive(Debug, Clone)]
pub struct MeetingSeed {
    pub title: String,
    pub category: String,
    pub capacity: i32,
    pub status: String,
    pub auto_approve: bool,
}

impl Default for MeetingSeed {
    fn default() -> Self {
        Self {
            title: "Saturday board games".to_string(),
            category: "games".to_string(),
            capacity: 4,
            status: "RECRUITING".to_string(),
            auto_approve: false,
        }
    }
}

impl MeetingSeed {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_capacity(mut self, capacity: i32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn auto_approve(mut self) -> Self {
        self.auto_approve = true;
        self
    }

    /// Insert the meeting hosted by `host_id` and return its id.
    pub async fn insert(self, pool: &PgPool, host_id: Uuid) -> Result<Uuid, anyhow::Error> {
        let meeting_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO meetings (host_id, title, category, capacity, status, auto_approve)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING meeting_id
            "#,
        )
        .bind(host_id)
        .bind(&self.title)
        .bind(&self.category)
        .bind(self.capacity)
        .bind(&self.status)
        .bind(self.auto_approve)
        .fetch_one(pool)
        .await?;
        Ok(meeting_id)
    }
}

/// Insert a default RECRUITING meeting with the given capacity.
pub async fn create_meeting(
    pool: &PgPool,
    host_id: Uuid,
    capacity: i32,
) -> Result<Uuid, anyhow::Error> {
    MeetingSeed::default()
        .with_capacity(capacity)
        .insert(pool, host_id)
        .await
}

pub async fn set_meeting_status(
    pool: &PgPool,
    meeting_id: Uuid,
    status: &str,
) -> Result<(), anyhow::Error> {
    sqlx::query("UPDATE meetings SET status = $2 WHERE meeting_id = $1")
        .bind(meeting_id)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a participant record directly in `status` and return its id.
pub async fn insert_participant(
    pool: &PgPool,
    meeting_id: Uuid,
    user_id: Uuid,
    status: &str,
) -> Result<Uuid, anyhow::Error> {
    let participant_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO meeting_participants (meeting_id, user_id, status)
        VALUES ($1, $2, $3)
        RETURNING participant_id
        "#,
    )
    .bind(meeting_id)
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(participant_id)
}

/// Insert an activity and return its id.
pub async fn create_activity(
    pool: &PgPool,
    meeting_id: Uuid,
    created_by: Uuid,
    title: &str,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<Uuid, anyhow::Error> {
    let activity_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO activities (meeting_id, title, starts_at, ends_at, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING activity_id
        "#,
    )
    .bind(meeting_id)
    .bind(title)
    .bind(starts_at)
    .bind(ends_at)
    .bind(created_by)
    .fetch_one(pool)
    .await?;
    Ok(activity_id)
}

/// Insert or overwrite an attendance response.
pub async fn set_attendance(
    pool: &PgPool,
    activity_id: Uuid,
    user_id: Uuid,
    status: &str,
) -> Result<(), anyhow::Error> {
    sqlx::query(
        r#"
        INSERT INTO activity_attendances (activity_id, user_id, status)
        VALUES ($1, $2, $3)
        ON CONFLICT (activity_id, user_id) DO UPDATE SET status = EXCLUDED.status
        "#,
    )
    .bind(activity_id)
    .bind(user_id)
    .bind(status)
    .execute(pool)
    .await?;
    Ok(())
}
