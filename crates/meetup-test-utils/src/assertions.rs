//! Database-backed assertions for participants and the notification outbox.

use sqlx::PgPool;
use uuid::Uuid;

/// Outbox rows of `notification_type` addressed to anyone.
pub async fn outbox_count(pool: &PgPool, notification_type: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM notification_outbox WHERE notification_type = $1")
        .bind(notification_type)
        .fetch_one(pool)
        .await
        .expect("Failed to count outbox rows")
}

/// Outbox rows of `notification_type` addressed to `recipient`.
pub async fn outbox_count_for(pool: &PgPool, recipient: Uuid, notification_type: &str) -> i64 {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM notification_outbox
        WHERE recipient_user_id = $1 AND notification_type = $2
        "#,
    )
    .bind(recipient)
    .bind(notification_type)
    .fetch_one(pool)
    .await
    .expect("Failed to count outbox rows")
}

pub async fn total_outbox_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM notification_outbox")
        .fetch_one(pool)
        .await
        .expect("Failed to count outbox rows")
}

pub async fn participant_status(pool: &PgPool, meeting_id: Uuid, user_id: Uuid) -> Option<String> {
    sqlx::query_scalar(
        "SELECT status FROM meeting_participants WHERE meeting_id = $1 AND user_id = $2",
    )
    .bind(meeting_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .expect("Failed to read participant status")
}

pub async fn approved_count(pool: &PgPool, meeting_id: Uuid) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM meeting_participants WHERE meeting_id = $1 AND status = 'APPROVED'",
    )
    .bind(meeting_id)
    .fetch_one(pool)
    .await
    .expect("Failed to count approved participants")
}

/// Assert the number of outbox rows of `notification_type`.
pub async fn assert_outbox_count(pool: &PgPool, notification_type: &str, expected: i64) {
    let actual = outbox_count(pool, notification_type).await;
    assert_eq!(
        actual, expected,
        "expected {expected} {notification_type} notifications, found {actual}"
    );
}

/// Assert the participant record of `user_id` is in `expected` status.
pub async fn assert_participant_status(
    pool: &PgPool,
    meeting_id: Uuid,
    user_id: Uuid,
    expected: &str,
) {
    let actual = participant_status(pool, meeting_id, user_id).await;
    assert_eq!(
        actual.as_deref(),
        Some(expected),
        "participant {user_id} in meeting {meeting_id}"
    );
}
