//! Notification outbox repository.
//!
//! Rows are inserted inside the transaction of the state change that caused
//! them, so a rolled-back change never produces a notification.
//!
//! The dispatcher claims undelivered rows by setting a `claimed_until` lease in
//! one short statement (`FOR UPDATE SKIP LOCKED` picks the rows). Delivery
//! happens outside any transaction, and each row is then marked on its own.
//! Rows whose lease expires without a mark are claimed again.

use crate::errors::MeetupError;
use crate::models::{NewNotification, OutboxNotification};
use crate::observability::metrics;
use sqlx::{PgConnection, PgExecutor};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

pub struct NotificationOutboxRepository;

impl NotificationOutboxRepository {
    /// Insert one outbox row in the caller's transaction.
    #[instrument(
        skip_all,
        name = "meetup.repo.enqueue_notification",
        fields(notification_type = %notification.notification_type)
    )]
    pub async fn enqueue(
        conn: &mut PgConnection,
        notification: &NewNotification,
    ) -> Result<Uuid, MeetupError> {
        let start = Instant::now();

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO notification_outbox (
                notification_id, recipient_user_id, notification_type,
                title, message, priority, context_data
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING notification_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification.recipient.0)
        .bind(notification.notification_type.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.priority().as_str())
        .bind(&notification.context_data)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            metrics::record_db_query("enqueue_notification", "error", start.elapsed());
            MeetupError::Database(e.to_string())
        })?;

        metrics::record_db_query("enqueue_notification", "success", start.elapsed());
        metrics::record_notifications_enqueued(notification.notification_type.as_str(), 1);
        Ok(id)
    }

    /// Insert several outbox rows in the caller's transaction.
    pub async fn enqueue_all(
        conn: &mut PgConnection,
        notifications: &[NewNotification],
    ) -> Result<usize, MeetupError> {
        for notification in notifications {
            Self::enqueue(&mut *conn, notification).await?;
        }
        Ok(notifications.len())
    }

    /// Claim up to `batch_size` undelivered rows that still have attempts left
    /// and no live lease, leasing them for `lease_seconds`.
    ///
    /// Runs as a single statement, so no row lock outlives the call.
    #[instrument(skip_all, name = "meetup.repo.claim_pending_notifications")]
    pub async fn claim_pending<'e, E>(
        executor: E,
        batch_size: i64,
        max_attempts: i32,
        lease_seconds: u64,
    ) -> Result<Vec<OutboxNotification>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let start = Instant::now();

        let mut rows = sqlx::query_as::<_, OutboxNotification>(
            r#"
            WITH claimable AS (
                SELECT notification_id
                FROM notification_outbox
                WHERE delivered_at IS NULL
                  AND attempts < $2
                  AND (claimed_until IS NULL OR claimed_until < NOW())
                ORDER BY created_at, notification_id
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE notification_outbox o
            SET claimed_until = NOW() + make_interval(secs => $3)
            FROM claimable
            WHERE o.notification_id = claimable.notification_id
            RETURNING
                o.notification_id, o.recipient_user_id, o.notification_type, o.title,
                o.message, o.priority, o.context_data, o.attempts, o.created_at
            "#,
        )
        .bind(batch_size)
        .bind(max_attempts)
        .bind(lease_seconds as f64)
        .fetch_all(executor)
        .await
        .map_err(|e| {
            metrics::record_db_query("claim_pending_notifications", "error", start.elapsed());
            MeetupError::Database(e.to_string())
        })?;

        metrics::record_db_query("claim_pending_notifications", "success", start.elapsed());

        // RETURNING order is unspecified.
        rows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.notification_id.cmp(&b.notification_id))
        });
        Ok(rows)
    }

    /// Mark a claimed row delivered and release its lease.
    pub async fn mark_delivered<'e, E>(executor: E, notification_id: Uuid) -> Result<(), MeetupError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET delivered_at = NOW(), attempts = attempts + 1,
                last_error = NULL, claimed_until = NULL
            WHERE notification_id = $1
            "#,
        )
        .bind(notification_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Record a failed attempt and release the lease so the next tick retries.
    pub async fn record_failure<'e, E>(
        executor: E,
        notification_id: Uuid,
        error: &str,
    ) -> Result<(), MeetupError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET attempts = attempts + 1, last_error = $2, claimed_until = NULL
            WHERE notification_id = $1
            "#,
        )
        .bind(notification_id)
        .bind(error)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// All rows addressed to a user, oldest first.
    #[instrument(skip_all, name = "meetup.repo.list_notifications_for_recipient")]
    pub async fn list_for_recipient<'e, E>(
        executor: E,
        recipient_user_id: Uuid,
    ) -> Result<Vec<OutboxNotification>, MeetupError>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, OutboxNotification>(
            r#"
            SELECT
                notification_id, recipient_user_id, notification_type, title,
                message, priority, context_data, attempts, created_at
            FROM notification_outbox
            WHERE recipient_user_id = $1
            ORDER BY created_at, notification_id
            "#,
        )
        .bind(recipient_user_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }
}
