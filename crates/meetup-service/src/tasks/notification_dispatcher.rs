//! Notification outbox dispatcher.
//!
//! Each tick claims a batch of undelivered outbox rows under a short lease,
//! hands them to the configured [`NotificationSink`] with no transaction open,
//! and records the result on each row in its own statement:
//! 1. Delivered rows get `delivered_at` and are never claimed again
//! 2. Failed rows get `attempts + 1` and `last_error`, and are retried on a
//!    later tick until `max_attempts` is reached
//!
//! A leased row is invisible to other dispatchers, so several instances can
//! drain the same database. If an instance dies or a mark fails, only the
//! affected rows are retried once their lease runs out.
//!
//! # Graceful Shutdown
//!
//! When the cancellation token fires, the task finishes its current batch and
//! exits.

use crate::config::Config;
use crate::errors::MeetupError;
use crate::observability::metrics;
use crate::repositories::NotificationOutboxRepository;
use crate::services::NotificationSink;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct NotificationDispatcherConfig {
    /// Seconds between ticks.
    pub interval_seconds: u64,
    /// Rows claimed per tick.
    pub batch_size: i64,
    /// Rows with this many failed attempts are no longer claimed.
    pub max_attempts: i32,
    /// Seconds a claimed row stays hidden from other claims.
    pub lease_seconds: u64,
}

impl From<&Config> for NotificationDispatcherConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval_seconds: config.notification_dispatch_interval_seconds,
            batch_size: config.notification_batch_size,
            max_attempts: config.notification_max_attempts,
            lease_seconds: config.notification_claim_lease_seconds,
        }
    }
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub claimed: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Failed rows that have now used their last attempt.
    pub exhausted: usize,
}

/// Run the dispatcher until `cancel_token` is cancelled.
#[instrument(skip_all, name = "meetup.task.notification_dispatcher")]
pub async fn start_notification_dispatcher(
    pool: PgPool,
    sink: Arc<dyn NotificationSink>,
    config: NotificationDispatcherConfig,
    cancel_token: CancellationToken,
) {
    info!(
        target: "meetup.task.notification_dispatcher",
        interval_seconds = config.interval_seconds,
        batch_size = config.batch_size,
        max_attempts = config.max_attempts,
        "Starting notification dispatcher"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_seconds));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = dispatch_pending(&pool, sink.as_ref(), &config).await {
                    warn!(
                        target: "meetup.task.notification_dispatcher",
                        error = %e,
                        "Notification dispatch pass failed"
                    );
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "meetup.task.notification_dispatcher",
                    "Notification dispatcher received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(
        target: "meetup.task.notification_dispatcher",
        "Notification dispatcher stopped"
    );
}

/// Claim and deliver one batch.
///
/// Sink failures are recorded on the row and counted in the stats. A failed
/// claim is returned as an error; a failed mark is logged and the row is left
/// to its lease.
pub async fn dispatch_pending(
    pool: &PgPool,
    sink: &dyn NotificationSink,
    config: &NotificationDispatcherConfig,
) -> Result<DispatchStats, MeetupError> {
    let batch = NotificationOutboxRepository::claim_pending(
        pool,
        config.batch_size,
        config.max_attempts,
        config.lease_seconds,
    )
    .await?;

    let mut stats = DispatchStats {
        claimed: batch.len(),
        ..DispatchStats::default()
    };

    for notification in &batch {
        match sink.deliver(notification).await {
            Ok(()) => {
                stats.delivered += 1;
                if let Err(e) =
                    NotificationOutboxRepository::mark_delivered(pool, notification.notification_id)
                        .await
                {
                    warn!(
                        target: "meetup.task.notification_dispatcher",
                        notification_id = %notification.notification_id,
                        error = %e,
                        "Failed to mark notification delivered, it will be resent after its lease"
                    );
                }
            }
            Err(e) => {
                stats.failed += 1;
                if let Err(mark_err) = NotificationOutboxRepository::record_failure(
                    pool,
                    notification.notification_id,
                    &e.to_string(),
                )
                .await
                {
                    warn!(
                        target: "meetup.task.notification_dispatcher",
                        notification_id = %notification.notification_id,
                        error = %mark_err,
                        "Failed to record notification failure"
                    );
                }

                if notification.attempts + 1 >= config.max_attempts {
                    stats.exhausted += 1;
                    warn!(
                        target: "meetup.task.notification_dispatcher",
                        notification_id = %notification.notification_id,
                        notification_type = %notification.notification_type,
                        error = %e,
                        "Notification delivery gave up after final attempt"
                    );
                } else {
                    debug!(
                        target: "meetup.task.notification_dispatcher",
                        notification_id = %notification.notification_id,
                        attempts = notification.attempts + 1,
                        error = %e,
                        "Notification delivery failed, will retry"
                    );
                }
            }
        }
    }

    metrics::record_notifications_dispatched("delivered", stats.delivered as u64);
    metrics::record_notifications_dispatched("failed", stats.failed as u64);

    if stats.claimed > 0 {
        info!(
            target: "meetup.task.notification_dispatcher",
            claimed = stats.claimed,
            delivered = stats.delivered,
            failed = stats.failed,
            "Dispatched notification batch"
        );
    }

    Ok(stats)
}
