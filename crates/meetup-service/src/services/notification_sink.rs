//! Notification delivery targets.
//!
//! The outbox dispatcher hands each claimed row to a [`NotificationSink`].
//! Delivery is at-least-once: a row whose delivery succeeded but whose
//! `delivered_at` write failed is sent again once its claim lease expires.

use crate::errors::MeetupError;
use crate::models::OutboxNotification;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Timeout for one webhook request in seconds.
const WEBHOOK_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Destination for outbox notifications.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification. An error leaves the row pending for retry.
    async fn deliver(&self, notification: &OutboxNotification) -> Result<(), MeetupError>;
}

/// POSTs each notification as JSON to a fixed URL.
#[derive(Clone)]
pub struct WebhookNotificationSink {
    client: Client,
    url: String,
}

impl WebhookNotificationSink {
    /// # Errors
    ///
    /// Returns `MeetupError::Internal` if the HTTP client cannot be built.
    pub fn new(url: String) -> Result<Self, MeetupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                error!(target: "meetup.services.notification_sink", error = %e, "Failed to build HTTP client");
                MeetupError::Internal
            })?;

        Ok(Self { client, url })
    }
}

#[async_trait::async_trait]
impl NotificationSink for WebhookNotificationSink {
    #[instrument(skip_all, name = "meetup.sink.webhook", fields(notification_id = %notification.notification_id))]
    async fn deliver(&self, notification: &OutboxNotification) -> Result<(), MeetupError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| MeetupError::ServiceUnavailable(format!("Webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MeetupError::ServiceUnavailable(format!(
                "Webhook returned {status}"
            )));
        }

        Ok(())
    }
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationSink;

#[async_trait::async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn deliver(&self, notification: &OutboxNotification) -> Result<(), MeetupError> {
        info!(
            target: "meetup.services.notification_sink",
            notification_id = %notification.notification_id,
            recipient_user_id = %notification.recipient_user_id,
            notification_type = %notification.notification_type,
            priority = %notification.priority,
            "Notification delivered to log sink"
        );
        Ok(())
    }
}

/// Mock notification sink for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct MockNotificationSink {
        /// Calls that fail before the sink starts accepting.
        fail_first: usize,
        call_count: AtomicUsize,
        delivered: Mutex<Vec<OutboxNotification>>,
    }

    impl MockNotificationSink {
        /// A sink that accepts everything.
        pub fn accepting() -> Self {
            Self::failing_first(0)
        }

        /// A sink that rejects everything.
        pub fn failing() -> Self {
            Self::failing_first(usize::MAX)
        }

        /// A sink that rejects the first `n` calls, then accepts.
        pub fn failing_first(n: usize) -> Self {
            Self {
                fail_first: n,
                call_count: AtomicUsize::new(0),
                delivered: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Notifications accepted so far, in delivery order.
        pub fn delivered(&self) -> Vec<OutboxNotification> {
            self.delivered
                .lock()
                .map(|guard| guard.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl NotificationSink for MockNotificationSink {
        async fn deliver(&self, notification: &OutboxNotification) -> Result<(), MeetupError> {
            let count = self.call_count.fetch_add(1, Ordering::SeqCst);

            if count < self.fail_first {
                return Err(MeetupError::ServiceUnavailable(
                    "Mock notification sink error".to_string(),
                ));
            }

            if let Ok(mut delivered) = self.delivered.lock() {
                delivered.push(notification.clone());
            }
            Ok(())
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    mod tests {
        use super::*;
        use chrono::Utc;
        use uuid::Uuid;

        fn notification() -> OutboxNotification {
            OutboxNotification {
                notification_id: Uuid::new_v4(),
                recipient_user_id: Uuid::new_v4(),
                notification_type: "PARTICIPANT_APPROVED".to_string(),
                title: "Participation approved".to_string(),
                message: "ok".to_string(),
                priority: "HIGH".to_string(),
                context_data: serde_json::json!({}),
                attempts: 0,
                created_at: Utc::now(),
            }
        }

        #[tokio::test]
        async fn test_failing_first_then_accepts() {
            let sink = MockNotificationSink::failing_first(2);
            let n = notification();

            assert!(sink.deliver(&n).await.is_err());
            assert!(sink.deliver(&n).await.is_err());
            assert!(sink.deliver(&n).await.is_ok());

            assert_eq!(sink.call_count(), 3);
            assert_eq!(sink.delivered(), vec![n]);
        }

        #[tokio::test]
        async fn test_failing_never_records() {
            let sink = MockNotificationSink::failing();
            assert!(sink.deliver(&notification()).await.is_err());
            assert!(sink.delivered().is_empty());
        }
    }
}
