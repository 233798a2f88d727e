//! Notification outbox types.

use chrono::{DateTime, Utc};
use common::types::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Notification kinds emitted by the participation and meeting lifecycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    ParticipationRequested,
    ParticipantJoined,
    ParticipantApproved,
    ParticipantRejected,
    ParticipantKicked,
    ParticipantWithdrawn,
    MeetingCancelled,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::ParticipationRequested => "PARTICIPATION_REQUESTED",
            NotificationType::ParticipantJoined => "PARTICIPANT_JOINED",
            NotificationType::ParticipantApproved => "PARTICIPANT_APPROVED",
            NotificationType::ParticipantRejected => "PARTICIPANT_REJECTED",
            NotificationType::ParticipantKicked => "PARTICIPANT_KICKED",
            NotificationType::ParticipantWithdrawn => "PARTICIPANT_WITHDRAWN",
            NotificationType::MeetingCancelled => "MEETING_CANCELLED",
        }
    }

    /// Delivery priority for this kind.
    pub fn priority(&self) -> NotificationPriority {
        match self {
            NotificationType::ParticipationRequested
            | NotificationType::ParticipantJoined
            | NotificationType::ParticipantWithdrawn => NotificationPriority::Normal,
            NotificationType::ParticipantApproved
            | NotificationType::ParticipantRejected
            | NotificationType::ParticipantKicked => NotificationPriority::High,
            NotificationType::MeetingCancelled => NotificationPriority::Critical,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "LOW",
            NotificationPriority::Normal => "NORMAL",
            NotificationPriority::High => "HIGH",
            NotificationPriority::Critical => "CRITICAL",
        }
    }
}

/// A notification to enqueue in the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient: UserId,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub context_data: serde_json::Value,
}

impl NewNotification {
    pub fn priority(&self) -> NotificationPriority {
        self.notification_type.priority()
    }
}

/// An undelivered outbox row, as handed to a `NotificationSink`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxNotification {
    pub notification_id: Uuid,
    pub recipient_user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub priority: String,
    pub context_data: serde_json::Value,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}
