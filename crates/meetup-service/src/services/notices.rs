//! Notification content for participation and lifecycle events.

use crate::models::{MeetingRow, NewNotification, NotificationType};
use common::types::UserId;
use serde_json::json;
use uuid::Uuid;

/// Notification for `notification_type` about `subject` on `meeting`,
/// addressed to `recipient`.
///
/// `reason` is only rendered for withdrawals.
pub fn participation_notice(
    notification_type: NotificationType,
    recipient: UserId,
    meeting: &MeetingRow,
    subject: Uuid,
    participant_id: Uuid,
    reason: Option<&str>,
) -> NewNotification {
    let title = meeting.title.as_str();
    let (heading, message) = match notification_type {
        NotificationType::ParticipationRequested => (
            "New participation request",
            format!("Someone asked to join \"{title}\"."),
        ),
        NotificationType::ParticipantJoined => (
            "New participant",
            format!("A new participant joined \"{title}\"."),
        ),
        NotificationType::ParticipantApproved => (
            "Participation approved",
            format!("Your request to join \"{title}\" was approved."),
        ),
        NotificationType::ParticipantRejected => (
            "Participation declined",
            format!("Your request to join \"{title}\" was declined."),
        ),
        NotificationType::ParticipantKicked => (
            "Removed from meeting",
            format!("You were removed from \"{title}\"."),
        ),
        NotificationType::ParticipantWithdrawn => {
            let message = match reason {
                Some(reason) => format!("A participant left \"{title}\": {reason}"),
                None => format!("A participant left \"{title}\"."),
            };
            ("Participant left", message)
        }
        NotificationType::MeetingCancelled => (
            "Meeting cancelled",
            format!("\"{title}\" was cancelled by the host."),
        ),
    };

    let mut context = json!({
        "meeting_id": meeting.meeting_id,
        "meeting_title": meeting.title,
        "participant_id": participant_id,
        "user_id": subject,
    });
    if let (Some(reason), Some(obj)) = (reason, context.as_object_mut()) {
        obj.insert("reason".to_string(), json!(reason));
    }

    NewNotification {
        recipient,
        notification_type,
        title: heading.to_string(),
        message,
        context_data: context,
    }
}

/// Cancellation notice for one approved participant.
pub fn cancellation_notice(recipient: UserId, meeting: &MeetingRow) -> NewNotification {
    NewNotification {
        recipient,
        notification_type: NotificationType::MeetingCancelled,
        title: "Meeting cancelled".to_string(),
        message: format!("\"{}\" was cancelled by the host.", meeting.title),
        context_data: json!({
            "meeting_id": meeting.meeting_id,
            "meeting_title": meeting.title,
            "host_id": meeting.host_id,
        }),
    }
}
