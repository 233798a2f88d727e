//! Meetup service models.
//!
//! Status enums are stored as uppercase strings in Postgres and mapped
//! explicitly at the repository boundary (`as_db_str` / `from_db_str`).

use crate::errors::MeetupError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod activities;
pub mod meetings;
pub mod notifications;
pub mod participants;

pub use activities::*;
pub use meetings::*;
pub use notifications::*;
pub use participants::*;

/// Meeting lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingStatus {
    /// Created but not yet open for applications.
    Draft,
    /// Accepting applications.
    Recruiting,
    /// In progress.
    Ongoing,
    /// Finished normally.
    Completed,
    /// Cancelled by the host. Never reverted.
    Cancelled,
}

impl MeetingStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MeetingStatus::Draft => "DRAFT",
            MeetingStatus::Recruiting => "RECRUITING",
            MeetingStatus::Ongoing => "ONGOING",
            MeetingStatus::Completed => "COMPLETED",
            MeetingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(MeetingStatus::Draft),
            "RECRUITING" => Some(MeetingStatus::Recruiting),
            "ONGOING" => Some(MeetingStatus::Ongoing),
            "COMPLETED" => Some(MeetingStatus::Completed),
            "CANCELLED" => Some(MeetingStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Participant record status.
///
/// A record is created on first application and afterwards only ever
/// overwritten in place. `Kicked` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Kicked,
    Attended,
}

impl ParticipantStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Pending => "PENDING",
            ParticipantStatus::Approved => "APPROVED",
            ParticipantStatus::Rejected => "REJECTED",
            ParticipantStatus::Cancelled => "CANCELLED",
            ParticipantStatus::Kicked => "KICKED",
            ParticipantStatus::Attended => "ATTENDED",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(ParticipantStatus::Pending),
            "APPROVED" => Some(ParticipantStatus::Approved),
            "REJECTED" => Some(ParticipantStatus::Rejected),
            "CANCELLED" => Some(ParticipantStatus::Cancelled),
            "KICKED" => Some(ParticipantStatus::Kicked),
            "ATTENDED" => Some(ParticipantStatus::Attended),
            _ => None,
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Attendance response for a single activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Pending,
    Attending,
    NotAttending,
    Maybe,
}

impl AttendanceStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Pending => "PENDING",
            AttendanceStatus::Attending => "ATTENDING",
            AttendanceStatus::NotAttending => "NOT_ATTENDING",
            AttendanceStatus::Maybe => "MAYBE",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(AttendanceStatus::Pending),
            "ATTENDING" => Some(AttendanceStatus::Attending),
            "NOT_ATTENDING" => Some(AttendanceStatus::NotAttending),
            "MAYBE" => Some(AttendanceStatus::Maybe),
            _ => None,
        }
    }
}

/// Map an unknown stored status string to a database error.
///
/// The schema CHECK constraints make this unreachable unless the table was
/// edited by hand.
pub(crate) fn unknown_status(kind: &str, value: &str) -> MeetupError {
    MeetupError::Database(format!("Unknown {kind} status '{value}' in database"))
}

/// Trimmed character length check shared by request validators.
pub(crate) fn validate_text(
    field: &str,
    value: &str,
    min_chars: usize,
    max_chars: usize,
) -> Result<(), MeetupError> {
    let len = value.trim().chars().count();
    if len < min_chars || len > max_chars {
        return Err(MeetupError::BadRequest(format!(
            "{field} must be between {min_chars} and {max_chars} characters"
        )));
    }
    Ok(())
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Database connectivity status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
