//! Atomic check-and-admit primitive.
//!
//! A [`LockedMeeting`] can only be obtained by taking the meeting row lock, and
//! [`CapacityGuard::require_open_seat`] only accepts a `LockedMeeting`. The
//! APPROVED count is therefore always read while the lock is held, and the
//! write that follows in the same transaction cannot race another admission
//! for the same meeting.

use crate::errors::MeetupError;
use crate::models::{MeetingRow, MeetingStatus};
use crate::observability::metrics;
use crate::repositories::{MeetingsRepository, ParticipantsRepository};
use sqlx::PgConnection;
use tracing::{debug, instrument};
use uuid::Uuid;

/// A meeting row locked `FOR UPDATE` in the current transaction.
#[derive(Debug)]
pub struct LockedMeeting {
    row: MeetingRow,
    status: MeetingStatus,
}

impl LockedMeeting {
    pub fn row(&self) -> &MeetingRow {
        &self.row
    }

    pub fn status(&self) -> MeetingStatus {
        self.status
    }

    pub fn id(&self) -> Uuid {
        self.row.meeting_id
    }

    pub fn into_row(self) -> MeetingRow {
        self.row
    }
}

pub struct CapacityGuard;

impl CapacityGuard {
    /// Lock a live meeting for the rest of the transaction.
    ///
    /// Returns `NotFound` for unknown or soft-deleted meetings.
    pub async fn lock(
        conn: &mut PgConnection,
        meeting_id: Uuid,
    ) -> Result<LockedMeeting, MeetupError> {
        let row = MeetingsRepository::lock_live(conn, meeting_id)
            .await?
            .ok_or_else(|| MeetupError::NotFound("Meeting not found".to_string()))?;
        let status = row.status()?;
        Ok(LockedMeeting { row, status })
    }

    /// Fail with `CapacityExceeded` unless one more APPROVED record fits.
    ///
    /// Returns the current APPROVED count.
    #[instrument(skip_all, name = "meetup.capacity.require_open_seat", fields(meeting_id = %meeting.id()))]
    pub async fn require_open_seat(
        conn: &mut PgConnection,
        meeting: &LockedMeeting,
    ) -> Result<i64, MeetupError> {
        let approved = ParticipantsRepository::count_approved(conn, meeting.id()).await?;
        let capacity = i64::from(meeting.row.capacity);

        if approved >= capacity {
            debug!(
                target: "meetup.services.capacity",
                meeting_id = %meeting.id(),
                approved,
                capacity,
                "Admission refused: meeting is full"
            );
            metrics::record_capacity_rejection();
            return Err(MeetupError::CapacityExceeded);
        }

        Ok(approved)
    }

    /// Current APPROVED count, read under the lock.
    pub async fn approved_count(
        conn: &mut PgConnection,
        meeting: &LockedMeeting,
    ) -> Result<i64, MeetupError> {
        ParticipantsRepository::count_approved(conn, meeting.id()).await
    }
}
