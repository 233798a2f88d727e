//! Participation service.
//!
//! Every write follows the same shape:
//! 1. Begin a transaction and lock the meeting row (`CapacityGuard::lock`)
//! 2. Check caller preconditions
//! 3. Ask `transition` for the next status and its side effects
//! 4. Enforce `RequireOpenSeat` under the lock
//! 5. Write the participant record and enqueue notifications
//! 6. Commit
//!
//! Because all writes for one meeting hold its row lock, the APPROVED count
//! read in step 4 cannot change before step 6.

use crate::errors::MeetupError;
use crate::models::{
    normalize_leave_reason, MeetingStatus, MyParticipationResponse, NewNotification,
    ParticipantListItem, ParticipantResponse, ParticipantRow, ParticipantStatus,
};
use crate::observability::metrics;
use crate::repositories::{
    MeetingsRepository, NotificationOutboxRepository, ParticipantsRepository, UsersRepository,
};
use crate::services::access::ensure_host;
use crate::services::capacity_guard::{CapacityGuard, LockedMeeting};
use crate::services::notices::participation_notice;
use crate::services::transitions::{transition, ParticipationEvent, SideEffect, Transition};
use common::types::UserId;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

pub struct ParticipationService;

impl ParticipationService {
    /// Apply to a meeting, or re-apply after rejection or cancellation.
    ///
    /// # Errors
    ///
    /// - `Forbidden` - caller is the host, a block exists in either direction,
    ///   or the caller was kicked
    /// - `InvalidState` - meeting is not RECRUITING
    /// - `CapacityExceeded` - meeting is full
    /// - `DuplicateApplication` / `AlreadyJoined`
    #[instrument(skip_all, name = "meetup.service.apply", fields(meeting_id = %meeting_id, user_id = %user_id))]
    pub async fn apply(
        pool: &PgPool,
        meeting_id: Uuid,
        user_id: UserId,
    ) -> Result<ParticipantResponse, MeetupError> {
        let result = Self::apply_locked(pool, meeting_id, user_id).await;
        record_outcome("apply", &result);
        result
    }

    async fn apply_locked(
        pool: &PgPool,
        meeting_id: Uuid,
        user_id: UserId,
    ) -> Result<ParticipantResponse, MeetupError> {
        let mut tx = pool.begin().await?;
        let meeting = CapacityGuard::lock(&mut tx, meeting_id).await?;

        if meeting.row().is_hosted_by(user_id) {
            return Err(MeetupError::Forbidden(
                "The host cannot apply to their own meeting".to_string(),
            ));
        }
        if meeting.status() != MeetingStatus::Recruiting {
            return Err(MeetupError::InvalidState(
                "Meeting is not recruiting participants".to_string(),
            ));
        }
        if UsersRepository::is_blocked_between(&mut *tx, user_id.0, meeting.row().host_id).await? {
            return Err(MeetupError::Forbidden(
                "You cannot apply to this meeting".to_string(),
            ));
        }

        let existing =
            ParticipantsRepository::find_by_meeting_and_user(&mut *tx, meeting_id, user_id.0)
                .await?;
        let current = existing.as_ref().map(ParticipantRow::status).transpose()?;
        let step = transition(
            current,
            ParticipationEvent::Apply {
                auto_approve: meeting.row().auto_approve,
            },
        )?;

        enforce_guards(&mut tx, &meeting, &step).await?;

        // Re-application overwrites the old record and clears its leave reason.
        let record = match existing {
            None => ParticipantsRepository::insert(&mut tx, meeting_id, user_id.0, step.next).await?,
            Some(row) => {
                ParticipantsRepository::update_status(&mut tx, row.participant_id, step.next, None)
                    .await?
            }
        };

        enqueue_notices(&mut tx, &meeting, &step, &record, None).await?;
        tx.commit().await?;

        info!(
            target: "meetup.services.participation",
            meeting_id = %meeting_id,
            user_id = %user_id,
            previous = ?current,
            status = %step.next,
            "Application recorded"
        );

        record.into_response()
    }

    /// Host decision on a participant: approve, reject or kick.
    ///
    /// # Errors
    ///
    /// - `Forbidden` - caller is not the host
    /// - `NotFound` - meeting or participant does not exist
    /// - `InvalidTransition` - `(current, target)` is not in the table
    /// - `InvalidState` - approving or rejecting on a cancelled meeting
    /// - `CapacityExceeded` - approving into a full meeting
    #[instrument(
        skip_all,
        name = "meetup.service.update_participant_status",
        fields(meeting_id = %meeting_id, participant_id = %participant_id, target_status = %target)
    )]
    pub async fn update_status(
        pool: &PgPool,
        meeting_id: Uuid,
        participant_id: Uuid,
        caller: UserId,
        target: ParticipantStatus,
    ) -> Result<ParticipantResponse, MeetupError> {
        let event = ParticipationEvent::from_host_target(target);
        let result =
            Self::update_status_locked(pool, meeting_id, participant_id, caller, target, event)
                .await;
        record_outcome(event.map_or("host_other", |e| e.label()), &result);
        result
    }

    async fn update_status_locked(
        pool: &PgPool,
        meeting_id: Uuid,
        participant_id: Uuid,
        caller: UserId,
        target: ParticipantStatus,
        event: Option<ParticipationEvent>,
    ) -> Result<ParticipantResponse, MeetupError> {
        let mut tx = pool.begin().await?;
        let meeting = CapacityGuard::lock(&mut tx, meeting_id).await?;
        ensure_host(meeting.row(), caller)?;

        let record = ParticipantsRepository::find_by_id(&mut *tx, meeting_id, participant_id)
            .await?
            .ok_or_else(|| MeetupError::NotFound("Participant not found".to_string()))?;
        let current = record.status()?;

        let event = event.ok_or(MeetupError::InvalidTransition {
            from: current,
            to: target,
        })?;
        let step = transition(Some(current), event)?;

        // Kicks stay possible after cancellation; admission decisions do not.
        if meeting.status() == MeetingStatus::Cancelled && event != ParticipationEvent::HostKick {
            return Err(MeetupError::InvalidState(
                "Meeting has been cancelled".to_string(),
            ));
        }

        enforce_guards(&mut tx, &meeting, &step).await?;
        let updated =
            ParticipantsRepository::update_status(&mut tx, participant_id, step.next, None).await?;
        enqueue_notices(&mut tx, &meeting, &step, &updated, None).await?;
        tx.commit().await?;

        info!(
            target: "meetup.services.participation",
            meeting_id = %meeting_id,
            participant_id = %participant_id,
            from = %current,
            to = %step.next,
            "Host updated participant status"
        );

        updated.into_response()
    }

    /// Leave a meeting the caller was approved for.
    ///
    /// The trimmed reason is stored on the record and forwarded to the host.
    #[instrument(skip_all, name = "meetup.service.withdraw", fields(meeting_id = %meeting_id, user_id = %user_id))]
    pub async fn withdraw(
        pool: &PgPool,
        meeting_id: Uuid,
        user_id: UserId,
        reason: Option<&str>,
    ) -> Result<ParticipantResponse, MeetupError> {
        let result: Result<ParticipantResponse, MeetupError> = async {
            let reason = normalize_leave_reason(reason)?;
            Self::self_exit(
                pool,
                meeting_id,
                user_id,
                ParticipationEvent::SelfWithdraw,
                reason.as_deref(),
            )
            .await
        }
        .await;
        record_outcome(ParticipationEvent::SelfWithdraw.label(), &result);
        result
    }

    /// Cancel a pending application. No notification is sent.
    #[instrument(skip_all, name = "meetup.service.cancel_application", fields(meeting_id = %meeting_id, user_id = %user_id))]
    pub async fn cancel_application(
        pool: &PgPool,
        meeting_id: Uuid,
        user_id: UserId,
    ) -> Result<ParticipantResponse, MeetupError> {
        let result =
            Self::self_exit(pool, meeting_id, user_id, ParticipationEvent::SelfCancel, None).await;
        record_outcome(ParticipationEvent::SelfCancel.label(), &result);
        result
    }

    async fn self_exit(
        pool: &PgPool,
        meeting_id: Uuid,
        user_id: UserId,
        event: ParticipationEvent,
        reason: Option<&str>,
    ) -> Result<ParticipantResponse, MeetupError> {
        let mut tx = pool.begin().await?;
        let meeting = CapacityGuard::lock(&mut tx, meeting_id).await?;

        let existing =
            ParticipantsRepository::find_by_meeting_and_user(&mut *tx, meeting_id, user_id.0)
                .await?;
        let current = existing.as_ref().map(ParticipantRow::status).transpose()?;
        let step = transition(current, event)?;

        let Some(record) = existing else {
            return Err(MeetupError::NotFound(
                "You have not applied to this meeting".to_string(),
            ));
        };

        let updated =
            ParticipantsRepository::update_status(&mut tx, record.participant_id, step.next, reason)
                .await?;
        enqueue_notices(&mut tx, &meeting, &step, &updated, reason).await?;
        tx.commit().await?;

        info!(
            target: "meetup.services.participation",
            meeting_id = %meeting_id,
            user_id = %user_id,
            event = event.label(),
            "Participant left meeting"
        );

        updated.into_response()
    }

    /// Participants of a meeting.
    ///
    /// The host sees every record; anyone else sees APPROVED records only.
    #[instrument(skip_all, name = "meetup.service.find_participants", fields(meeting_id = %meeting_id))]
    pub async fn find_by_meeting(
        pool: &PgPool,
        meeting_id: Uuid,
        caller: UserId,
        status: Option<ParticipantStatus>,
    ) -> Result<Vec<ParticipantListItem>, MeetupError> {
        let meeting = MeetingsRepository::find_live(pool, meeting_id)
            .await?
            .ok_or_else(|| MeetupError::NotFound("Meeting not found".to_string()))?;

        let filter = if meeting.is_hosted_by(caller) {
            status
        } else {
            match status {
                None | Some(ParticipantStatus::Approved) => Some(ParticipantStatus::Approved),
                Some(_) => return Ok(Vec::new()),
            }
        };

        ParticipantsRepository::list_for_meeting(pool, meeting_id, filter)
            .await?
            .into_iter()
            .map(|row| row.into_item())
            .collect()
    }

    /// The caller's own participant records on live meetings.
    #[instrument(skip_all, name = "meetup.service.find_my_participations", fields(user_id = %user_id))]
    pub async fn find_my_participations(
        pool: &PgPool,
        user_id: UserId,
        status: Option<ParticipantStatus>,
    ) -> Result<Vec<MyParticipationResponse>, MeetupError> {
        ParticipantsRepository::list_for_user(pool, user_id.0, status)
            .await?
            .into_iter()
            .map(|row| row.into_response())
            .collect()
    }
}

/// Run the guard effects of `step` while the meeting lock is held.
async fn enforce_guards(
    conn: &mut PgConnection,
    meeting: &LockedMeeting,
    step: &Transition,
) -> Result<(), MeetupError> {
    for effect in step.effects {
        if matches!(effect, SideEffect::RequireOpenSeat) {
            CapacityGuard::require_open_seat(&mut *conn, meeting).await?;
        }
    }
    Ok(())
}

/// Enqueue the notification effects of `step` in the caller's transaction.
async fn enqueue_notices(
    conn: &mut PgConnection,
    meeting: &LockedMeeting,
    step: &Transition,
    record: &ParticipantRow,
    reason: Option<&str>,
) -> Result<(), MeetupError> {
    let notices: Vec<NewNotification> = step
        .effects
        .iter()
        .filter_map(|effect| {
            let (notification_type, recipient) = match effect {
                SideEffect::NotifyHost(kind) => (*kind, meeting.row().host()),
                SideEffect::NotifyParticipant(kind) => (*kind, UserId(record.user_id)),
                SideEffect::RequireOpenSeat => return None,
            };
            Some(participation_notice(
                notification_type,
                recipient,
                meeting.row(),
                record.user_id,
                record.participant_id,
                reason,
            ))
        })
        .collect();

    NotificationOutboxRepository::enqueue_all(conn, &notices).await?;
    Ok(())
}

fn record_outcome<T>(event: &'static str, result: &Result<T, MeetupError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.outcome_label(),
    };
    metrics::record_participation_transition(event, outcome);
}
