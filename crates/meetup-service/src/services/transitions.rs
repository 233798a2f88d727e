//! Participant admission state machine.
//!
//! ```text
//! NONE      --apply-------> PENDING | APPROVED (auto-approve)
//! PENDING   --hostApprove-> APPROVED
//! PENDING   --hostReject--> REJECTED
//! PENDING   --selfCancel--> CANCELLED
//! APPROVED  --hostKick----> KICKED
//! APPROVED  --selfWithdraw> CANCELLED
//! REJECTED  --apply-------> PENDING | APPROVED (auto-approve)
//! CANCELLED --apply-------> PENDING | APPROVED (auto-approve)
//! KICKED    (terminal)
//! ```
//!
//! `transition` is the only place that decides whether a move is legal.
//! It is pure; the side effects it returns are carried out by
//! `ParticipationService` inside the same transaction as the status write.

use crate::errors::MeetupError;
use crate::models::{NotificationType, ParticipantStatus};

/// Something that happens to a participant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationEvent {
    /// The user applies. `auto_approve` mirrors the meeting setting.
    Apply { auto_approve: bool },
    HostApprove,
    HostReject,
    HostKick,
    SelfWithdraw,
    SelfCancel,
}

impl ParticipationEvent {
    /// Host event that targets `status`, if the host may request it at all.
    pub fn from_host_target(status: ParticipantStatus) -> Option<Self> {
        match status {
            ParticipantStatus::Approved => Some(ParticipationEvent::HostApprove),
            ParticipantStatus::Rejected => Some(ParticipationEvent::HostReject),
            ParticipantStatus::Kicked => Some(ParticipationEvent::HostKick),
            _ => None,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            ParticipationEvent::Apply { .. } => "apply",
            ParticipationEvent::HostApprove => "host_approve",
            ParticipationEvent::HostReject => "host_reject",
            ParticipationEvent::HostKick => "host_kick",
            ParticipationEvent::SelfWithdraw => "self_withdraw",
            ParticipationEvent::SelfCancel => "self_cancel",
        }
    }
}

/// Work that must commit together with a status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Fail with `CapacityExceeded` unless APPROVED count < capacity.
    RequireOpenSeat,
    /// Notify the meeting host.
    NotifyHost(NotificationType),
    /// Notify the participant whose record changed.
    NotifyParticipant(NotificationType),
}

/// A legal move and the effects that go with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: ParticipantStatus,
    pub effects: &'static [SideEffect],
}

/// A PENDING application into a full meeting is refused as well.
const APPLY_PENDING: &[SideEffect] = &[
    SideEffect::RequireOpenSeat,
    SideEffect::NotifyHost(NotificationType::ParticipationRequested),
];
const APPLY_APPROVED: &[SideEffect] = &[
    SideEffect::RequireOpenSeat,
    SideEffect::NotifyHost(NotificationType::ParticipantJoined),
];
const HOST_APPROVE: &[SideEffect] = &[
    SideEffect::RequireOpenSeat,
    SideEffect::NotifyParticipant(NotificationType::ParticipantApproved),
];
const HOST_REJECT: &[SideEffect] = &[SideEffect::NotifyParticipant(
    NotificationType::ParticipantRejected,
)];
const HOST_KICK: &[SideEffect] = &[SideEffect::NotifyParticipant(
    NotificationType::ParticipantKicked,
)];
const SELF_WITHDRAW: &[SideEffect] = &[SideEffect::NotifyHost(
    NotificationType::ParticipantWithdrawn,
)];
const SELF_CANCEL: &[SideEffect] = &[];

/// Decide the next status for `event` applied to `current` (`None` = no record).
pub fn transition(
    current: Option<ParticipantStatus>,
    event: ParticipationEvent,
) -> Result<Transition, MeetupError> {
    use ParticipantStatus as S;
    use ParticipationEvent as E;

    let (next, effects) = match (current, event) {
        // Application and re-application
        (None | Some(S::Rejected) | Some(S::Cancelled), E::Apply { auto_approve: false }) => {
            (S::Pending, APPLY_PENDING)
        }
        (None | Some(S::Rejected) | Some(S::Cancelled), E::Apply { auto_approve: true }) => {
            (S::Approved, APPLY_APPROVED)
        }
        (Some(S::Pending), E::Apply { .. }) => return Err(MeetupError::DuplicateApplication),
        (Some(S::Approved) | Some(S::Attended), E::Apply { .. }) => {
            return Err(MeetupError::AlreadyJoined)
        }
        (Some(S::Kicked), E::Apply { .. }) => {
            return Err(MeetupError::Forbidden(
                "You were removed from this meeting and cannot apply again".to_string(),
            ))
        }

        // Host decisions
        (Some(S::Pending), E::HostApprove) => (S::Approved, HOST_APPROVE),
        (Some(S::Pending), E::HostReject) => (S::Rejected, HOST_REJECT),
        (Some(S::Approved), E::HostKick) => (S::Kicked, HOST_KICK),
        (Some(from), E::HostApprove | E::HostReject | E::HostKick) => {
            let to = match event {
                E::HostApprove => S::Approved,
                E::HostReject => S::Rejected,
                _ => S::Kicked,
            };
            return Err(MeetupError::InvalidTransition { from, to });
        }

        // Self-service exits
        (Some(S::Approved), E::SelfWithdraw) => (S::Cancelled, SELF_WITHDRAW),
        (Some(_), E::SelfWithdraw) => {
            return Err(MeetupError::InvalidState(
                "Only approved participants can withdraw".to_string(),
            ))
        }
        (Some(S::Pending), E::SelfCancel) => (S::Cancelled, SELF_CANCEL),
        (Some(_), E::SelfCancel) => {
            return Err(MeetupError::InvalidState(
                "Only pending applications can be cancelled".to_string(),
            ))
        }

        (None, E::HostApprove | E::HostReject | E::HostKick) => {
            return Err(MeetupError::NotFound("Participant not found".to_string()))
        }
        (None, E::SelfWithdraw | E::SelfCancel) => {
            return Err(MeetupError::NotFound(
                "You have not applied to this meeting".to_string(),
            ))
        }
    };

    Ok(Transition { next, effects })
}
