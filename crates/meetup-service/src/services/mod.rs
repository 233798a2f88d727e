//! Service layer for the meetup service.
//!
//! # Components
//!
//! - `transitions` - participant status table and its side effects
//! - `capacity_guard` - meeting row lock and the open-seat check
//! - `participation` - apply, host decisions, withdraw, cancel application
//! - `meeting_lifecycle` - create, update, cancel with fan-out, soft delete
//! - `activities` - activity scheduling within a meeting
//! - `attendance` - attendance responses and schedule conflict detection
//! - `notification_sink` - delivery targets for the notification outbox

pub mod access;
pub mod activities;
pub mod attendance;
pub mod capacity_guard;
pub mod meeting_lifecycle;
pub mod notices;
pub mod notification_sink;
pub mod participation;
pub mod transitions;

pub use activities::ActivityService;
pub use attendance::AttendanceService;
pub use capacity_guard::{CapacityGuard, LockedMeeting};
pub use meeting_lifecycle::MeetingLifecycleService;
pub use notification_sink::mock::MockNotificationSink;
pub use notification_sink::{LoggingNotificationSink, NotificationSink, WebhookNotificationSink};
pub use participation::ParticipationService;
pub use transitions::{transition, ParticipationEvent, SideEffect, Transition};
