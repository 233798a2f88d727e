//! Repository layer for the meetup service.
//!
//! Provides database access following the Handler -> Service -> Repository
//! architecture. Single-statement reads accept any `PgExecutor` so they run
//! against the pool or inside a caller's transaction; writes that must share
//! a transaction take `&mut PgConnection`.
//!
//! Meetings are always read through the `live_meetings` view so soft-deleted
//! rows never surface.

pub mod activities;
pub mod attendances;
pub mod meetings;
pub mod notifications;
pub mod participants;
pub mod users;

pub use activities::ActivitiesRepository;
pub use attendances::AttendancesRepository;
pub use meetings::{MeetingsRepository, NewMeeting};
pub use notifications::NotificationOutboxRepository;
pub use participants::ParticipantsRepository;
pub use users::UsersRepository;
