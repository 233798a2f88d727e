//! Background tasks for the meetup service.
//!
//! # Tasks
//!
//! - `notification_dispatcher` - Drains the notification outbox into a `NotificationSink`

pub mod notification_dispatcher;

pub use notification_dispatcher::{
    dispatch_pending, start_notification_dispatcher, DispatchStats, NotificationDispatcherConfig,
};
