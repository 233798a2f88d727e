//! HTTP request handlers for the meetup service.
//!
//! Handlers map one route onto one service operation. They extract the
//! caller from request extensions and convert request bodies; all decisions
//! are made in the service layer.

use crate::errors::MeetupError;
use axum::extract::rejection::JsonRejection;
use axum::Json;

pub mod activities;
pub mod health;
pub mod me;
pub mod meetings;
pub mod metrics;
pub mod participants;

pub use activities::{create_activity, list_activities, update_attendance};
pub use health::{health_check, readiness_check};
pub use me::{my_calendar, my_participations};
pub use meetings::{cancel_meeting, create_meeting, delete_meeting, get_meeting, update_meeting};
pub use metrics::metrics_handler;
pub use participants::{
    apply, cancel_application, list_participants, update_participant_status, withdraw,
};

/// Unwrap a JSON body, turning every rejection into a 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, MeetupError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(target: "meetup.handlers", error = %rejection.body_text(), "Rejected request body");
        MeetupError::BadRequest(rejection.body_text())
    })
}
