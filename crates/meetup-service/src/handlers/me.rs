//! Caller-scoped read projections.
//!
//! - `GET /api/v1/me/participations?status=`
//! - `GET /api/v1/me/calendar?start=&end=`

use crate::errors::MeetupError;
use crate::middleware::CallerIdentity;
use crate::models::{CalendarEvent, CalendarQuery, MyParticipationResponse, ParticipantStatusQuery};
use crate::routes::AppState;
use crate::services::{AttendanceService, ParticipationService};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip_all, name = "meetup.handlers.my_participations")]
pub async fn my_participations(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<ParticipantStatusQuery>,
) -> Result<Json<Vec<MyParticipationResponse>>, MeetupError> {
    let participations =
        ParticipationService::find_my_participations(&state.pool, caller.user_id, query.status)
            .await?;
    Ok(Json(participations))
}

#[instrument(skip_all, name = "meetup.handlers.my_calendar")]
pub async fn my_calendar(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<CalendarEvent>>, MeetupError> {
    let events = AttendanceService::my_calendar_events(
        &state.pool,
        state.config.calendar_offset,
        caller.user_id,
        &query,
    )
    .await?;
    Ok(Json(events))
}
