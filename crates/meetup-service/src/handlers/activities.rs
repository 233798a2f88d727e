//! Activity and attendance handlers.
//!
//! - `POST /api/v1/meetings/:id/activities` - create (host or approved participant)
//! - `GET /api/v1/meetings/:id/activities` - list by start time
//! - `PUT /api/v1/activities/:id/attendance` - respond, with conflict detection

use super::json_body;
use crate::errors::MeetupError;
use crate::middleware::CallerIdentity;
use crate::models::{
    ActivityResponse, AttendanceOutcome, CreateActivityRequest, UpdateAttendanceRequest,
};
use crate::routes::AppState;
use crate::services::{ActivityService, AttendanceService};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[instrument(skip_all, name = "meetup.handlers.create_activity", fields(meeting_id = %meeting_id))]
pub async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(meeting_id): Path<Uuid>,
    payload: Result<Json<CreateActivityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActivityResponse>), MeetupError> {
    let request = json_body(payload)?;
    let activity =
        ActivityService::create_activity(&state.pool, meeting_id, caller.user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

#[instrument(skip_all, name = "meetup.handlers.list_activities", fields(meeting_id = %meeting_id))]
pub async fn list_activities(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<Uuid>,
) -> Result<Json<Vec<ActivityResponse>>, MeetupError> {
    let activities = ActivityService::list_activities(&state.pool, meeting_id).await?;
    Ok(Json(activities))
}

/// Always 200; a conflict is reported in the body with `has_conflict = true`.
#[instrument(skip_all, name = "meetup.handlers.update_attendance", fields(activity_id = %activity_id))]
pub async fn update_attendance(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(activity_id): Path<Uuid>,
    payload: Result<Json<UpdateAttendanceRequest>, JsonRejection>,
) -> Result<Json<AttendanceOutcome>, MeetupError> {
    let request = json_body(payload)?;
    let outcome = AttendanceService::update_attendance(
        &state.pool,
        state.config.calendar_offset,
        activity_id,
        caller.user_id,
        request.status,
        request.confirmed,
    )
    .await?;
    Ok(Json(outcome))
}
