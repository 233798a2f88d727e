//! Meeting handlers.
//!
//! - `POST /api/v1/meetings` - create (authenticated)
//! - `GET /api/v1/meetings/:id` - detail (public; viewer flags when authenticated)
//! - `PATCH /api/v1/meetings/:id` - update (host)
//! - `POST /api/v1/meetings/:id/cancel` - cancel with participant fan-out (host)
//! - `DELETE /api/v1/meetings/:id` - soft delete (host)

use super::json_body;
use crate::errors::MeetupError;
use crate::middleware::CallerIdentity;
use crate::models::{
    CancelMeetingResponse, CreateMeetingRequest, MeetingDetailResponse, MeetingResponse,
    UpdateMeetingRequest,
};
use crate::routes::AppState;
use crate::services::MeetingLifecycleService;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[instrument(skip_all, name = "meetup.handlers.create_meeting")]
pub async fn create_meeting(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    payload: Result<Json<CreateMeetingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MeetingResponse>), MeetupError> {
    let request = json_body(payload)?;
    let meeting = MeetingLifecycleService::create(&state.pool, caller.user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

#[instrument(skip_all, name = "meetup.handlers.get_meeting", fields(meeting_id = %meeting_id))]
pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<Uuid>,
    caller: Option<Extension<CallerIdentity>>,
) -> Result<Json<MeetingDetailResponse>, MeetupError> {
    let viewer = caller.map(|Extension(c)| c.user_id);
    let meeting = MeetingLifecycleService::find_one(&state.pool, meeting_id, viewer).await?;
    Ok(Json(meeting))
}

#[instrument(skip_all, name = "meetup.handlers.update_meeting", fields(meeting_id = %meeting_id))]
pub async fn update_meeting(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(meeting_id): Path<Uuid>,
    payload: Result<Json<UpdateMeetingRequest>, JsonRejection>,
) -> Result<Json<MeetingResponse>, MeetupError> {
    let patch = json_body(payload)?;
    let meeting =
        MeetingLifecycleService::update(&state.pool, meeting_id, caller.user_id, &patch).await?;
    Ok(Json(meeting))
}

#[instrument(skip_all, name = "meetup.handlers.cancel_meeting", fields(meeting_id = %meeting_id))]
pub async fn cancel_meeting(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(meeting_id): Path<Uuid>,
) -> Result<Json<CancelMeetingResponse>, MeetupError> {
    let response = MeetingLifecycleService::cancel(&state.pool, meeting_id, caller.user_id).await?;
    Ok(Json(response))
}

#[instrument(skip_all, name = "meetup.handlers.delete_meeting", fields(meeting_id = %meeting_id))]
pub async fn delete_meeting(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(meeting_id): Path<Uuid>,
) -> Result<StatusCode, MeetupError> {
    MeetingLifecycleService::delete(&state.pool, meeting_id, caller.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
