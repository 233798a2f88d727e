//! Participation handlers.
//!
//! - `POST /api/v1/meetings/:id/participants` - apply
//! - `GET /api/v1/meetings/:id/participants?status=` - list
//! - `PATCH /api/v1/meetings/:id/participants/:participant_id` - host decision
//! - `POST /api/v1/meetings/:id/participants/withdraw` - leave after approval
//! - `DELETE /api/v1/meetings/:id/participants/me` - cancel a pending application

use super::json_body;
use crate::errors::MeetupError;
use crate::middleware::CallerIdentity;
use crate::models::{
    ParticipantListItem, ParticipantResponse, ParticipantStatusQuery,
    UpdateParticipantStatusRequest, WithdrawRequest,
};
use crate::routes::AppState;
use crate::services::ParticipationService;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[instrument(skip_all, name = "meetup.handlers.apply", fields(meeting_id = %meeting_id))]
pub async fn apply(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(meeting_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ParticipantResponse>), MeetupError> {
    let participant = ParticipationService::apply(&state.pool, meeting_id, caller.user_id).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

#[instrument(skip_all, name = "meetup.handlers.list_participants", fields(meeting_id = %meeting_id))]
pub async fn list_participants(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(meeting_id): Path<Uuid>,
    Query(query): Query<ParticipantStatusQuery>,
) -> Result<Json<Vec<ParticipantListItem>>, MeetupError> {
    let participants =
        ParticipationService::find_by_meeting(&state.pool, meeting_id, caller.user_id, query.status)
            .await?;
    Ok(Json(participants))
}

#[instrument(
    skip_all,
    name = "meetup.handlers.update_participant_status",
    fields(meeting_id = %meeting_id, participant_id = %participant_id)
)]
pub async fn update_participant_status(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path((meeting_id, participant_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<UpdateParticipantStatusRequest>, JsonRejection>,
) -> Result<Json<ParticipantResponse>, MeetupError> {
    let request = json_body(payload)?;
    let participant = ParticipationService::update_status(
        &state.pool,
        meeting_id,
        participant_id,
        caller.user_id,
        request.status,
    )
    .await?;
    Ok(Json(participant))
}

/// The body is optional; a request without one withdraws without a reason.
#[instrument(skip_all, name = "meetup.handlers.withdraw", fields(meeting_id = %meeting_id))]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(meeting_id): Path<Uuid>,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<Json<ParticipantResponse>, MeetupError> {
    let request = match payload {
        Err(JsonRejection::MissingJsonContentType(_)) => WithdrawRequest::default(),
        other => json_body(other)?,
    };
    let participant = ParticipationService::withdraw(
        &state.pool,
        meeting_id,
        caller.user_id,
        request.reason.as_deref(),
    )
    .await?;
    Ok(Json(participant))
}

#[instrument(skip_all, name = "meetup.handlers.cancel_application", fields(meeting_id = %meeting_id))]
pub async fn cancel_application(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(meeting_id): Path<Uuid>,
) -> Result<Json<ParticipantResponse>, MeetupError> {
    let participant =
        ParticipationService::cancel_application(&state.pool, meeting_id, caller.user_id).await?;
    Ok(Json(participant))
}
