//! Meetup service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic where they
//! could leak internal details. Actual errors are logged server-side.

use crate::models::ParticipantStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Meetup service error type.
///
/// Maps to HTTP status codes:
/// - Database, Internal: 500 Internal Server Error
/// - InvalidToken: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
/// - BadRequest: 400 Bad Request
/// - InvalidState, InvalidTransition, CapacityExceeded, DuplicateApplication,
///   AlreadyJoined: 409 Conflict
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum MeetupError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: ParticipantStatus,
        to: ParticipantStatus,
    },

    #[error("Meeting is at capacity")]
    CapacityExceeded,

    #[error("Application already pending")]
    DuplicateApplication,

    #[error("Already joined this meeting")]
    AlreadyJoined,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl MeetupError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            MeetupError::Database(_) | MeetupError::Internal => 500,
            MeetupError::InvalidToken(_) => 401,
            MeetupError::NotFound(_) => 404,
            MeetupError::Forbidden(_) => 403,
            MeetupError::BadRequest(_) => 400,
            MeetupError::InvalidState(_)
            | MeetupError::InvalidTransition { .. }
            | MeetupError::CapacityExceeded
            | MeetupError::DuplicateApplication
            | MeetupError::AlreadyJoined => 409,
            MeetupError::ServiceUnavailable(_) => 503,
        }
    }

    /// Short label used for the `outcome` metric dimension.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            MeetupError::Database(_) | MeetupError::Internal => "error",
            MeetupError::InvalidToken(_) => "unauthorized",
            MeetupError::NotFound(_) => "not_found",
            MeetupError::Forbidden(_) => "forbidden",
            MeetupError::BadRequest(_) => "bad_request",
            MeetupError::InvalidState(_) => "invalid_state",
            MeetupError::InvalidTransition { .. } => "invalid_transition",
            MeetupError::CapacityExceeded => "capacity_exceeded",
            MeetupError::DuplicateApplication => "duplicate_application",
            MeetupError::AlreadyJoined => "already_joined",
            MeetupError::ServiceUnavailable(_) => "unavailable",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for MeetupError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            MeetupError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "meetup.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            MeetupError::InvalidToken(reason) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason.clone())
            }
            MeetupError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            MeetupError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone()),
            MeetupError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            MeetupError::InvalidState(reason) => {
                (StatusCode::CONFLICT, "INVALID_STATE", reason.clone())
            }
            MeetupError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", self.to_string())
            }
            MeetupError::CapacityExceeded => {
                (StatusCode::CONFLICT, "CAPACITY_EXCEEDED", self.to_string())
            }
            MeetupError::DuplicateApplication => (
                StatusCode::CONFLICT,
                "DUPLICATE_APPLICATION",
                self.to_string(),
            ),
            MeetupError::AlreadyJoined => {
                (StatusCode::CONFLICT, "ALREADY_JOINED", self.to_string())
            }
            MeetupError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "meetup.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            MeetupError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"meetup-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Convert sqlx errors to MeetupError
impl From<sqlx::Error> for MeetupError {
    fn from(err: sqlx::Error) -> Self {
        MeetupError::Database(err.to_string())
    }
}

impl From<common::jwt::JwtValidationError> for MeetupError {
    fn from(err: common::jwt::JwtValidationError) -> Self {
        MeetupError::InvalidToken(err.to_string())
    }
}

/// Returns true when the error is a Postgres unique-key violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code == "23505"),
        _ => false,
    }
}
