//! HTTP routes for the meetup service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, optional_user_auth, require_user_auth, AuthState};
use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use common::jwt::UserTokenValidator;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
}

/// Build the application routes.
///
/// - `/health`, `/ready`, `/metrics` - public, unversioned
/// - `GET /api/v1/meetings/:id` - public, optional bearer token for viewer flags
/// - everything else under `/api/v1` - bearer token required
///
/// Layers, innermost first: 30 second timeout, TraceLayer, HTTP metrics.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let clock_skew = Duration::from_secs(state.config.jwt_clock_skew_seconds.unsigned_abs());
    let validator = Arc::new(UserTokenValidator::new(&state.config.jwt_secret, clock_skew));
    let auth_state = Arc::new(AuthState { validator });

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let viewer_routes = Router::new()
        .route("/api/v1/meetings/:id", get(handlers::get_meeting))
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            optional_user_auth,
        ))
        .with_state(state.clone());

    let protected_routes = Router::new()
        // Meetings
        .route("/api/v1/meetings", post(handlers::create_meeting))
        .route(
            "/api/v1/meetings/:id",
            patch(handlers::update_meeting).delete(handlers::delete_meeting),
        )
        .route("/api/v1/meetings/:id/cancel", post(handlers::cancel_meeting))
        // Participation
        .route(
            "/api/v1/meetings/:id/participants",
            post(handlers::apply).get(handlers::list_participants),
        )
        .route(
            "/api/v1/meetings/:id/participants/withdraw",
            post(handlers::withdraw),
        )
        .route(
            "/api/v1/meetings/:id/participants/me",
            delete(handlers::cancel_application),
        )
        .route(
            "/api/v1/meetings/:id/participants/:participant_id",
            patch(handlers::update_participant_status),
        )
        // Activities and attendance
        .route(
            "/api/v1/meetings/:id/activities",
            post(handlers::create_activity).get(handlers::list_activities),
        )
        .route(
            "/api/v1/activities/:id/attendance",
            put(handlers::update_attendance),
        )
        // Caller projections
        .route("/api/v1/me/participations", get(handlers::my_participations))
        .route("/api/v1/me/calendar", get(handlers::my_calendar))
        .route_layer(middleware::from_fn_with_state(auth_state, require_user_auth))
        .with_state(state);

    public_routes
        .merge(metrics_routes)
        .merge(viewer_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        // Outermost, so framework-level rejections are counted too.
        .layer(middleware::from_fn(http_metrics_middleware))
}
