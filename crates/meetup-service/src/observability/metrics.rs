//! Metrics definitions for the meetup service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `meetup_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: parameterized route templates, unknown paths collapse to `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `operation`: bounded by repository code
//! - `event` / `outcome`: bounded by `ParticipationEvent` and `MeetupError` variants
//! - `type`: bounded by `NotificationType`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("meetup_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("meetup_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `meetup_http_requests_total`, `meetup_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("meetup_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("meetup_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto its route template.
fn normalize_endpoint(path: &str) -> &'static str {
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();

    match segments.as_slice() {
        [""] => "/",
        ["", "health"] => "/health",
        ["", "ready"] => "/ready",
        ["", "metrics"] => "/metrics",
        ["", "api", "v1", "meetings"] => "/api/v1/meetings",
        ["", "api", "v1", "meetings", _] => "/api/v1/meetings/{id}",
        ["", "api", "v1", "meetings", _, "cancel"] => "/api/v1/meetings/{id}/cancel",
        ["", "api", "v1", "meetings", _, "activities"] => "/api/v1/meetings/{id}/activities",
        ["", "api", "v1", "meetings", _, "participants"] => "/api/v1/meetings/{id}/participants",
        ["", "api", "v1", "meetings", _, "participants", "withdraw"] => {
            "/api/v1/meetings/{id}/participants/withdraw"
        }
        ["", "api", "v1", "meetings", _, "participants", "me"] => {
            "/api/v1/meetings/{id}/participants/me"
        }
        ["", "api", "v1", "meetings", _, "participants", _] => {
            "/api/v1/meetings/{id}/participants/{participant_id}"
        }
        ["", "api", "v1", "activities", _, "attendance"] => "/api/v1/activities/{id}/attendance",
        ["", "api", "v1", "me", "participations"] => "/api/v1/me/participations",
        ["", "api", "v1", "me", "calendar"] => "/api/v1/me/calendar",
        _ => "/other",
    }
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `meetup_db_query_duration_seconds`, `meetup_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("meetup_db_query_duration_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());

    counter!("meetup_db_queries_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

// ============================================================================
// Participation Metrics
// ============================================================================

/// Record a participation state machine call.
///
/// Metric: `meetup_participation_transitions_total`
/// Labels: `event`, `outcome` ("success" or the error label)
pub fn record_participation_transition(event: &'static str, outcome: &'static str) {
    counter!("meetup_participation_transitions_total",
        "event" => event,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record an admission refused because the meeting was full.
///
/// Metric: `meetup_capacity_rejections_total`
pub fn record_capacity_rejection() {
    counter!("meetup_capacity_rejections_total").increment(1);
}

// ============================================================================
// Attendance Metrics
// ============================================================================

/// Record an attendance update that was held back by schedule conflicts.
///
/// Metric: `meetup_attendance_conflicts_total`
pub fn record_attendance_conflict() {
    counter!("meetup_attendance_conflicts_total").increment(1);
}

// ============================================================================
// Notification Metrics
// ============================================================================

/// Record outbox rows written in a state-change transaction.
///
/// Metric: `meetup_notifications_enqueued_total`
/// Labels: `type`
pub fn record_notifications_enqueued(notification_type: &'static str, count: u64) {
    counter!("meetup_notifications_enqueued_total",
        "type" => notification_type
    )
    .increment(count);
}

/// Record dispatcher delivery results.
///
/// Metric: `meetup_notifications_dispatched_total`
/// Labels: `status` ("delivered" or "failed")
pub fn record_notifications_dispatched(status: &'static str, count: u64) {
    counter!("meetup_notifications_dispatched_total",
        "status" => status
    )
    .increment(count);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    #[test]
    fn test_record_functions_without_recorder() {
        // Recording without an installed recorder is a no-op and must not panic.
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request(
            "POST",
            "/api/v1/meetings/550e8400-e29b-41d4-a716-446655440000/participants",
            409,
            Duration::from_millis(30),
        );
        record_db_query("lock_meeting", "success", Duration::from_millis(2));
        record_participation_transition("apply", "success");
        record_capacity_rejection();
        record_attendance_conflict();
        record_notifications_enqueued("MEETING_CANCELLED", 3);
        record_notifications_dispatched("delivered", 3);
    }

    #[test]
    fn test_capacity_rejection_counter_increments() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_capacity_rejection();
            record_capacity_rejection();
        });

        let counters: Vec<u64> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == "meetup_capacity_rejections_total")
            .filter_map(|(_, _, _, value)| match value {
                DebugValue::Counter(v) => Some(v),
                _ => None,
            })
            .collect();

        assert_eq!(counters, vec![2]);
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(409), "error");
        assert_eq!(categorize_status_code(500), "error");
    }

    #[test]
    fn test_normalize_endpoint_known_paths() {
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/ready"), "/ready");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/api/v1/meetings"), "/api/v1/meetings");
        assert_eq!(
            normalize_endpoint("/api/v1/me/participations"),
            "/api/v1/me/participations"
        );
        assert_eq!(normalize_endpoint("/api/v1/me/calendar"), "/api/v1/me/calendar");
    }

    #[test]
    fn test_normalize_endpoint_meeting_paths() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(
            normalize_endpoint(&format!("/api/v1/meetings/{id}")),
            "/api/v1/meetings/{id}"
        );
        assert_eq!(
            normalize_endpoint(&format!("/api/v1/meetings/{id}/cancel")),
            "/api/v1/meetings/{id}/cancel"
        );
        assert_eq!(
            normalize_endpoint(&format!("/api/v1/meetings/{id}/participants/withdraw")),
            "/api/v1/meetings/{id}/participants/withdraw"
        );
        assert_eq!(
            normalize_endpoint(&format!("/api/v1/meetings/{id}/participants/me")),
            "/api/v1/meetings/{id}/participants/me"
        );
        assert_eq!(
            normalize_endpoint(&format!("/api/v1/meetings/{id}/participants/{id}")),
            "/api/v1/meetings/{id}/participants/{participant_id}"
        );
        assert_eq!(
            normalize_endpoint(&format!("/api/v1/activities/{id}/attendance")),
            "/api/v1/activities/{id}/attendance"
        );
    }

    #[test]
    fn test_normalize_endpoint_unknown_paths() {
        assert_eq!(normalize_endpoint("/unknown"), "/other");
        assert_eq!(normalize_endpoint("/api/v2/meetings"), "/other");
        assert_eq!(
            normalize_endpoint("/api/v1/meetings/abc/unknown-action"),
            "/other"
        );
    }
}
