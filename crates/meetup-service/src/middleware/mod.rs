//! Middleware for the meetup service.
//!
//! # Components
//!
//! - `auth` - Bearer token authentication (required and optional)
//! - `http_metrics` - HTTP request metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{optional_user_auth, require_user_auth, AuthState, CallerIdentity};
pub use http_metrics::http_metrics_middleware;
