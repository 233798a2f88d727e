//! Meetup Service Library
//!
//! Backend for community meetups. The parts with real stakes are:
//!
//! - Capacity-bounded participant admission, with a single transition table
//!   for apply, host decisions, withdrawal and re-application
//! - Meeting cancellation that notifies every approved participant through a
//!   transactional outbox
//! - Attendance responses with schedule conflict detection
//!
//! # Architecture
//!
//! Handler -> Service -> Repository:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and HTTP metrics
//! - `models` - Rows, requests and responses
//! - `observability` - Prometheus metrics
//! - `repositories` - SQL access
//! - `routes` - Axum router setup
//! - `services` - Business logic
//! - `tasks` - Background notification dispatcher

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
