//! Observability module for the meetup service.
//!
//! Provides metrics definitions and instrumentation helpers.

pub mod metrics;
