//! Common utilities and types shared across the meetup platform crates.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for strongly-typed identifiers
pub mod types;

/// Module for shared configuration blocks
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (validation, user claims, constants)
pub mod jwt;
