//! # Meetup Test Utilities
//!
//! Shared test utilities for the meetup service.
//!
//! This crate provides:
//! - Server test harness (`TestMeetupServer` for E2E tests)
//! - Token builders (`TestTokenBuilder`) signing with [`TEST_JWT_SECRET`]
//! - Database fixtures for users, meetings, participants and activities
//! - Outbox and participant assertions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meetup_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: PgPool) -> Result<()> {
//!     let host = create_user(&pool, "host").await?;
//!     let server = TestMeetupServer::spawn(pool).await?;
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/me/participations", server.url()))
//!         .bearer_auth(TestTokenBuilder::new().for_user(host).build())
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
