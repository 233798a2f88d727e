//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] types. `SecretString` implements `Debug` with
//! redaction, so a struct deriving `Debug` that holds one (the database URL,
//! the JWT signing secret) is safe to log. Access requires an explicit
//! `expose_secret()` call.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let secret = SecretString::from("hunter2");
//! assert!(!format!("{secret:?}").contains("hunter2"));
//! assert_eq!(secret.expose_secret(), "hunter2");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
