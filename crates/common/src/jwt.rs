//! JWT utilities for caller identity.
//!
//! Authentication itself is owned by an external auth service, which issues
//! HS256 user tokens signed with a shared secret. This module validates those
//! tokens and exposes the caller identity as [`UserClaims`].
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only HS256 is accepted; the `alg` header cannot downgrade validation
//! - `exp` is required; `iat` may not be further in the future than the clock skew
//! - Generic error messages prevent information leakage
//! - The `sub` field is redacted in Debug output

use crate::secret::{ExposeSecret, SecretString};
use crate::types::UserId;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected before any base64 decoding or
/// signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default JWT clock skew tolerance (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Minimum length of the shared HS256 secret in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during JWT validation.
///
/// Every variant renders the same message; details go to debug logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token structure, signature or expiry is invalid.
    #[error("The access token is invalid or expired")]
    InvalidToken,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,

    /// Token `sub` is not a user UUID.
    #[error("The access token is invalid or expired")]
    InvalidSubject,
}

// =============================================================================
// Claims Types
// =============================================================================

/// User token claims.
///
/// # Fields
///
/// - `sub`: Subject (user UUID as string)
/// - `exp`: Expiration timestamp (Unix epoch seconds)
/// - `iat`: Issued-at timestamp (Unix epoch seconds)
/// - `nickname`: Optional display name
#[derive(Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject (user identifier) - redacted in Debug output.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Display name, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl fmt::Debug for UserClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserClaims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nickname", &self.nickname)
            .finish()
    }
}

impl UserClaims {
    /// Parse the subject as a [`UserId`].
    ///
    /// # Errors
    ///
    /// Returns `JwtValidationError::InvalidSubject` if `sub` is not a UUID.
    pub fn user_id(&self) -> Result<UserId, JwtValidationError> {
        Uuid::parse_str(&self.sub).map(UserId).map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Token subject is not a UUID");
            JwtValidationError::InvalidSubject
        })
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Validates HS256 user tokens issued by the external auth service.
pub struct UserTokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    clock_skew: Duration,
}

impl fmt::Debug for UserTokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserTokenValidator")
            .field("decoding_key", &"[REDACTED]")
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

impl UserTokenValidator {
    /// Create a validator for the given shared secret.
    #[must_use]
    pub fn new(secret: &SecretString, clock_skew: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = clock_skew.as_secs();
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
            clock_skew,
        }
    }

    /// Validate a bearer token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] if the token is oversized, malformed,
    /// badly signed, expired, issued in the future, or has a non-UUID subject.
    pub fn validate(&self, token: &str) -> Result<UserClaims, JwtValidationError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "common.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(JwtValidationError::TokenTooLarge);
        }

        let token_data = decode::<UserClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(target: "common.jwt", error = %e, "Token rejected");
                JwtValidationError::InvalidToken
            })?;

        validate_iat(token_data.claims.iat, self.clock_skew)?;
        token_data.claims.user_id()?;

        Ok(token_data.claims)
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // clock_skew is bounded by MAX_CLOCK_SKEW
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_wrap)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes-long";

    fn sign(claims: &UserClaims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims_for(sub: &str, iat_offset: i64, exp_offset: i64) -> UserClaims {
        let now = chrono::Utc::now().timestamp();
        UserClaims {
            sub: sub.to_string(),
            exp: now + exp_offset,
            iat: now + iat_offset,
            nickname: Some("tester".to_string()),
        }
    }

    fn validator() -> UserTokenValidator {
        UserTokenValidator::new(&SecretString::from(SECRET), DEFAULT_CLOCK_SKEW)
    }

    #[test]
    fn test_default_clock_skew_is_5_minutes() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(300));
    }

    #[test]
    fn test_validate_accepts_valid_token() {
        let user = Uuid::new_v4();
        let token = sign(&claims_for(&user.to_string(), 0, 3600), SECRET);

        let claims = validator().validate(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId(user));
        assert_eq!(claims.nickname.as_deref(), Some("tester"));
    }

    #[test]
    fn test_validate_rejects_wrong_secret() {
        let token = sign(
            &claims_for(&Uuid::new_v4().to_string(), 0, 3600),
            "another-secret-that-is-also-32-bytes-long",
        );
        assert_eq!(
            validator().validate(&token).unwrap_err(),
            JwtValidationError::InvalidToken
        );
    }

    #[test]
    fn test_validate_rejects_expired_token() {
        let token = sign(&claims_for(&Uuid::new_v4().to_string(), -7200, -3600), SECRET);
        assert_eq!(
            validator().validate(&token).unwrap_err(),
            JwtValidationError::InvalidToken
        );
    }

    #[test]
    fn test_validate_rejects_future_iat() {
        let token = sign(&claims_for(&Uuid::new_v4().to_string(), 3600, 7200), SECRET);
        assert_eq!(
            validator().validate(&token).unwrap_err(),
            JwtValidationError::IatTooFarInFuture
        );
    }

    #[test]
    fn test_validate_rejects_non_uuid_subject() {
        let token = sign(&claims_for("user:42", 0, 3600), SECRET);
        assert_eq!(
            validator().validate(&token).unwrap_err(),
            JwtValidationError::InvalidSubject
        );
    }

    #[test]
    fn test_validate_rejects_oversized_token() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            validator().validate(&token).unwrap_err(),
            JwtValidationError::TokenTooLarge
        );
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert_eq!(
            validator().validate("not.a.jwt").unwrap_err(),
            JwtValidationError::InvalidToken
        );
    }

    #[test]
    fn test_validate_iat_at_clock_skew_boundary() {
        let now = 1_700_000_000;
        let skew = DEFAULT_CLOCK_SKEW.as_secs() as i64;
        assert!(validate_iat_at(now + skew, DEFAULT_CLOCK_SKEW, now).is_ok());
        assert_eq!(
            validate_iat_at(now + skew + 1, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        );
    }

    #[test]
    fn test_user_claims_debug_redacts_sub() {
        let claims = claims_for("7d1f5a4e-0000-0000-0000-000000000000", 0, 60);
        let debug = format!("{claims:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("7d1f5a4e"));
    }
}
