//! Builder for signed user tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use uuid::Uuid;

/// HS256 secret shared by [`TestTokenBuilder`] and the test server config.
pub const TEST_JWT_SECRET: &str = "meetup-test-secret-that-is-at-least-32-bytes";

/// Builder for test user tokens.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user(user_id)
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    exp: i64,
    iat: i64,
    nickname: Option<String>,
}

impl TestTokenBuilder {
    /// Token for a random user, valid for one hour.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: Uuid::new_v4().to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            nickname: None,
        }
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.sub = user_id.to_string();
        self
    }

    /// Set a raw subject, for tokens whose subject is not a UUID.
    pub fn with_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    pub fn with_nickname(mut self, nickname: &str) -> Self {
        self.nickname = Some(nickname.to_string());
        self
    }

    /// Set expiration in seconds from now. Negative values produce an
    /// expired token.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Sign with [`TEST_JWT_SECRET`].
    pub fn build(self) -> String {
        self.sign_with(TEST_JWT_SECRET)
    }

    /// Sign with an arbitrary secret.
    pub fn sign_with(self, secret: &str) -> String {
        let mut claims = json!({
            "sub": self.sub,
            "exp": self.exp,
            "iat": self.iat,
        });
        if let (Some(nickname), Some(obj)) = (self.nickname, claims.as_object_mut()) {
            obj.insert("nickname".to_string(), json!(nickname));
        }

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("Failed to sign test token")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
