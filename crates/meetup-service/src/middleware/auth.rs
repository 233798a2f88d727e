//! Authentication middleware.
//!
//! - `require_user_auth` - rejects requests without a valid bearer token
//! - `optional_user_auth` - lets anonymous requests through, but still rejects
//!   a token that is present and invalid
//!
//! Both insert a [`CallerIdentity`] into request extensions on success.

use crate::errors::MeetupError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use common::jwt::UserTokenValidator;
use common::types::UserId;
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<UserTokenValidator>,
}

/// The authenticated caller, taken from the token subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: UserId,
}

/// Bearer token from the Authorization header, `None` when the header is absent.
fn bearer_token(req: &Request) -> Result<Option<&str>, MeetupError> {
    let Some(header) = req.headers().get("authorization") else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|_| {
        tracing::debug!(target: "meetup.middleware.auth", "Authorization header is not ASCII");
        MeetupError::InvalidToken("Invalid Authorization header format".to_string())
    })?;

    value.strip_prefix("Bearer ").map(Some).ok_or_else(|| {
        tracing::debug!(target: "meetup.middleware.auth", "Invalid Authorization header format");
        MeetupError::InvalidToken("Invalid Authorization header format".to_string())
    })
}

fn identify(state: &AuthState, token: &str) -> Result<CallerIdentity, MeetupError> {
    let claims = state.validator.validate(token)?;
    Ok(CallerIdentity {
        user_id: claims.user_id()?,
    })
}

#[instrument(skip_all, name = "meetup.middleware.auth")]
pub async fn require_user_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, MeetupError> {
    let token = bearer_token(&req)?.ok_or_else(|| {
        tracing::debug!(target: "meetup.middleware.auth", "Missing Authorization header");
        MeetupError::InvalidToken("Missing Authorization header".to_string())
    })?;

    let caller = identify(&state, token)?;
    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}

#[instrument(skip_all, name = "meetup.middleware.optional_auth")]
pub async fn optional_user_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, MeetupError> {
    let caller = match bearer_token(&req)? {
        Some(token) => Some(identify(&state, token)?),
        None => None,
    };
    if let Some(caller) = caller {
        req.extensions_mut().insert(caller);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use common::secret::SecretString;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes-long";

    fn auth_state() -> Arc<AuthState> {
        let secret = SecretString::from(SECRET.to_string());
        Arc::new(AuthState {
            validator: Arc::new(UserTokenValidator::new(&secret, Duration::from_secs(300))),
        })
    }

    fn token_for(user_id: Uuid) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "sub": user_id.to_string(),
            "exp": now + 3600,
            "iat": now,
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    async fn whoami(caller: Option<Extension<CallerIdentity>>) -> String {
        caller.map_or_else(|| "anonymous".to_string(), |Extension(c)| c.user_id.to_string())
    }

    fn app(optional: bool) -> Router {
        let state = auth_state();
        let router = Router::new().route("/whoami", get(whoami));
        if optional {
            router.route_layer(middleware::from_fn_with_state(state, optional_user_auth))
        } else {
            router.route_layer(middleware::from_fn_with_state(state, require_user_auth))
        }
    }

    async fn call(app: Router, auth: Option<String>) -> (StatusCode, String) {
        let mut builder = HttpRequest::get("/whoami");
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_required_auth_accepts_valid_token() {
        let user = Uuid::new_v4();
        let (status, body) = call(app(false), Some(format!("Bearer {}", token_for(user)))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user.to_string());
    }

    #[tokio::test]
    async fn test_required_auth_rejects_missing_and_malformed() {
        let (status, _) = call(app(false), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(app(false), Some("Basic abc".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(app(false), Some("Bearer not-a-jwt".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_optional_auth() {
        let (status, body) = call(app(true), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");

        let user = Uuid::new_v4();
        let (_, body) = call(app(true), Some(format!("Bearer {}", token_for(user)))).await;
        assert_eq!(body, user.to_string());

        let (status, _) = call(app(true), Some("Bearer garbage".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
