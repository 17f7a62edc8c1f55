//! Request authentication for protected endpoints
//!
//! Provides the [`CurrentUser`] extractor, which validates the Bearer access
//! token on a request and loads the matching user row. Handlers that take a
//! `CurrentUser` argument are reachable only with a valid token.
//!
//! Every failure shape (missing header, bad signature, expired token, deleted
//! user) produces the same 401 response so callers cannot probe which check
//! tripped.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::core::auth::jwt::JwtService;
use crate::core::db::models::User;
use crate::core::db::repositories::UserRepository;

/// Shared pieces the extractor needs from router state
#[derive(Clone)]
pub struct AuthGate {
    pub jwt: JwtService,
    pub users: UserRepository,
}

impl AuthGate {
    /// Create a new auth gate
    pub fn new(jwt: JwtService, users: UserRepository) -> Self {
        Self { jwt, users }
    }
}

/// The authenticated user behind the current request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Uniform 401 rejection for any authentication failure
#[derive(Debug)]
pub struct AuthRejection;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: "Invalid or expired token".to_string(),
            code: "UNAUTHORIZED".to_string(),
        });

        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            body,
        )
            .into_response()
    }
}

/// Extract the Bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth_header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    if !auth_header.starts_with("Bearer ") {
        return None;
    }

    let token = auth_header.trim_start_matches("Bearer ");
    if token.is_empty() {
        return None;
    }

    Some(token)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AuthGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = AuthGate::from_ref(state);

        let token = bearer_token(&parts.headers).ok_or(AuthRejection)?;

        let claims = gate.jwt.validate_access_token(token).map_err(|e| {
            tracing::debug!("Access token rejected: {:?}", e);
            AuthRejection
        })?;

        let user_id = claims.user_id().map_err(|_| AuthRejection)?;

        // The token may outlive the account it was issued for
        let user = gate
            .users
            .find_by_id(user_id)
            .await
            .map_err(|e| {
                tracing::error!("User lookup failed during auth: {}", e);
                AuthRejection
            })?
            .ok_or(AuthRejection)?;

        Ok(CurrentUser(user))
    }
}
