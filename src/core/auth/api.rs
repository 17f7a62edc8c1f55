//! Auth API endpoints
//!
//! Provides REST API endpoints for authentication:
//! - POST /api/auth/register - Register a new user
//! - POST /api/auth/login - Login and receive tokens
//! - POST /api/auth/refresh - Rotate the refresh token cookie
//! - POST /api/auth/logout - Discard the refresh token
//! - GET /api/auth/me - Get current user info
//!
//! The refresh token travels only in an httpOnly cookie; the access token
//! travels in the JSON body and is the client's job to hold on to.

use axum::{
    Json, Router,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::auth::extract::{AuthGate, CurrentUser};
use crate::core::auth::service::{AuthError, AuthService, LoginRequest, RegisterRequest};
use crate::core::db::models::Role;

/// Cookie carrying the refresh token
const REFRESH_COOKIE: &str = "refresh_token";

/// Auth API state containing the auth service and gate
#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: AuthService,
    pub gate: AuthGate,
}

impl FromRef<Arc<AuthApiState>> for AuthGate {
    fn from_ref(state: &Arc<AuthApiState>) -> Self {
        state.gate.clone()
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Convert AuthError to API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::InvalidEmail => (StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
            AuthError::EmailAlreadyExists => (StatusCode::BAD_REQUEST, "EMAIL_EXISTS"),
            AuthError::PasswordTooShort => (StatusCode::BAD_REQUEST, "PASSWORD_TOO_SHORT"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::MissingRefreshToken => (StatusCode::UNAUTHORIZED, "MISSING_REFRESH_TOKEN"),
            AuthError::InvalidRefreshToken => (StatusCode::UNAUTHORIZED, "INVALID_REFRESH_TOKEN"),
            AuthError::RefreshTokenExpired => (StatusCode::UNAUTHORIZED, "REFRESH_TOKEN_EXPIRED"),
            AuthError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let message = match &self {
            AuthError::InternalError(detail) => {
                tracing::error!("Auth internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiError::new(message, code);

        (status, Json(body)).into_response()
    }
}

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// User identity returned alongside a login
#[derive(Debug, Serialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
}

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserIdentity,
}

/// Response for a successful token refresh
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Response for GET /api/auth/me
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Build the refresh token cookie
fn refresh_cookie(value: &str, days: i64) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, value.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(days))
        .build()
}

/// Build an immediately expiring cookie that removes the refresh token
fn clear_refresh_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Create the auth API router
pub fn auth_api_router(state: AuthApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/refresh", post(refresh_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/me", get(me_handler))
        .with_state(state)
}

/// POST /api/auth/register
/// Register a new user
async fn register_handler(
    State(state): State<Arc<AuthApiState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AuthError> {
    tracing::info!("Registration attempt for email: {}", request.email);

    state.auth_service.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registered successfully, please log in".to_string(),
        }),
    ))
}

/// POST /api/auth/login
/// Login, receive an access token, and set the refresh cookie
async fn login_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AuthError> {
    tracing::info!("Login attempt for email: {}", request.email);

    let session = state.auth_service.login(request).await?;

    tracing::info!("User logged in: {}", session.user.email);

    let jar = jar.add(refresh_cookie(
        &session.refresh_token,
        state.auth_service.refresh_cookie_days(),
    ));

    Ok((
        jar,
        Json(LoginResponse {
            access_token: session.access_token,
            token_type: "bearer".to_string(),
            user: UserIdentity {
                id: session.user.id,
                email: session.user.email,
            },
        }),
    ))
}

/// POST /api/auth/refresh
/// Rotate the refresh token and issue a fresh access token
async fn refresh_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>), AuthError> {
    tracing::debug!("Token refresh request");

    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AuthError::MissingRefreshToken)?;

    let tokens = state.auth_service.refresh(&presented).await?;

    let jar = jar.add(refresh_cookie(
        &tokens.refresh_token,
        state.auth_service.refresh_cookie_days(),
    ));

    Ok((
        jar,
        Json(TokenResponse {
            access_token: tokens.access_token,
            token_type: "bearer".to_string(),
        }),
    ))
}

/// POST /api/auth/logout
/// Discard the refresh token. Succeeds whether or not a cookie was sent.
async fn logout_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AuthError> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        state.auth_service.logout(cookie.value()).await?;
    }

    let jar = jar.add(clear_refresh_cookie());

    Ok((
        jar,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}

/// GET /api/auth/me
/// Get the authenticated user's identity
async fn me_handler(CurrentUser(user): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.id,
        email: user.email,
        role: user.role,
    })
}
