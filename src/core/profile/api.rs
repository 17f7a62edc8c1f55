//! Profile API endpoints
//!
//! Provides REST API endpoints for the intern's public profile:
//! - GET /api/profile - Fetch the profile (owner: own, viewer: the owner's)
//! - PUT /api/profile - Update the profile (owner only)
//!
//! Blank `name`/`company`/`position` fields are replaced with the product's
//! placeholder strings at serialization time, so the frontend always has
//! something to show.

use axum::{
    Json, Router,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::auth::extract::{AuthGate, CurrentUser};
use crate::core::db::models::{Profile, UpdateProfile};
use crate::core::db::repositories::{
    ProfileRepository, ProfileRepositoryError, UserRepository, UserRepositoryError,
};

/// Placeholder shown when the owner has not filled in their name
const NAME_PLACEHOLDER: &str = "您的姓名";
/// Placeholder shown when the owner has not filled in their company
const COMPANY_PLACEHOLDER: &str = "目前實習公司";
/// Placeholder shown when the owner has not filled in their position
const POSITION_PLACEHOLDER: &str = "實習職位";

/// Profile API state containing the repositories and auth gate
#[derive(Clone)]
pub struct ProfileApiState {
    pub profiles: ProfileRepository,
    pub users: UserRepository,
    pub gate: AuthGate,
}

impl FromRef<Arc<ProfileApiState>> for AuthGate {
    fn from_ref(state: &Arc<ProfileApiState>) -> Self {
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

/// Profile API error types
#[derive(Debug, thiserror::Error)]
pub enum ProfileApiError {
    #[error("No edit permission")]
    Forbidden,

    #[error("Owner profile not found")]
    OwnerNotFound,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<ProfileRepositoryError> for ProfileApiError {
    fn from(err: ProfileRepositoryError) -> Self {
        ProfileApiError::InternalError(err.to_string())
    }
}

impl From<UserRepositoryError> for ProfileApiError {
    fn from(err: UserRepositoryError) -> Self {
        ProfileApiError::InternalError(err.to_string())
    }
}

impl IntoResponse for ProfileApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ProfileApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ProfileApiError::OwnerNotFound => (StatusCode::NOT_FOUND, "OWNER_NOT_FOUND"),
            ProfileApiError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self {
            ProfileApiError::InternalError(detail) => {
                tracing::error!("Profile API internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiError::new(message, code);

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request for updating the profile
#[derive(Debug, Deserialize, Default)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
}

/// Profile payload as the frontend expects it, placeholders applied
#[derive(Debug, Serialize)]
pub struct ProfilePayload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub company: String,
    pub position: String,
    pub interests: Option<String>,
    pub email: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
}

/// Substitute the placeholder when the stored value is NULL or empty
fn or_placeholder(value: Option<String>, placeholder: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => placeholder.to_string(),
    }
}

impl From<Profile> for ProfilePayload {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            name: or_placeholder(profile.name, NAME_PLACEHOLDER),
            company: or_placeholder(profile.company, COMPANY_PLACEHOLDER),
            position: or_placeholder(profile.position, POSITION_PLACEHOLDER),
            interests: profile.interests,
            email: profile.email,
            github: profile.github,
            linkedin: profile.linkedin,
        }
    }
}

/// Response wrapping the profile
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: ProfilePayload,
}

// ============================================================================
// Router
// ============================================================================

/// Create the profile API router
pub fn profile_api_router(state: ProfileApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/profile", get(get_profile_handler))
        .route("/api/profile", put(update_profile_handler))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/profile
/// Owners read their own profile, created on first access. Viewers read the
/// profile of the first registered owner.
async fn get_profile_handler(
    State(state): State<Arc<ProfileApiState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ProfileResponse>, ProfileApiError> {
    let profile = if user.is_owner() {
        state.profiles.get_or_create(user.id).await?
    } else {
        let owner = state
            .users
            .find_first_owner()
            .await?
            .ok_or(ProfileApiError::OwnerNotFound)?;

        state
            .profiles
            .find_by_user(owner.id)
            .await?
            .ok_or(ProfileApiError::OwnerNotFound)?
    };

    Ok(Json(ProfileResponse {
        profile: profile.into(),
    }))
}

/// PUT /api/profile
/// Update the owner's profile. Absent fields keep their stored values.
async fn update_profile_handler(
    State(state): State<Arc<ProfileApiState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ProfileApiError> {
    if !user.is_owner() {
        return Err(ProfileApiError::Forbidden);
    }

    let update = UpdateProfile {
        name: request.name,
        company: request.company,
        position: request.position,
        interests: request.interests,
        email: request.email,
        github: request.github,
        linkedin: request.linkedin,
    };

    let profile = state.profiles.update(user.id, &update).await?;

    tracing::info!("Profile updated for user {}", user.id);

    Ok(Json(ProfileResponse {
        profile: profile.into(),
    }))
}
