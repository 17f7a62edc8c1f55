//! Comment API endpoints
//!
//! Provides REST API endpoints for comments on records:
//! - GET /api/records/{id}/comments - List a record's comments
//! - POST /api/records/{id}/comments - Comment on a record
//! - PUT /api/comments/{id} - Edit own comment
//! - DELETE /api/comments/{id} - Delete own comment
//!
//! Any authenticated user may comment on a record they can see. Editing and
//! deleting are restricted to the comment's author.

use axum::{
    Json, Router,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::auth::extract::{AuthGate, CurrentUser};
use crate::core::db::models::{Comment, CommentWithAuthor, User};
use crate::core::db::repositories::{
    CommentRepository, CommentRepositoryError, RecordRepository, RecordRepositoryError,
    RecordScope,
};

/// Comment API state containing the repositories and auth gate
#[derive(Clone)]
pub struct CommentApiState {
    pub comments: CommentRepository,
    pub records: RecordRepository,
    pub gate: AuthGate,
}

impl FromRef<Arc<CommentApiState>> for AuthGate {
    fn from_ref(state: &Arc<CommentApiState>) -> Self {
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

/// Comment API error types
#[derive(Debug, thiserror::Error)]
pub enum CommentApiError {
    #[error("Record not found")]
    RecordNotFound,

    #[error("Comment not found")]
    NotFound,

    #[error("You can only edit your own comments")]
    EditForbidden,

    #[error("You can only delete your own comments")]
    DeleteForbidden,

    #[error("Comment content cannot be empty")]
    EmptyContent,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<CommentRepositoryError> for CommentApiError {
    fn from(err: CommentRepositoryError) -> Self {
        CommentApiError::InternalError(err.to_string())
    }
}

impl From<RecordRepositoryError> for CommentApiError {
    fn from(err: RecordRepositoryError) -> Self {
        CommentApiError::InternalError(err.to_string())
    }
}

impl IntoResponse for CommentApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            CommentApiError::RecordNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            CommentApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            CommentApiError::EditForbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            CommentApiError::DeleteForbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            CommentApiError::EmptyContent => (StatusCode::BAD_REQUEST, "EMPTY_CONTENT"),
            CommentApiError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self {
            CommentApiError::InternalError(detail) => {
                tracing::error!("Comment API internal error: {}", detail);
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

/// Request for creating a comment
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// Request for updating a comment
#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// Comment payload as the frontend expects it
#[derive(Debug, Serialize)]
pub struct CommentPayload {
    pub id: Uuid,
    pub record_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<CommentWithAuthor> for CommentPayload {
    fn from(comment: CommentWithAuthor) -> Self {
        Self {
            id: comment.id,
            record_id: comment.record_id,
            user_id: comment.user_id,
            user_email: comment.user_email,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

impl CommentPayload {
    /// Build a payload from a bare comment row and a known author email
    fn from_comment(comment: Comment, user_email: String) -> Self {
        Self {
            id: comment.id,
            record_id: comment.record_id,
            user_id: comment.user_id,
            user_email,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

/// Response for the comment list
#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentPayload>,
}

/// Response wrapping a single comment
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: CommentPayload,
}

/// Response for delete operation
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ============================================================================
// Router
// ============================================================================

/// Create the comment API router
pub fn comment_api_router(state: CommentApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/records/{id}/comments", get(list_comments_handler))
        .route("/api/records/{id}/comments", post(create_comment_handler))
        .route("/api/comments/{id}", put(update_comment_handler))
        .route("/api/comments/{id}", delete(delete_comment_handler))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Which records the caller is allowed to read
fn visible_scope(user: &User) -> RecordScope {
    if user.is_owner() {
        RecordScope::Mine(user.id)
    } else {
        RecordScope::AllOwners
    }
}

/// Reject with 404 unless the record exists and is visible to the caller
async fn ensure_record_visible(
    state: &CommentApiState,
    user: &User,
    record_id: Uuid,
) -> Result<(), CommentApiError> {
    state
        .records
        .find_visible(record_id, visible_scope(user))
        .await?
        .ok_or(CommentApiError::RecordNotFound)?;

    Ok(())
}

/// GET /api/records/{id}/comments
/// List a visible record's comments, oldest first
async fn list_comments_handler(
    State(state): State<Arc<CommentApiState>>,
    CurrentUser(user): CurrentUser,
    Path(record_id): Path<Uuid>,
) -> Result<Json<CommentListResponse>, CommentApiError> {
    ensure_record_visible(&state, &user, record_id).await?;

    let comments = state.comments.list_for_record(record_id).await?;

    Ok(Json(CommentListResponse {
        comments: comments.into_iter().map(CommentPayload::from).collect(),
    }))
}

/// POST /api/records/{id}/comments
/// Comment on a visible record
async fn create_comment_handler(
    State(state): State<Arc<CommentApiState>>,
    CurrentUser(user): CurrentUser,
    Path(record_id): Path<Uuid>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), CommentApiError> {
    ensure_record_visible(&state, &user, record_id).await?;

    let content = request.content.trim();
    if content.is_empty() {
        return Err(CommentApiError::EmptyContent);
    }

    let comment = state.comments.create(record_id, user.id, content).await?;

    tracing::info!("Comment {} created on record {}", comment.id, record_id);

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            comment: CommentPayload::from_comment(comment, user.email),
        }),
    ))
}

/// PUT /api/comments/{id}
/// Edit a comment (author only)
async fn update_comment_handler(
    State(state): State<Arc<CommentApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, CommentApiError> {
    let existing = state
        .comments
        .find_by_id(id)
        .await?
        .ok_or(CommentApiError::NotFound)?;

    if existing.user_id != user.id {
        return Err(CommentApiError::EditForbidden);
    }

    let content = request.content.trim();
    if content.is_empty() {
        return Err(CommentApiError::EmptyContent);
    }

    let comment = state
        .comments
        .update_content(id, content)
        .await?
        .ok_or(CommentApiError::NotFound)?;

    Ok(Json(CommentResponse {
        comment: CommentPayload::from_comment(comment, user.email),
    }))
}

/// DELETE /api/comments/{id}
/// Delete a comment (author only)
async fn delete_comment_handler(
    State(state): State<Arc<CommentApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, CommentApiError> {
    let existing = state
        .comments
        .find_by_id(id)
        .await?
        .ok_or(CommentApiError::NotFound)?;

    if existing.user_id != user.id {
        return Err(CommentApiError::DeleteForbidden);
    }

    let _ = state.comments.delete(id).await?;

    tracing::info!("Comment deleted: {}", id);

    Ok(Json(SuccessResponse { success: true }))
}
