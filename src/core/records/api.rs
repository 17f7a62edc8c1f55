//! Record API endpoints
//!
//! Provides REST API endpoints for internship log records:
//! - GET /api/records - List visible records with search and sort
//! - GET /api/records/{id} - Get a record by ID
//! - GET /api/records/{id}/adjacent - Neighboring records for paging
//! - POST /api/records - Create a record (owner only)
//! - PUT /api/records/{id} - Update a record (owner only)
//! - DELETE /api/records/{id} - Delete a record (owner only)
//!
//! Owners work on their own records. Viewers get a read-only window onto the
//! records of every owner-role account.

use axum::{
    Json, Router,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::auth::extract::{AuthGate, CurrentUser};
use crate::core::db::models::{CreateRecord, Record, UpdateRecord, User};
use crate::core::db::repositories::{
    RecordRepository, RecordRepositoryError, RecordScope, RecordSort,
};

/// Record API state containing the record repository and auth gate
#[derive(Clone)]
pub struct RecordApiState {
    pub records: RecordRepository,
    pub gate: AuthGate,
}

impl FromRef<Arc<RecordApiState>> for AuthGate {
    fn from_ref(state: &Arc<RecordApiState>) -> Self {
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

/// Record API error types
#[derive(Debug, thiserror::Error)]
pub enum RecordApiError {
    #[error("No edit permission")]
    Forbidden,

    #[error("Record not found")]
    NotFound,

    #[error("Record not found or no permission")]
    NotFoundOrForbidden,

    #[error("Invalid sort parameter")]
    InvalidSort,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<RecordRepositoryError> for RecordApiError {
    fn from(err: RecordRepositoryError) -> Self {
        RecordApiError::InternalError(err.to_string())
    }
}

impl IntoResponse for RecordApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RecordApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            RecordApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            RecordApiError::NotFoundOrForbidden => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            RecordApiError::InvalidSort => (StatusCode::BAD_REQUEST, "INVALID_SORT"),
            RecordApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            RecordApiError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self {
            RecordApiError::InternalError(detail) => {
                tracing::error!("Record API internal error: {}", detail);
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

/// Query parameters for listing records
#[derive(Debug, Deserialize, Default)]
pub struct ListRecordsQuery {
    pub sort: Option<String>,
    pub search: Option<String>,
}

/// Request for creating a record
#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Request for updating a record
#[derive(Debug, Deserialize, Default)]
pub struct UpdateRecordRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Record payload as the frontend expects it: snake_case identity fields and
/// camelCase time fields
#[derive(Debug, Serialize)]
pub struct RecordPayload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Record> for RecordPayload {
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            date: record.date,
            start_time: record.start_time,
            end_time: record.end_time,
            title: record.title,
            content: record.content,
            tags: record.tags.0,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Response for the record list
#[derive(Debug, Serialize)]
pub struct RecordListResponse {
    pub records: Vec<RecordPayload>,
    pub total: usize,
}

/// Response wrapping a single record
#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub record: RecordPayload,
}

/// Response for adjacent record lookup
#[derive(Debug, Serialize)]
pub struct AdjacentResponse {
    pub prev: Option<RecordPayload>,
    pub next: Option<RecordPayload>,
}

/// Response for delete operation
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ============================================================================
// Router
// ============================================================================

/// Create the record API router
pub fn record_api_router(state: RecordApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/records", get(list_records_handler))
        .route("/api/records", post(create_record_handler))
        .route("/api/records/{id}", get(get_record_handler))
        .route("/api/records/{id}", put(update_record_handler))
        .route("/api/records/{id}", delete(delete_record_handler))
        .route("/api/records/{id}/adjacent", get(adjacent_records_handler))
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

/// Parse the sort query parameter, defaulting to newest-first
fn parse_sort(sort: Option<&str>) -> Result<RecordSort, RecordApiError> {
    match sort {
        None => Ok(RecordSort::default()),
        Some(value) => value.parse().map_err(|_| RecordApiError::InvalidSort),
    }
}

/// GET /api/records
/// List visible records, optionally filtered and sorted
async fn list_records_handler(
    State(state): State<Arc<RecordApiState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<RecordListResponse>, RecordApiError> {
    let sort = parse_sort(query.sort.as_deref())?;

    let records = state
        .records
        .list(visible_scope(&user), query.search.as_deref(), sort)
        .await?;

    let total = records.len();

    Ok(Json(RecordListResponse {
        records: records.into_iter().map(RecordPayload::from).collect(),
        total,
    }))
}

/// GET /api/records/{id}
/// Get a single visible record
async fn get_record_handler(
    State(state): State<Arc<RecordApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecordResponse>, RecordApiError> {
    let record = state
        .records
        .find_visible(id, visible_scope(&user))
        .await?
        .ok_or(RecordApiError::NotFound)?;

    Ok(Json(RecordResponse {
        record: record.into(),
    }))
}

/// GET /api/records/{id}/adjacent
/// Locate the record's neighbors in the newest-first visible list
async fn adjacent_records_handler(
    State(state): State<Arc<RecordApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AdjacentResponse>, RecordApiError> {
    let records = state
        .records
        .list(visible_scope(&user), None, RecordSort::DateDesc)
        .await?;

    let idx = records
        .iter()
        .position(|r| r.id == id)
        .ok_or(RecordApiError::NotFound)?;

    // prev is the newer neighbor, next the older one
    let prev = if idx > 0 {
        Some(RecordPayload::from(records[idx - 1].clone()))
    } else {
        None
    };
    let next = records.get(idx + 1).cloned().map(RecordPayload::from);

    Ok(Json(AdjacentResponse { prev, next }))
}

/// POST /api/records
/// Create a record (owner only)
async fn create_record_handler(
    State(state): State<Arc<RecordApiState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<RecordResponse>), RecordApiError> {
    if !user.is_owner() {
        return Err(RecordApiError::Forbidden);
    }

    let title = request.title.trim();
    if title.is_empty() {
        return Err(RecordApiError::BadRequest(
            "Title cannot be empty".to_string(),
        ));
    }

    let content = request.content.trim();
    if content.is_empty() {
        return Err(RecordApiError::BadRequest(
            "Content cannot be empty".to_string(),
        ));
    }

    let create = CreateRecord {
        date: request.date,
        start_time: request.start_time,
        end_time: request.end_time,
        title: title.to_string(),
        content: content.to_string(),
        tags: request.tags,
    };

    let record = state.records.create(user.id, &create).await?;

    tracing::info!("Record created: {}", record.id);

    Ok((
        StatusCode::CREATED,
        Json(RecordResponse {
            record: record.into(),
        }),
    ))
}

/// PUT /api/records/{id}
/// Update a record (owner only, scoped to the owner's records)
async fn update_record_handler(
    State(state): State<Arc<RecordApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRecordRequest>,
) -> Result<Json<RecordResponse>, RecordApiError> {
    if !user.is_owner() {
        return Err(RecordApiError::Forbidden);
    }

    if let Some(ref title) = request.title
        && title.trim().is_empty()
    {
        return Err(RecordApiError::BadRequest(
            "Title cannot be empty".to_string(),
        ));
    }

    if let Some(ref content) = request.content
        && content.trim().is_empty()
    {
        return Err(RecordApiError::BadRequest(
            "Content cannot be empty".to_string(),
        ));
    }

    let update = UpdateRecord {
        date: request.date,
        start_time: request.start_time,
        end_time: request.end_time,
        title: request.title.map(|t| t.trim().to_string()),
        content: request.content.map(|c| c.trim().to_string()),
        tags: request.tags,
    };

    let record = state
        .records
        .update(id, user.id, &update)
        .await?
        .ok_or(RecordApiError::NotFoundOrForbidden)?;

    tracing::info!("Record updated: {}", record.id);

    Ok(Json(RecordResponse {
        record: record.into(),
    }))
}

/// DELETE /api/records/{id}
/// Delete a record (owner only, scoped to the owner's records)
async fn delete_record_handler(
    State(state): State<Arc<RecordApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, RecordApiError> {
    if !user.is_owner() {
        return Err(RecordApiError::Forbidden);
    }

    let deleted = state.records.delete(id, user.id).await?;
    if !deleted {
        return Err(RecordApiError::NotFoundOrForbidden);
    }

    tracing::info!("Record deleted: {}", id);

    Ok(Json(SuccessResponse { success: true }))
}
