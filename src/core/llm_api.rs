//! LLM summarize proxy
//!
//! Server-side proxy that turns a log entry into a short bullet summary via
//! an OpenAI-compatible chat completions API. The API key stays on the
//! server, and upstream error bodies are logged but never forwarded to the
//! client.

use axum::{
    Json, Router,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::auth::extract::{AuthGate, CurrentUser};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const SUMMARY_MAX_TOKENS: u32 = 200;
const SUMMARY_TEMPERATURE: f32 = 0.7;

/// Fixed system prompt steering the model toward terse, factual bullets
const SYSTEM_PROMPT: &str = "你是一個實習紀錄摘要助手。根據使用者提供的實習日誌內容，提取出具體的實作行動。

規則：
- 禁止包含心得、成效、目的、自我期許、狀態描述等主觀內容
- 只保留具體操作、使用的工具、解決的問題
- 輸出條列式，每點用「- 」開頭，句尾加「。」
- 濃縮為 1~3 點，每點嚴格不超過 30 字";

/// LLM proxy configuration loaded from environment
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

impl LlmConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            api_base: std::env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            model: std::env::var("SUMMARY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }
}

/// LLM API state containing the config, HTTP client, and auth gate
#[derive(Clone)]
pub struct LlmApiState {
    pub config: LlmConfig,
    pub http: reqwest::Client,
    pub gate: AuthGate,
}

impl FromRef<Arc<LlmApiState>> for AuthGate {
    fn from_ref(state: &Arc<LlmApiState>) -> Self {
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

/// LLM API error types
#[derive(Debug, thiserror::Error)]
pub enum LlmApiError {
    #[error("LLM API key not configured")]
    MissingApiKey,

    #[error("Content cannot be empty")]
    EmptyContent,

    #[error("Upstream LLM request failed")]
    UpstreamError,
}

impl IntoResponse for LlmApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            LlmApiError::MissingApiKey => (StatusCode::INTERNAL_SERVER_ERROR, "MISSING_API_KEY"),
            LlmApiError::EmptyContent => (StatusCode::BAD_REQUEST, "EMPTY_CONTENT"),
            LlmApiError::UpstreamError => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        };

        let body = ApiError::new(self.to_string(), code);

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request for summarizing a log entry
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub content: String,
}

/// Response carrying the generated summary
#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

/// Chat message for the upstream request
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Upstream chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// Upstream chat completion response, reduced to the fields we read
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Truncate an upstream body for logging (char-boundary safe)
fn truncate_for_log(body: &str) -> String {
    if body.chars().count() <= 500 {
        return body.to_string();
    }

    let head: String = body.chars().take(500).collect();
    format!("{}... (truncated, total {} bytes)", head, body.len())
}

// ============================================================================
// Router
// ============================================================================

/// Create the LLM API router
pub fn llm_api_router(state: LlmApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/llm/summarize", post(summarize_handler))
        .with_state(state)
}

/// POST /api/llm/summarize
/// Summarize a log entry into bullet points
async fn summarize_handler(
    State(state): State<Arc<LlmApiState>>,
    CurrentUser(_user): CurrentUser,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, LlmApiError> {
    let api_key = state
        .config
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or(LlmApiError::MissingApiKey)?;

    let content = request.content.trim();
    if content.is_empty() {
        return Err(LlmApiError::EmptyContent);
    }

    tracing::info!(
        "Summarize request: model={}, content_len={}",
        state.config.model,
        content.len()
    );

    let payload = ChatCompletionRequest {
        model: state.config.model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: content.to_string(),
            },
        ],
        max_tokens: SUMMARY_MAX_TOKENS,
        temperature: SUMMARY_TEMPERATURE,
    };

    let response = state
        .http
        .post(&state.config.api_base)
        .header("Authorization", format!("Bearer {}", api_key))
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Failed to reach LLM API: {}", e);
            LlmApiError::UpstreamError
        })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        tracing::error!("Failed to read LLM API response: {}", e);
        LlmApiError::UpstreamError
    })?;

    if !status.is_success() {
        tracing::warn!(
            "LLM API error response ({}): {}",
            status,
            truncate_for_log(&body)
        );
        return Err(LlmApiError::UpstreamError);
    }

    let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            "Malformed LLM API response: {} ({})",
            e,
            truncate_for_log(&body)
        );
        LlmApiError::UpstreamError
    })?;

    let summary = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| {
            tracing::error!("LLM API response missing content: {}", truncate_for_log(&body));
            LlmApiError::UpstreamError
        })?;

    Ok(Json(SummarizeResponse { summary }))
}
