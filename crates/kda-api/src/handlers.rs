//! HTTP API handlers
//!
//! Request handlers for session lifecycle, chat, speech and health.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use kda_core::llm::{build_system_prompt, ChatCompletionRequest, ChatMessage};
use kda_core::session::{is_supported_language, ChatTurn, JourneyStage, Role, SessionPatch};
use kda_core::{Session, Usage};

use crate::error::ApiError;
use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Session creation payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub language: String,
    pub role: Role,
    pub journey_stage: JourneyStage,
}

/// Session creation response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub expires_in_secs: u64,
}

/// Session view returned by GET/PUT
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub language: String,
    pub role: Role,
    pub journey_stage: JourneyStage,
    pub answers: serde_json::Value,
    pub history: Vec<ChatTurn>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            language: session.language,
            role: session.role,
            journey_stage: session.journey_stage,
            answers: session.answers,
            history: session.history,
            created_at: session.created_at.to_rfc3339(),
            updated_at: session.updated_at.to_rfc3339(),
        }
    }
}

/// Session update payload (all fields optional)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub language: Option<String>,
    pub role: Option<Role>,
    pub journey_stage: Option<JourneyStage>,
    pub answers: Option<serde_json::Value>,
}

/// Chat request payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

/// Token usage information
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        }
    }
}

/// Chat response payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
    pub usage: Option<TokenUsage>,
}

/// Transcription request payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeRequest {
    /// Base64-encoded audio
    pub audio: String,
    /// Original filename, used for format detection
    pub filename: Option<String>,
    /// Language hint (ISO 639-1)
    pub language: Option<String>,
}

/// Transcription response payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeResponse {
    pub text: String,
    pub language: Option<String>,
    pub duration_secs: Option<f64>,
}

/// Synthesis request payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequest {
    pub text: String,
    pub voice: Option<String>,
}

/// Synthesis response payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeResponse {
    /// Base64-encoded audio
    pub audio: String,
    pub content_type: String,
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// Create a new session
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    validate_language(&req.language)?;

    let session = state
        .sessions
        .create(req.language, req.role, req.journey_stage)
        .await?;

    info!("Session created: {}", session.id);

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            expires_in_secs: state.sessions.ttl_secs(),
        }),
    ))
}

/// Get session state
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    debug!("Session info request: {}", session_id);

    let session = state
        .sessions
        .get(&session_id)
        .await?
        .ok_or(ApiError::SessionNotFound(session_id))?;

    Ok(Json(session.into()))
}

/// Partially update a session
pub async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<SessionView>, ApiError> {
    if let Some(language) = &req.language {
        validate_language(language)?;
    }

    let patch = SessionPatch {
        language: req.language,
        role: req.role,
        journey_stage: req.journey_stage,
        answers: req.answers,
    };

    if patch.is_empty() {
        return Err(ApiError::Validation("empty update".to_string()));
    }

    let session = state.sessions.update(&session_id, patch).await?;
    Ok(Json(session.into()))
}

/// Delete a session
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.delete(&session_id).await? {
        info!("Session deleted: {}", session_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(session_id))
    }
}

/// Chat endpoint. Validates and PII-scans the message, sends the
/// session history to the LLM, and records both turns.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError::Validation("message must not be empty".to_string()));
    }

    let max_chars = state.config.limits.max_message_chars;
    if message.chars().count() > max_chars {
        return Err(ApiError::Validation(format!(
            "message exceeds {} characters",
            max_chars
        )));
    }

    // Blocked messages never reach the LLM or the stored history
    if let Some(kind) = state.pii.scan(message) {
        info!("Chat message blocked, PII category: {}", kind);
        return Err(ApiError::PiiDetected(kind));
    }

    let session = state
        .sessions
        .get(&req.session_id)
        .await?
        .ok_or_else(|| ApiError::SessionNotFound(req.session_id.clone()))?;

    let mut messages = vec![ChatMessage::system(build_system_prompt(&session))];
    for turn in &session.history {
        messages.push(match turn.role {
            kda_core::TurnRole::User => ChatMessage::user(&turn.content),
            kda_core::TurnRole::Assistant => ChatMessage::assistant(&turn.content),
        });
    }
    messages.push(ChatMessage::user(message));

    let request = ChatCompletionRequest {
        model: state.chat.model().to_string(),
        messages,
        max_tokens: Some(1024),
        temperature: Some(0.4),
    };

    let response = state.chat.complete(request).await?;
    let reply = response
        .reply_text()
        .ok_or_else(|| ApiError::Upstream("empty completion".to_string()))?
        .to_string();

    state
        .sessions
        .append_turns(
            &req.session_id,
            vec![ChatTurn::user(message), ChatTurn::assistant(&reply)],
        )
        .await?;

    Ok(Json(ChatResponse {
        reply,
        session_id: req.session_id,
        usage: response.usage.map(TokenUsage::from),
    }))
}

/// Transcribe base64 audio via Whisper
pub async fn transcribe(
    State(state): State<AppState>,
    Json(req): Json<TranscribeRequest>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    if req.audio.is_empty() {
        return Err(ApiError::Validation("audio must not be empty".to_string()));
    }

    let filename = req.filename.as_deref().unwrap_or("audio.webm");
    let result = state
        .transcriber
        .transcribe_base64(&req.audio, filename, req.language.as_deref())
        .await?;

    Ok(Json(TranscribeResponse {
        text: result.text,
        language: result.language,
        duration_secs: result.duration,
    }))
}

/// Synthesize speech for informational text
pub async fn synthesize(
    State(state): State<AppState>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<Json<SynthesizeResponse>, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("text must not be empty".to_string()));
    }
    // OpenAI TTS input cap
    if text.chars().count() > 4096 {
        return Err(ApiError::Validation(
            "text exceeds 4096 characters".to_string(),
        ));
    }

    let result = state.speech.synthesize(text, req.voice.as_deref()).await?;

    Ok(Json(SynthesizeResponse {
        audio: result.to_base64(),
        content_type: result.content_type,
    }))
}

fn validate_language(language: &str) -> Result<(), ApiError> {
    if is_supported_language(language) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "unsupported language: {}",
            language
        )))
    }
}
