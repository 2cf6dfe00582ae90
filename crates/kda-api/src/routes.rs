//! Route definitions
//!
//! Defines all HTTP API endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    chat, create_session, delete_session, get_session, health, synthesize, transcribe,
    update_session,
};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/api/health", get(health))
        // Session lifecycle
        .route("/api/session", post(create_session))
        .route(
            "/api/session/{session_id}",
            get(get_session).put(update_session).delete(delete_session),
        )
        // Chat
        .route("/api/chat", post(chat))
        // Speech
        .route("/api/transcribe", post(transcribe))
        .route("/api/synthesize", post(synthesize))
}
