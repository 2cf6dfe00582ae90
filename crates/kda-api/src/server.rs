//! HTTP API Server
//!
//! Builds the axum router (routes + middleware) and runs the server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::{header, HeaderValue, Method};
use axum::middleware::Next;
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use kda_core::{ChatClient, Config, PiiFilter, SessionManager};
use kda_voice::{SpeechClient, TranscribeClient};

use crate::middleware::headers::security_headers_middleware;
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitConfig, RateLimiter};
use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionManager>,
    pub chat: Arc<ChatClient>,
    pub transcriber: Arc<TranscribeClient>,
    pub speech: Arc<SpeechClient>,
    pub pii: Arc<PiiFilter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        sessions: SessionManager,
        chat: ChatClient,
        transcriber: TranscribeClient,
        speech: SpeechClient,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            chat: Arc::new(chat),
            transcriber: Arc::new(transcriber),
            speech: Arc::new(speech),
            pii: Arc::new(PiiFilter::new()),
            started_at: Instant::now(),
        }
    }
}

/// Build the full application router
pub fn build_router(state: AppState, rate_limiter: Arc<RateLimiter>) -> Router {
    let cors = cors_layer(&state.config);

    let mut app = Router::new()
        .merge(routes())
        .layer(middleware::from_fn(move |request: Request, next: Next| {
            let limiter = Arc::clone(&rate_limiter);
            async move { rate_limit_middleware(limiter, request, next).await }
        }))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Prebuilt SPA bundle, when configured
    if let Some(dir) = &state.config.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Build the rate limiter from configuration
pub fn build_rate_limiter(config: &Config) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::with_config(RateLimitConfig {
        max_requests: config.limits.rate_max_requests,
        window: Duration::from_secs(config.limits.rate_window_secs),
    }))
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.server.allowed_origins.is_empty() {
        warn!("No CORS origins configured, allowing any origin");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

/// Start the HTTP API server
pub async fn start_server(state: AppState, rate_limiter: Arc<RateLimiter>) -> anyhow::Result<()> {
    let port = state.config.server.port;
    let app = build_router(state, rate_limiter);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use kda_core::config::OpenAiConfig;
    use kda_voice::{SpeechConfig, TranscribeConfig};

    fn test_state() -> AppState {
        let config = Config::default();
        let sessions = SessionManager::in_memory(15, 100).unwrap();
        let chat = ChatClient::new(&OpenAiConfig::default()).unwrap();
        let transcriber =
            TranscribeClient::new(TranscribeConfig::new("test-key", "whisper-1")).unwrap();
        let speech = SpeechClient::new(SpeechConfig::new("test-key", "tts-1", "alloy")).unwrap();
        AppState::new(config, sessions, chat, transcriber, speech)
    }

    fn test_app() -> Router {
        let state = test_state();
        let limiter = build_rate_limiter(&state.config);
        build_router(state, limiter)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        // Helmet-equivalent headers are applied everywhere
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_session_crud() {
        let state = test_state();
        let limiter = build_rate_limiter(&state.config);

        // Create
        let response = build_router(state.clone(), Arc::clone(&limiter))
            .oneshot(json_request(
                "POST",
                "/api/session",
                serde_json::json!({
                    "language": "en",
                    "role": "patient",
                    "journeyStage": "just_diagnosed"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        let session_id = body["sessionId"].as_str().unwrap().to_string();
        assert_eq!(body["expiresInSecs"], 15 * 60);

        // Read
        let response = build_router(state.clone(), Arc::clone(&limiter))
            .oneshot(
                Request::builder()
                    .uri(format!("/api/session/{}", session_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["language"], "en");
        assert_eq!(body["journeyStage"], "just_diagnosed");

        // Update
        let response = build_router(state.clone(), Arc::clone(&limiter))
            .oneshot(json_request(
                "PUT",
                &format!("/api/session/{}", session_id),
                serde_json::json!({
                    "journeyStage": "deciding",
                    "answers": { "prefers_home_treatment": true }
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["journeyStage"], "deciding");
        assert_eq!(body["answers"]["prefers_home_treatment"], true);

        // Delete
        let response = build_router(state.clone(), Arc::clone(&limiter))
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/session/{}", session_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // Gone
        let response = build_router(state, limiter)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/session/{}", session_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_session_rejects_unknown_language() {
        let app = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/session",
                serde_json::json!({
                    "language": "xx",
                    "role": "patient",
                    "journeyStage": "deciding"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_chat_unknown_session_is_404() {
        let app = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                serde_json::json!({
                    "sessionId": "no-such-session",
                    "message": "What is dialysis?"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_chat_rejects_oversized_message() {
        let app = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                serde_json::json!({
                    "sessionId": "irrelevant",
                    "message": "x".repeat(2001)
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_chat_rejects_pii() {
        let app = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                serde_json::json!({
                    "sessionId": "irrelevant",
                    "message": "my NHS number is 943 476 5919"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "PII_DETECTED");
    }

    #[tokio::test]
    async fn test_rate_limit_returns_429() {
        let state = test_state();
        let limiter = Arc::new(RateLimiter::with_config(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
        }));

        let response = build_router(state.clone(), Arc::clone(&limiter))
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("x-forwarded-for", "203.0.113.7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = build_router(state, limiter)
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("x-forwarded-for", "203.0.113.7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(response).await;
        assert_eq!(body["code"], "RATE_LIMITED");
    }
}
