//! kda-server: kidney decision aid backend binary
//!
//! Usage:
//!   kda-server           - Start the HTTP API server
//!   kda-server --help    - Show help
//!   kda-server --version - Show version

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use kda_api::middleware::rate_limit::RateLimiter;
use kda_api::AppState;
use kda_core::{ChatClient, Config, SessionManager};
use kda_voice::{SpeechClient, SpeechConfig, TranscribeClient, TranscribeConfig};

/// Run mode
enum RunMode {
    Server,
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("kda-server {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting kda-server...");
    tracing::info!("Chat model: {}", config.openai.model);

    if config.openai.api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set; chat and speech endpoints will fail");
    }

    run_server(config).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }
    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("kda-server - kidney decision aid backend");
    println!();
    println!("Usage:");
    println!("  kda-server           Start the HTTP API server");
    println!("  kda-server --help    Show this help message");
    println!("  kda-server --version Show version");
    println!();
    println!("Environment Variables:");
    println!("  OPENAI_API_KEY       OpenAI API key (required)");
    println!("  OPENAI_MODEL         Chat model (default: gpt-4o-mini)");
    println!("  OPENAI_BASE_URL      Custom API endpoint");
    println!("  PORT                 HTTP API port (default: 3000)");
    println!("  ALLOWED_ORIGINS      Comma-separated CORS origins");
    println!("  DB_PATH              SQLite database path (default: data/kidney-aid.db)");
    println!("  SESSION_TTL_MINUTES  Session inactivity expiry (default: 15)");
    println!("  STATIC_DIR           Directory of prebuilt SPA assets to serve");
}

/// Run the API server plus the housekeeping sweep
async fn run_server(config: Config) -> anyhow::Result<()> {
    let sessions = SessionManager::new(
        &config.session.db_path,
        config.session.ttl_minutes,
        config.session.max_turns,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create session manager: {}", e))?;

    let chat = ChatClient::new(&config.openai)
        .map_err(|e| anyhow::anyhow!("Failed to create chat client: {}", e))?;

    let transcriber = TranscribeClient::new(TranscribeConfig::new(
        config.openai.api_key.clone(),
        config.voice.whisper_model.clone(),
    ))
    .map_err(|e| anyhow::anyhow!("Failed to create transcription client: {}", e))?;

    let speech = SpeechClient::new(SpeechConfig::new(
        config.openai.api_key.clone(),
        config.voice.tts_model.clone(),
        config.voice.tts_voice.clone(),
    ))
    .map_err(|e| anyhow::anyhow!("Failed to create speech client: {}", e))?;

    let state = AppState::new(config, sessions, chat, transcriber, speech);
    let rate_limiter = kda_api::server::build_rate_limiter(&state.config);

    let mut service_handles = Vec::new();

    // Expired-session and rate-limit-window sweep
    let sweep_sessions = Arc::clone(&state.sessions);
    let sweep_limiter = Arc::clone(&rate_limiter);
    let handle = tokio::spawn(async move {
        sweep_loop(sweep_sessions, sweep_limiter).await;
    });
    service_handles.push(handle);

    // HTTP API server
    let port = state.config.server.port;
    let server_limiter = Arc::clone(&rate_limiter);
    let handle = tokio::spawn(async move {
        if let Err(e) = kda_api::start_server(state, server_limiter).await {
            tracing::error!("HTTP API error: {}", e);
        }
    });
    service_handles.push(handle);
    tracing::info!("HTTP API server started on port {}", port);

    tracing::info!("kda-server initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    for handle in service_handles {
        handle.abort();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Periodic housekeeping: purge expired sessions, drop stale
/// rate-limit windows.
async fn sweep_loop(sessions: Arc<SessionManager>, limiter: Arc<RateLimiter>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        if let Err(e) = sessions.purge_expired().await {
            tracing::warn!("Session purge failed: {}", e);
        }
        limiter.cleanup().await;
    }
}
