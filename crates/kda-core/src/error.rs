//! Error types for kda-core

use thiserror::Error;

/// Main error type for kda-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("OpenAI API error: {0}")]
    OpenAi(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for kda-core
pub type Result<T> = std::result::Result<T, Error>;
