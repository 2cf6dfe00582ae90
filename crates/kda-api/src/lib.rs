//! kda-api: HTTP API for the kidney decision aid
//!
//! REST endpoints for session lifecycle, the PII-filtered chat
//! pipeline, and speech transcription/synthesis. Built with axum.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, ErrorBody};
pub use server::{start_server, AppState};
