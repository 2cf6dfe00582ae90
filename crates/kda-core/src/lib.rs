//! kda-core: Kidney Decision Aid Core Library
//!
//! Core functionality for the kidney-treatment decision aid backend:
//! session lifecycle, PII filtering, configuration and the
//! OpenAI-backed chat client.

pub mod config;
pub mod error;
pub mod llm;
pub mod pii;
pub mod session;

pub use config::{ChatLimitsConfig, Config, OpenAiConfig, ServerConfig, SessionConfig, VoiceConfig};
pub use error::{Error, Result};
pub use llm::{ChatClient, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Usage};
pub use pii::{PiiFilter, PiiKind};
pub use session::{
    ChatTurn, JourneyStage, Role, Session, SessionManager, SessionPatch, SessionStore, TurnRole,
};
