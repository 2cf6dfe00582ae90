//! OpenAI-backed chat: client, wire types, and prompt assembly.

pub mod client;
pub mod prompt;
pub mod types;

pub use client::ChatClient;
pub use prompt::build_system_prompt;
pub use types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, Usage};
