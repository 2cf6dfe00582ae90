//! OpenAI chat-completions HTTP client

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::OpenAiConfig;
use crate::error::{Error, Result};

use super::types::{ChatCompletionRequest, ChatCompletionResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat client for the OpenAI (or compatible) chat-completions API
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ChatClient {
    /// Create a new chat client
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(Error::Http)?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url,
        })
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat-completions request
    pub async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!("Sending request to chat-completions API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("OpenAI API error: {} - {}", status, body);
            return Err(Error::OpenAi(format!("{}: {}", status, body)));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::OpenAi(format!("Failed to parse response: {} - {}", e, body)))?;

        info!(
            "Chat completion: {} tokens out",
            parsed
                .usage
                .map(|u| u.completion_tokens)
                .unwrap_or_default()
        );

        Ok(parsed)
    }
}
