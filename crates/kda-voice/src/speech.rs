//! Text-to-speech synthesis via the OpenAI TTS API

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, VoiceError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Audio format for synthesized output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Opus,
    Aac,
    Wav,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Wav => "wav",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TTS configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// API key
    pub api_key: String,
    /// Model to use (e.g. "tts-1")
    pub model: String,
    /// Voice to use
    pub voice: String,
    /// Base URL (optional, for compatible endpoints)
    pub base_url: Option<String>,
    /// Output audio format
    pub format: AudioFormat,
    /// Speech speed (0.25 - 4.0)
    pub speed: Option<f32>,
}

impl SpeechConfig {
    /// OpenAI TTS with the given key, model and voice
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            base_url: None,
            format: AudioFormat::Mp3,
            speed: None,
        }
    }

    /// Set the output format
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the speech speed, clamped to the API's accepted range
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed.clamp(0.25, 4.0));
        self
    }

    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

/// Synthesized audio
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// Audio bytes in the requested format
    pub audio_data: Vec<u8>,
    /// Audio format
    pub format: AudioFormat,
    /// Content type reported by the API
    pub content_type: String,
}

impl SynthesisResult {
    /// Audio bytes as base64
    pub fn to_base64(&self) -> String {
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &self.audio_data)
    }
}

/// TTS client for speech synthesis
pub struct SpeechClient {
    client: Client,
    config: SpeechConfig,
}

impl SpeechClient {
    /// Create a new TTS client
    pub fn new(config: SpeechConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| VoiceError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Synthesize speech from text. An optional voice override replaces
    /// the configured voice for this request.
    pub async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<SynthesisResult> {
        let url = format!("{}/audio/speech", self.config.base_url());

        info!("Synthesizing speech: {} chars", text.len());
        debug!("Model: {}, voice: {}", self.config.model, self.config.voice);

        let mut body = serde_json::json!({
            "model": self.config.model,
            "input": text,
            "voice": voice.unwrap_or(&self.config.voice),
            "response_format": self.config.format.as_str(),
        });

        if let Some(speed) = self.config.speed {
            body["speed"] = serde_json::json!(speed);
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::SynthesisFailed(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoiceError::SynthesisFailed(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();

        let audio_data = response
            .bytes()
            .await
            .map_err(|e| VoiceError::SynthesisFailed(format!("Failed to read audio data: {}", e)))?;

        info!(
            "Synthesis complete: {} bytes, content-type: {}",
            audio_data.len(),
            content_type
        );

        Ok(SynthesisResult {
            audio_data: audio_data.to_vec(),
            format: self.config.format,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SpeechConfig::new("test-key", "tts-1", "alloy");
        assert_eq!(config.format, AudioFormat::Mp3);
        assert_eq!(config.base_url(), "https://api.openai.com/v1");
        assert!(config.speed.is_none());
    }

    #[test]
    fn test_speed_is_clamped() {
        let config = SpeechConfig::new("k", "tts-1", "alloy").with_speed(9.0);
        assert_eq!(config.speed, Some(4.0));
    }

    #[test]
    fn test_audio_format_as_str() {
        assert_eq!(AudioFormat::Mp3.as_str(), "mp3");
        assert_eq!(AudioFormat::Wav.as_str(), "wav");
    }

    #[test]
    fn test_synthesis_result_to_base64() {
        let result = SynthesisResult {
            audio_data: b"test audio data".to_vec(),
            format: AudioFormat::Mp3,
            content_type: "audio/mpeg".to_string(),
        };
        assert!(!result.to_base64().is_empty());
    }
}
