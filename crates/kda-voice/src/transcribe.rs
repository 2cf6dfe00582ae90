//! Speech recognition via the OpenAI Whisper API

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, VoiceError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for the transcription client
#[derive(Debug, Clone)]
pub struct TranscribeConfig {
    /// API key
    pub api_key: String,
    /// Model to use (e.g. "whisper-1")
    pub model: String,
    /// Base URL (optional, for compatible endpoints)
    pub base_url: Option<String>,
    /// Language hint (ISO 639-1 code)
    pub language: Option<String>,
}

impl TranscribeConfig {
    /// OpenAI Whisper with the given key and model
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            language: None,
        }
    }

    /// Set a language hint
    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }

    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

/// Transcription result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Transcribed text
    pub text: String,
    /// Detected language (if reported)
    pub language: Option<String>,
    /// Audio duration in seconds (if reported)
    pub duration: Option<f64>,
}

/// Whisper client for speech recognition
pub struct TranscribeClient {
    client: Client,
    config: TranscribeConfig,
}

impl TranscribeClient {
    /// Create a new transcription client
    pub fn new(config: TranscribeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| VoiceError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Transcribe audio bytes. An optional per-request language hint
    /// overrides the configured one.
    pub async fn transcribe(
        &self,
        audio_data: &[u8],
        filename: &str,
        language: Option<&str>,
    ) -> Result<TranscriptionResult> {
        let url = format!("{}/audio/transcriptions", self.config.base_url());

        info!(
            "Transcribing audio: {} bytes, filename: {}",
            audio_data.len(),
            filename
        );
        debug!("Using model: {}", self.config.model);

        let mut form = reqwest::multipart::Form::new()
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json".to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio_data.to_vec())
                    .file_name(filename.to_string())
                    .mime_str(guess_mime(filename))
                    .map_err(|e| {
                        VoiceError::EncodingError(format!("Failed to set mime type: {}", e))
                    })?,
            );

        let lang = language
            .map(str::to_string)
            .or_else(|| self.config.language.clone());
        if let Some(lang) = lang {
            form = form.text("language", lang);
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::RecognitionFailed(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoiceError::RecognitionFailed(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let result: TranscriptionResult = response
            .json()
            .await
            .map_err(|e| VoiceError::RecognitionFailed(format!("Failed to parse response: {}", e)))?;

        info!(
            "Transcription complete: {} characters, language: {:?}",
            result.text.len(),
            result.language
        );

        Ok(result)
    }

    /// Transcribe base64-encoded audio
    pub async fn transcribe_base64(
        &self,
        base64_audio: &str,
        filename: &str,
        language: Option<&str>,
    ) -> Result<TranscriptionResult> {
        let audio_data =
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, base64_audio)
                .map_err(|e| VoiceError::DecodingError(format!("Invalid base64: {}", e)))?;

        self.transcribe(&audio_data, filename, language).await
    }
}

/// Pick a mime type from the uploaded filename
fn guess_mime(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("m4a") => "audio/mp4",
        _ => "audio/mpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let config = TranscribeConfig::new("test-key", "whisper-1").with_language("cy");
        assert_eq!(config.model, "whisper-1");
        assert_eq!(config.language, Some("cy".to_string()));
        assert_eq!(config.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("clip.wav"), "audio/wav");
        assert_eq!(guess_mime("clip.webm"), "audio/webm");
        assert_eq!(guess_mime("clip.mp3"), "audio/mpeg");
        assert_eq!(guess_mime("noext"), "audio/mpeg");
    }

    #[tokio::test]
    async fn test_transcribe_base64_rejects_bad_input() {
        let client = TranscribeClient::new(TranscribeConfig::new("k", "whisper-1")).unwrap();
        let err = client
            .transcribe_base64("not$$base64", "clip.mp3", None)
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::DecodingError(_)));
    }
}
