//! Configuration management
//!
//! Configuration is resolved in the following order:
//! 1. Environment variables
//! 2. `kidney-aid.toml` configuration file
//! 3. Built-in defaults
//!
//! Inside the configuration file, `${VAR_NAME}` is expanded from the
//! environment before parsing.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;

/// OpenAI API configuration (chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Chat model to use
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL (optional, for custom/compatible endpoints)
    pub base_url: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_chat_model(),
            base_url: None,
        }
    }
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port for the HTTP API server
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty means permissive (development).
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Directory of prebuilt SPA assets to serve at `/` (optional)
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            allowed_origins: Vec::new(),
            static_dir: None,
        }
    }
}

fn default_port() -> u16 {
    3000
}

/// Session storage and lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Sliding inactivity expiry, in minutes
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,

    /// Maximum chat turns kept per session (oldest trimmed first)
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            ttl_minutes: default_ttl_minutes(),
            max_turns: default_max_turns(),
        }
    }
}

fn default_db_path() -> String {
    "data/kidney-aid.db".to_string()
}

fn default_ttl_minutes() -> u64 {
    15
}

fn default_max_turns() -> usize {
    100
}

/// Request limits for the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLimitsConfig {
    /// Maximum chat message length, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Rate limit: maximum requests per window, per client
    #[serde(default = "default_rate_max_requests")]
    pub rate_max_requests: u32,

    /// Rate limit: window length in seconds
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,
}

impl Default for ChatLimitsConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            rate_max_requests: default_rate_max_requests(),
            rate_window_secs: default_rate_window_secs(),
        }
    }
}

fn default_max_message_chars() -> usize {
    2000
}

fn default_rate_max_requests() -> u32 {
    60
}

fn default_rate_window_secs() -> u64 {
    60
}

/// Speech (Whisper / TTS) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Whisper model for transcription
    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,

    /// TTS model for synthesis
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// TTS voice
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            whisper_model: default_whisper_model(),
            tts_model: default_tts_model(),
            tts_voice: default_tts_voice(),
        }
    }
}

fn default_whisper_model() -> String {
    "whisper-1".to_string()
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_tts_voice() -> String {
    "alloy".to_string()
}

/// Main configuration for the kidney-aid backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// OpenAI configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Chat request limits
    #[serde(default)]
    pub limits: ChatLimitsConfig,

    /// Voice configuration
    #[serde(default)]
    pub voice: VoiceConfig,
}

impl Config {
    /// Expand `${VAR_NAME}` references with environment variable values.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // consume '{'

                let mut var_name = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(c);
                    chars.next();
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply env overrides.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let toml_content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let expanded = Self::expand_env_vars(&toml_content);

        let mut config: Config = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from the default path, falling back to environment only.
    ///
    /// Looks for `./kidney-aid.toml` in the current directory.
    pub fn load() -> crate::Result<Self> {
        if Path::new("kidney-aid.toml").exists() {
            return Self::from_toml_file("kidney-aid.toml");
        }
        Self::from_env()
    }

    /// Override file/default values from the environment.
    fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.is_empty() {
                self.openai.api_key = api_key;
            }
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            if !model.is_empty() {
                self.openai.model = model;
            }
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            if !base_url.is_empty() {
                self.openai.base_url = Some(base_url);
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(dir) = std::env::var("STATIC_DIR") {
            if !dir.is_empty() {
                self.server.static_dir = Some(dir);
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            if !path.is_empty() {
                self.session.db_path = path;
            }
        }
        if let Ok(ttl) = std::env::var("SESSION_TTL_MINUTES") {
            if let Ok(t) = ttl.parse() {
                self.session.ttl_minutes = t;
            }
        }
        if let Ok(max) = std::env::var("SESSION_MAX_TURNS") {
            if let Ok(m) = max.parse() {
                self.session.max_turns = m;
            }
        }

        if let Ok(max) = std::env::var("RATE_MAX_REQUESTS") {
            if let Ok(m) = max.parse() {
                self.limits.rate_max_requests = m;
            }
        }
        if let Ok(win) = std::env::var("RATE_WINDOW_SECS") {
            if let Ok(w) = win.parse() {
                self.limits.rate_window_secs = w;
            }
        }
        if let Ok(max) = std::env::var("MAX_MESSAGE_CHARS") {
            if let Ok(m) = max.parse() {
                self.limits.max_message_chars = m;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.session.ttl_minutes, 15);
        assert_eq!(config.limits.max_message_chars, 2000);
        assert_eq!(config.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [server]
            port = 8080
            allowed_origins = ["https://example.nhs.uk"]

            [session]
            ttl_minutes = 30
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.allowed_origins.len(), 1);
        assert_eq!(config.session.ttl_minutes, 30);
        // untouched sections keep defaults
        assert_eq!(config.limits.rate_max_requests, 60);
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe { std::env::set_var("KDA_TEST_VALUE", "secret") };
        let expanded = Config::expand_env_vars("api_key = \"${KDA_TEST_VALUE}\"");
        assert_eq!(expanded, "api_key = \"secret\"");

        let missing = Config::expand_env_vars("key = \"${KDA_TEST_MISSING_VAR}\"");
        assert_eq!(missing, "key = \"\"");
    }
}
