//! Session types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Languages the decision aid ships content for.
///
/// ISO 639-1 codes; `cy` is Welsh, the rest cover the most common
/// community languages for UK kidney services.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "cy", "ur", "pa", "gu", "bn", "pl", "ar"];

/// Check if a language code is one the decision aid supports.
pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code)
}

/// Who the session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Carer,
    Family,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Carer => "carer",
            Self::Family => "family",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Self::Patient),
            "carer" => Ok(Self::Carer),
            "family" => Ok(Self::Family),
            other => Err(Error::InvalidValue(format!("unknown role: {}", other))),
        }
    }
}

/// Where the patient is in the kidney-disease care pathway.
///
/// Used to personalize informational content and the chat system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStage {
    JustDiagnosed,
    ExploringOptions,
    Deciding,
    Preparing,
    OnTreatment,
    ConservativeCare,
}

impl JourneyStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JustDiagnosed => "just_diagnosed",
            Self::ExploringOptions => "exploring_options",
            Self::Deciding => "deciding",
            Self::Preparing => "preparing",
            Self::OnTreatment => "on_treatment",
            Self::ConservativeCare => "conservative_care",
        }
    }
}

impl fmt::Display for JourneyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JourneyStage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "just_diagnosed" => Ok(Self::JustDiagnosed),
            "exploring_options" => Ok(Self::ExploringOptions),
            "deciding" => Ok(Self::Deciding),
            "preparing" => Ok(Self::Preparing),
            "on_treatment" => Ok(Self::OnTreatment),
            "conservative_care" => Ok(Self::ConservativeCare),
            other => Err(Error::InvalidValue(format!(
                "unknown journey stage: {}",
                other
            ))),
        }
    }
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One turn of the session's chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ChatTurn {
    /// Create a user turn timestamped now
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            at: Utc::now(),
        }
    }

    /// Create an assistant turn timestamped now
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

/// Partial update applied through `PUT /api/session/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionPatch {
    pub language: Option<String>,
    pub role: Option<Role>,
    pub journey_stage: Option<JourneyStage>,
    pub answers: Option<serde_json::Value>,
}

impl SessionPatch {
    pub fn is_empty(&self) -> bool {
        self.language.is_none()
            && self.role.is_none()
            && self.journey_stage.is_none()
            && self.answers.is_none()
    }
}

/// Ephemeral per-user session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: String,
    /// Content language (ISO 639-1)
    pub language: String,
    /// Who is using the aid
    pub role: Role,
    /// Position in the care pathway
    pub journey_stage: JourneyStage,
    /// Questionnaire answers, keyed by question id
    pub answers: serde_json::Value,
    /// Chat history
    pub history: Vec<ChatTurn>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
    /// Last activity timestamp (drives the sliding expiry)
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    pub fn new(language: impl Into<String>, role: Role, journey_stage: JourneyStage) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            language: language.into(),
            role,
            journey_stage,
            answers: serde_json::Value::Object(serde_json::Map::new()),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            last_active_at: now,
        }
    }

    /// Slide the inactivity window forward
    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    /// Whether the session has been idle longer than `ttl`
    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() - self.last_active_at > ttl
    }

    /// Apply a partial update. The caller validates the language code.
    pub fn apply_patch(&mut self, patch: SessionPatch) {
        if let Some(language) = patch.language {
            self.language = language;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(stage) = patch.journey_stage {
            self.journey_stage = stage;
        }
        if let Some(answers) = patch.answers {
            self.answers = answers;
        }
        self.updated_at = Utc::now();
        self.touch();
    }

    /// Append a chat turn
    pub fn push_turn(&mut self, turn: ChatTurn) {
        self.history.push(turn);
        self.updated_at = Utc::now();
        self.touch();
    }

    /// Trim oldest turns so at most `max_turns` remain
    pub fn trim_history(&mut self, max_turns: usize) {
        if max_turns > 0 && self.history.len() > max_turns {
            let excess = self.history.len() - max_turns;
            self.history.drain(0..excess);
        }
    }

    /// Number of chat turns
    pub fn turn_count(&self) -> usize {
        self.history.len()
    }
}
