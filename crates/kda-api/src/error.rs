//! API error type and HTTP status mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use kda_core::PiiKind;

/// kda-api error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Message contains personal information ({0})")]
    PiiDetected(PiiKind),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::PiiDetected(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::PiiDetected(_) => "PII_DETECTED",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::Upstream(_) => "UPSTREAM",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<kda_core::Error> for ApiError {
    fn from(err: kda_core::Error) -> Self {
        match err {
            kda_core::Error::SessionNotFound(id) => Self::SessionNotFound(id),
            kda_core::Error::InvalidValue(msg) => Self::Validation(msg),
            kda_core::Error::OpenAi(msg) => Self::Upstream(msg),
            kda_core::Error::Http(e) => Self::Upstream(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<kda_voice::VoiceError> for ApiError {
    fn from(err: kda_voice::VoiceError) -> Self {
        match err {
            kda_voice::VoiceError::DecodingError(msg) => Self::Validation(msg),
            kda_voice::VoiceError::RecognitionFailed(msg)
            | kda_voice::VoiceError::SynthesisFailed(msg) => Self::Upstream(msg),
            kda_voice::VoiceError::HttpError(e) => Self::Upstream(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::PiiDetected(PiiKind::NhsNumber).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::SessionNotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::Upstream("down".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(ApiError::PiiDetected(PiiKind::Postcode).code(), "PII_DETECTED");
        assert_eq!(ApiError::RateLimited.code(), "RATE_LIMITED");
    }
}
