//! Error types shared by the provider adapters, the pipeline and the HTTP layer.

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Normalized failure category for any outbound provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Connection refused, DNS failure, timeout.
    Unreachable,
    /// The provider answered, but not with something we can use.
    InvalidResponse,
    /// HTTP 429 or an equivalent provider signal.
    RateLimited,
    /// Anything else.
    Unknown,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unreachable => "provider unreachable",
            Self::InvalidResponse => "invalid provider response",
            Self::RateLimited => "provider rate limited",
            Self::Unknown => "provider error",
        };
        f.write_str(s)
    }
}

/// A provider failure, already mapped onto [`ProviderErrorKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unreachable, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidResponse, message)
    }

    /// Map a non-success HTTP status and its body.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let kind = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ProviderErrorKind::RateLimited
        } else {
            ProviderErrorKind::Unknown
        };
        let body = body.chars().take(300).collect::<String>();
        Self::new(kind, format!("HTTP {status}: {body}"))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() || err.is_connect() {
            ProviderErrorKind::Unreachable
        } else if err.is_decode() || err.is_body() {
            ProviderErrorKind::InvalidResponse
        } else if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            ProviderErrorKind::RateLimited
        } else {
            ProviderErrorKind::Unknown
        };
        Self::new(kind, err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_response(err.to_string())
    }
}

/// Terminal failure of one pipeline operation.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    /// The operation needs an article or summary the session does not have.
    #[error("{0}")]
    NotFound(String),

    #[error("Failed to fetch article: {0}")]
    Fetch(#[source] ProviderError),

    #[error("No article found for title {0:?}")]
    NoSearchResults(String),

    #[error("Error searching for the article: {0}")]
    Search(#[source] ProviderError),

    #[error("Error translating text: {0}")]
    Translation(#[source] ProviderError),

    #[error("Error summarizing the article: {0}")]
    Summarization(#[source] ProviderError),

    #[error("Error answering the question: {0}")]
    Answer(#[source] ProviderError),

    #[error("Error synthesizing audio: {0}")]
    Audio(#[source] ProviderError),
}

impl PipelineError {
    fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Fetch(e)
            | Self::Search(e)
            | Self::Translation(e)
            | Self::Summarization(e)
            | Self::Answer(e)
            | Self::Audio(e) => Some(e),
            Self::Validation(_) | Self::NotFound(_) | Self::NoSearchResults(_) => None,
        }
    }

    /// HTTP status this error is reported with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self
            .provider_error()
            .is_some_and(|e| e.kind == ProviderErrorKind::RateLimited)
        {
            return StatusCode::TOO_MANY_REQUESTS;
        }
        match self {
            Self::Validation(_) | Self::NotFound(_) | Self::Fetch(_) | Self::NoSearchResults(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Search(_)
            | Self::Translation(_)
            | Self::Summarization(_)
            | Self::Answer(_)
            | Self::Audio(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body: `{"detail": "..."}`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Pipeline operation failed");
        } else {
            tracing::warn!(error = %self, status = %status, "Pipeline request rejected");
        }
        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            PipelineError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::NotFound("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::NoSearchResults("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::Summarization(ProviderError::unreachable("down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_provider_maps_to_429() {
        let err = ProviderError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
        assert_eq!(
            PipelineError::Translation(err).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_from_status_truncates_body() {
        let body = "x".repeat(1000);
        let err = ProviderError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        assert_eq!(err.kind, ProviderErrorKind::Unknown);
        assert!(err.message.len() < 400);
    }

    #[test]
    fn test_messages_carry_the_reason() {
        let err = PipelineError::Fetch(ProviderError::unreachable("connection refused"));
        assert_eq!(
            err.to_string(),
            "Failed to fetch article: provider unreachable: connection refused"
        );
    }
}
