//! Advice errors and degradation reasons

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::LlmError;

/// Why a stage fell back to local logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    NoApiKey,
    ApiError,
    ParseError,
    RateLimited,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoApiKey => write!(f, "no_api_key"),
            Self::ApiError => write!(f, "api_error"),
            Self::ParseError => write!(f, "parse_error"),
            Self::RateLimited => write!(f, "rate_limited"),
        }
    }
}

/// Marker carried by any result produced through a fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub reason: FallbackReason,
    pub detail: String,
}

impl Degradation {
    pub fn new(reason: FallbackReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.reason, self.detail)
    }
}

/// Failures of the advice service
#[derive(Debug, Clone, Error)]
pub enum AdviceError {
    #[error("No API key configured: {0}")]
    NoApiKey(String),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Advice service error: {0}")]
    Api(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Could not understand advice response: {0}")]
    Parse(String),

    #[error("Advice service returned nothing")]
    Empty,
}

impl AdviceError {
    /// Reason code surfaced with the fallback
    pub fn reason(&self) -> FallbackReason {
        match self {
            Self::NoApiKey(_) => FallbackReason::NoApiKey,
            Self::RateLimited { .. } => FallbackReason::RateLimited,
            Self::Api(_) | Self::Timeout(_) => FallbackReason::ApiError,
            Self::Parse(_) | Self::Empty => FallbackReason::ParseError,
        }
    }

    pub fn degradation(&self) -> Degradation {
        Degradation::new(self.reason(), self.to_string())
    }
}

impl From<LlmError> for AdviceError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey(var) => Self::NoApiKey(var),
            LlmError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            LlmError::Timeout(after) => Self::Timeout(after),
            LlmError::InvalidResponse(msg) => Self::Parse(msg),
            LlmError::Json(e) => Self::Parse(e.to_string()),
            LlmError::ApiError { status, message } => Self::Api(format!("{}: {}", status, message)),
            LlmError::Network(e) => Self::Api(e.to_string()),
        }
    }
}
