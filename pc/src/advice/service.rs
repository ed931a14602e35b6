//! AdviceService trait and request/response shapes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{AdviceError, FallbackReason};
use crate::domain::{DueDate, EnergyLevel, MicroStep, generate_id};

/// One task proposed from a brain dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTask {
    pub id: String,
    pub text: String,
}

impl CandidateTask {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: generate_id("task", &text),
            text,
        }
    }
}

/// Result of `parse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub tasks: Vec<CandidateTask>,
    /// False when the service answered from its own fallback
    pub ai_used: bool,
    pub fallback_reason: Option<FallbackReason>,
}

impl ParseOutcome {
    pub fn from_ai(tasks: Vec<CandidateTask>) -> Self {
        Self {
            tasks,
            ai_used: true,
            fallback_reason: None,
        }
    }
}

/// Input of `breakdown`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownRequest {
    pub task_name: String,
    pub due: DueDate,
    pub energy: EnergyLevel,
}

/// Result of `breakdown`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownOutcome {
    pub steps: Vec<MicroStep>,
}

/// External advice provider; may fail, hang or answer with nothing
#[async_trait]
pub trait AdviceService: Send + Sync {
    async fn parse(&self, raw_text: &str) -> Result<ParseOutcome, AdviceError>;

    async fn breakdown(&self, request: &BreakdownRequest) -> Result<BreakdownOutcome, AdviceError>;
}

/// Advice service that always fails with a fixed error
///
/// Stands in when no client could be built, so every stage degrades with
/// the same reason.
pub struct UnavailableAdvisor {
    error: AdviceError,
}

impl UnavailableAdvisor {
    pub fn new(error: AdviceError) -> Self {
        Self { error }
    }

    pub fn no_api_key() -> Self {
        Self::new(AdviceError::NoApiKey("no advice provider configured".to_string()))
    }
}

#[async_trait]
impl AdviceService for UnavailableAdvisor {
    async fn parse(&self, _raw_text: &str) -> Result<ParseOutcome, AdviceError> {
        debug!(reason = %self.error.reason(), "UnavailableAdvisor::parse: called");
        Err(self.error.clone())
    }

    async fn breakdown(&self, request: &BreakdownRequest) -> Result<BreakdownOutcome, AdviceError> {
        debug!(task = %request.task_name, reason = %self.error.reason(), "UnavailableAdvisor::breakdown: called");
        Err(self.error.clone())
    }
}
