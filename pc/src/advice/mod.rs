//! Advice service: split free text into tasks, break tasks into steps
//!
//! The service is external and unreliable. Callers never use it directly;
//! they go through `parse_with_fallback` / `breakdown_with_fallback`, which
//! turn every failure, timeout or empty answer into a deterministic local
//! result tagged with a `Degradation`.

mod error;
mod fallback;
mod llm_advisor;
mod service;

pub use error::{AdviceError, Degradation, FallbackReason};
pub use fallback::{
    Advised, FALLBACK_STEPS, breakdown_with_fallback, fallback_steps, fallback_tasks, parse_with_fallback,
};
pub use llm_advisor::LlmAdvisor;
#[cfg(test)]
pub use service::mock;
pub use service::{AdviceService, BreakdownOutcome, BreakdownRequest, CandidateTask, ParseOutcome, UnavailableAdvisor};

use std::sync::Arc;

use tracing::warn;

use crate::config::AdviceConfig;
use crate::llm;

/// Build the advice service for a configuration
///
/// Without a usable LLM client the pipeline still runs, fully degraded.
pub fn create_service(config: &AdviceConfig) -> Arc<dyn AdviceService> {
    match llm::create_client(config) {
        Ok(client) => Arc::new(LlmAdvisor::new(client, config.max_tokens)),
        Err(e) => {
            warn!(error = %e, "Advice service unavailable, running with local fallbacks");
            Arc::new(UnavailableAdvisor::new(AdviceError::from(e)))
        }
    }
}
