//! Pipeline errors

use thiserror::Error;

use crate::error::ValidationError;

/// Why triage confirmation is on hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmBlock {
    /// A sprint must be trimmed to `limit` tasks first
    SprintTooMany { limit: usize, count: usize },
    /// Low energy and these tasks look too big; choose how to go on
    TooBig { task_ids: Vec<String> },
}

impl std::fmt::Display for ConfirmBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SprintTooMany { limit, count } => {
                write!(f, "sprint takes at most {} tasks, {} selected", limit, count)
            }
            Self::TooBig { task_ids } => write!(f, "{} task(s) look too big for low energy", task_ids.len()),
        }
    }
}

/// A pipeline operation that did not go through
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Confirmation blocked: {0}")]
    Blocked(ConfirmBlock),
}
