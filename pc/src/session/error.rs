//! Session errors

use thiserror::Error;

use crate::error::ValidationError;
use crate::pipeline::PipelineError;

/// Why a session operation was refused
///
/// Persistence and advice failures never show up here: the first degrades to
/// a `PersistenceFailed` signal, the second to a local fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Session is no longer running")]
    Closed,
}
