//! Validation errors shared across the session core
//!
//! A `ValidationError` blocks the operation that raised it and never has a
//! persistence side effect.

use thiserror::Error;

/// Errors for rejected user input or operations in the wrong state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Mood score {0} is out of range (0-10)")]
    MoodOutOfRange(u8),

    #[error("Input is empty")]
    EmptyInput,

    #[error("Input is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("No tasks selected")]
    NoTasks,

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Operation '{operation}' is not valid in stage {stage}")]
    WrongStage { operation: &'static str, stage: String },

    #[error("No short-burst timer is running")]
    NoBurst,

    #[error("Nothing is pending")]
    NothingPending,
}
