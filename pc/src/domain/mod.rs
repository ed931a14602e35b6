//! Domain types for Pacer
//!
//! Mood samples, affective modes, task plans with micro-steps, goals,
//! rewards and activity events. Everything persisted implements the
//! `pacestore::Record` trait.

mod activity;
mod goal;
mod id;
mod mood;
mod plan;
mod priority;
mod reward;

pub use activity::{ActivityEvent, ActivityKind};
pub use goal::Goal;
pub use id::{generate_id, slugify};
pub use mood::{EnergyLevel, Mode, ModeState, MoodSample, streak_days};
pub use plan::{BulkCompletion, DueDate, MicroStep, StepToggle, TaskPlan};
pub use priority::Priority;
pub use reward::{Reward, RewardKind};

// Re-export pacestore types for convenience
pub use pacestore::{Filter, FilterOp, IndexValue, Record, Store, now_ms};
