//! Pacer - session orchestration for low-executive-function task flow
//!
//! Pacer reads how the user is doing, turns a brain dump into small
//! actionable steps, and keeps a focus session moving without ever stopping
//! on an error.
//!
//! # Core Concepts
//!
//! - **Mode first**: a mood sample classifies the user into recovery,
//!   warming_up, maintenance or growth, and the mode shapes the pipeline
//! - **Resumable pipeline**: brain_dump, triage, context, breakdown and
//!   dashboard, with a draft snapshot written before every transition
//! - **Degrade, don't stop**: a failing advice service falls back to
//!   deterministic local results tagged as degraded
//! - **Optimistic focus**: toggles, deletions and captures apply locally at
//!   once and reach persistence afterwards
//!
//! # Modules
//!
//! - [`mode`] - Mood classification and the mode state machine
//! - [`pipeline`] - Task-breakdown pipeline and draft snapshots
//! - [`focus`] - Focus session monitor
//! - [`advice`] - Advice service and local fallbacks
//! - [`llm`] - LLM client trait and Anthropic implementation
//! - [`state`] - Persistence adapter and the StateManager actor
//! - [`session`] - Session context and actor handle
//! - [`timer`] - Named-timer scheduler
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod advice;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod focus;
pub mod llm;
pub mod mode;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod timer;

// Re-export commonly used types
pub use advice::{AdviceError, AdviceService, Degradation, FallbackReason, create_service};
pub use config::{AdviceConfig, Config};
pub use domain::{EnergyLevel, Goal, MicroStep, Mode, ModeState, MoodSample, Priority, Reward, TaskPlan};
pub use error::ValidationError;
pub use focus::{BurstChoice, DriftChoice, FocusMonitor};
pub use llm::{AnthropicClient, LlmClient, LlmError, create_client};
pub use mode::{ModeEngine, ModeEvent, MoodPolicy, classify};
pub use pipeline::{FileDraftStore, PipelineController, Stage};
pub use session::{Session, SessionError, SessionHandle, SessionSignal};
pub use state::{Persistence, StateError, StateManager};
pub use timer::{TimerKey, TimerPolicy, TimerScheduler};
