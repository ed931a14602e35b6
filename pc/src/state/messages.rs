//! State manager messages
//!
//! Commands and responses for the actor pattern.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{ActivityEvent, Goal, MoodSample, Reward, TaskPlan};

/// Errors from persistence operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Mood samples
    InsertMood {
        sample: MoodSample,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    DeleteMood {
        id: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    RecentMoods {
        limit: usize,
        reply: oneshot::Sender<StateResponse<Vec<MoodSample>>>,
    },
    MoodsSince {
        since: DateTime<Utc>,
        reply: oneshot::Sender<StateResponse<Vec<MoodSample>>>,
    },

    // Task plans
    InsertPlan {
        plan: TaskPlan,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    UpdatePlan {
        plan: TaskPlan,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    DeletePlan {
        id: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    GetPlan {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<TaskPlan>>>,
    },
    ListPlans {
        include_completed: bool,
        reply: oneshot::Sender<StateResponse<Vec<TaskPlan>>>,
    },

    // Goals
    InsertGoal {
        goal: Goal,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    UpdateGoal {
        goal: Goal,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    DeleteGoal {
        id: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListGoals {
        active_only: bool,
        reply: oneshot::Sender<StateResponse<Vec<Goal>>>,
    },

    // Rewards and activity
    RecordReward {
        reward: Reward,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    ListRewards {
        plan_id: String,
        reply: oneshot::Sender<StateResponse<Vec<Reward>>>,
    },
    RecordActivity {
        event: ActivityEvent,
        reply: oneshot::Sender<StateResponse<String>>,
    },

    // Shutdown
    Shutdown,
}
