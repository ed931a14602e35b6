//! Persistence adapter seam
//!
//! Every call stands alone: there are no cross-call transactions, and a
//! multi-step change (toggle a step, then record its reward) is a sequence of
//! independent writes. Inserts are upserts so re-issuing a write is safe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::messages::StateResponse;
use crate::domain::{ActivityEvent, Goal, MoodSample, Reward, TaskPlan};

#[async_trait]
pub trait Persistence: Send + Sync {
    async fn insert_mood(&self, sample: MoodSample) -> StateResponse<String>;

    async fn delete_mood(&self, id: &str) -> StateResponse<()>;

    /// Most recent `limit` samples, newest first
    async fn recent_moods(&self, limit: usize) -> StateResponse<Vec<MoodSample>>;

    /// Every sample recorded at or after `since`, newest first
    async fn moods_since(&self, since: DateTime<Utc>) -> StateResponse<Vec<MoodSample>>;

    async fn insert_plan(&self, plan: TaskPlan) -> StateResponse<String>;

    async fn update_plan(&self, plan: TaskPlan) -> StateResponse<()>;

    /// Deleting an absent plan is not an error
    async fn delete_plan(&self, id: &str) -> StateResponse<()>;

    async fn get_plan(&self, id: &str) -> StateResponse<Option<TaskPlan>>;

    /// Plans in creation order
    async fn list_plans(&self, include_completed: bool) -> StateResponse<Vec<TaskPlan>>;

    async fn insert_goal(&self, goal: Goal) -> StateResponse<String>;

    async fn update_goal(&self, goal: Goal) -> StateResponse<()>;

    async fn delete_goal(&self, id: &str) -> StateResponse<()>;

    async fn list_goals(&self, active_only: bool) -> StateResponse<Vec<Goal>>;

    async fn record_reward(&self, reward: Reward) -> StateResponse<String>;

    async fn list_rewards(&self, plan_id: &str) -> StateResponse<Vec<Reward>>;

    async fn record_activity(&self, event: ActivityEvent) -> StateResponse<String>;
}
