//! StateManager - actor that owns the record store
//!
//! Processes commands via channels so the session never touches the store
//! directly and store calls never run on the session loop.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{StateCommand, StateError, StateResponse};
use super::persistence::Persistence;
use crate::domain::{ActivityEvent, Filter, FilterOp, Goal, MoodSample, Reward, Store, TaskPlan};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over a store in `store_dir`
    pub fn spawn(store_dir: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_dir = %store_dir.as_ref().display(), "spawn: called");
        let mut store = Store::open(store_dir.as_ref())?;

        let plan_count = store.rebuild_indexes::<TaskPlan>()?;
        let goal_count = store.rebuild_indexes::<Goal>()?;
        info!(plan_count, goal_count, "Rebuilt indexes for TaskPlan and Goal records");

        Ok(Self::start(store))
    }

    /// Spawn an actor over a throwaway in-memory store
    pub fn in_memory() -> eyre::Result<Self> {
        debug!("in_memory: called");
        Ok(Self::start(Store::open_in_memory()?))
    }

    fn start(store: Store) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!("StateManager spawned");
        Self { tx }
    }

    /// Send one command and wait for its reply
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Stop the actor; pending commands already queued are still served
    pub async fn shutdown(&self) -> StateResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

#[async_trait]
impl Persistence for StateManager {
    async fn insert_mood(&self, sample: MoodSample) -> StateResponse<String> {
        debug!(id = %sample.id(), score = sample.mood_score(), "insert_mood: called");
        self.request(|reply| StateCommand::InsertMood { sample, reply }).await
    }

    async fn delete_mood(&self, id: &str) -> StateResponse<()> {
        debug!(%id, "delete_mood: called");
        let id = id.to_string();
        self.request(|reply| StateCommand::DeleteMood { id, reply }).await
    }

    async fn recent_moods(&self, limit: usize) -> StateResponse<Vec<MoodSample>> {
        debug!(limit, "recent_moods: called");
        self.request(|reply| StateCommand::RecentMoods { limit, reply }).await
    }

    async fn moods_since(&self, since: DateTime<Utc>) -> StateResponse<Vec<MoodSample>> {
        debug!(%since, "moods_since: called");
        self.request(|reply| StateCommand::MoodsSince { since, reply }).await
    }

    async fn insert_plan(&self, plan: TaskPlan) -> StateResponse<String> {
        debug!(plan_id = %plan.id, "insert_plan: called");
        self.request(|reply| StateCommand::InsertPlan { plan, reply }).await
    }

    async fn update_plan(&self, plan: TaskPlan) -> StateResponse<()> {
        debug!(plan_id = %plan.id, completed = plan.is_complete(), "update_plan: called");
        self.request(|reply| StateCommand::UpdatePlan { plan, reply }).await
    }

    async fn delete_plan(&self, id: &str) -> StateResponse<()> {
        debug!(%id, "delete_plan: called");
        let id = id.to_string();
        self.request(|reply| StateCommand::DeletePlan { id, reply }).await
    }

    async fn get_plan(&self, id: &str) -> StateResponse<Option<TaskPlan>> {
        debug!(%id, "get_plan: called");
        let id = id.to_string();
        self.request(|reply| StateCommand::GetPlan { id, reply }).await
    }

    async fn list_plans(&self, include_completed: bool) -> StateResponse<Vec<TaskPlan>> {
        debug!(include_completed, "list_plans: called");
        self.request(|reply| StateCommand::ListPlans {
            include_completed,
            reply,
        })
        .await
    }

    async fn insert_goal(&self, goal: Goal) -> StateResponse<String> {
        debug!(goal_id = %goal.id, "insert_goal: called");
        self.request(|reply| StateCommand::InsertGoal { goal, reply }).await
    }

    async fn update_goal(&self, goal: Goal) -> StateResponse<()> {
        debug!(goal_id = %goal.id, "update_goal: called");
        self.request(|reply| StateCommand::UpdateGoal { goal, reply }).await
    }

    async fn delete_goal(&self, id: &str) -> StateResponse<()> {
        debug!(%id, "delete_goal: called");
        let id = id.to_string();
        self.request(|reply| StateCommand::DeleteGoal { id, reply }).await
    }

    async fn list_goals(&self, active_only: bool) -> StateResponse<Vec<Goal>> {
        debug!(active_only, "list_goals: called");
        self.request(|reply| StateCommand::ListGoals { active_only, reply }).await
    }

    async fn record_reward(&self, reward: Reward) -> StateResponse<String> {
        debug!(reward_id = %reward.id, kind = %reward.kind, "record_reward: called");
        self.request(|reply| StateCommand::RecordReward { reward, reply }).await
    }

    async fn list_rewards(&self, plan_id: &str) -> StateResponse<Vec<Reward>> {
        debug!(%plan_id, "list_rewards: called");
        let plan_id = plan_id.to_string();
        self.request(|reply| StateCommand::ListRewards { plan_id, reply }).await
    }

    async fn record_activity(&self, event: ActivityEvent) -> StateResponse<String> {
        debug!(kind = %event.kind, "record_activity: called");
        self.request(|reply| StateCommand::RecordActivity { event, reply }).await
    }
}

fn store_err(e: eyre::Report) -> StateError {
    StateError::StoreError(e.to_string())
}

/// Actor loop that processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::InsertMood { sample, reply } => {
                debug!(id = %sample.id(), "actor_loop: InsertMood command");
                let _ = reply.send(store.upsert(sample).map_err(store_err));
            }

            StateCommand::DeleteMood { id, reply } => {
                debug!(%id, "actor_loop: DeleteMood command");
                let result = store.delete::<MoodSample>(&id).map(|_| ()).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::RecentMoods { limit, reply } => {
                debug!(limit, "actor_loop: RecentMoods command");
                // list() orders by updated_at descending, which is recorded_at for samples
                let result = store.list::<MoodSample>(&[]).map_err(store_err).map(|mut samples| {
                    samples.truncate(limit);
                    samples
                });
                let _ = reply.send(result);
            }

            StateCommand::MoodsSince { since, reply } => {
                debug!(%since, "actor_loop: MoodsSince command");
                let filter = Filter {
                    field: "recorded_at".to_string(),
                    op: FilterOp::Gte,
                    value: since.timestamp_millis().into(),
                };
                let _ = reply.send(store.list::<MoodSample>(&[filter]).map_err(store_err));
            }

            StateCommand::InsertPlan { plan, reply } => {
                debug!(plan_id = %plan.id, "actor_loop: InsertPlan command");
                let _ = reply.send(store.upsert(plan).map_err(store_err));
            }

            StateCommand::UpdatePlan { plan, reply } => {
                debug!(plan_id = %plan.id, "actor_loop: UpdatePlan command");
                let id = plan.id.clone();
                let result = match store.get::<TaskPlan>(&id) {
                    Ok(Some(_)) => store.update(plan).map_err(store_err),
                    Ok(None) => Err(StateError::NotFound(format!("TaskPlan {}", id))),
                    Err(e) => Err(store_err(e)),
                };
                let _ = reply.send(result);
            }

            StateCommand::DeletePlan { id, reply } => {
                debug!(%id, "actor_loop: DeletePlan command");
                let result = store.delete::<TaskPlan>(&id).map_err(store_err).map(|existed| {
                    if !existed {
                        debug!(%id, "actor_loop: DeletePlan on absent plan");
                    }
                });
                let _ = reply.send(result);
            }

            StateCommand::GetPlan { id, reply } => {
                debug!(%id, "actor_loop: GetPlan command");
                let _ = reply.send(store.get::<TaskPlan>(&id).map_err(store_err));
            }

            StateCommand::ListPlans {
                include_completed,
                reply,
            } => {
                debug!(include_completed, "actor_loop: ListPlans command");
                let mut filters = Vec::new();
                if !include_completed {
                    filters.push(Filter::eq("completed", false));
                }
                let result = store.list::<TaskPlan>(&filters).map_err(store_err).map(|mut plans| {
                    plans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
                    plans
                });
                let _ = reply.send(result);
            }

            StateCommand::InsertGoal { goal, reply } => {
                debug!(goal_id = %goal.id, "actor_loop: InsertGoal command");
                let _ = reply.send(store.upsert(goal).map_err(store_err));
            }

            StateCommand::UpdateGoal { goal, reply } => {
                debug!(goal_id = %goal.id, "actor_loop: UpdateGoal command");
                let _ = reply.send(store.update(goal).map_err(store_err));
            }

            StateCommand::DeleteGoal { id, reply } => {
                debug!(%id, "actor_loop: DeleteGoal command");
                let result = store.delete::<Goal>(&id).map(|_| ()).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::ListGoals { active_only, reply } => {
                debug!(active_only, "actor_loop: ListGoals command");
                let mut filters = Vec::new();
                if active_only {
                    filters.push(Filter::eq("active", true));
                }
                let _ = reply.send(store.list::<Goal>(&filters).map_err(store_err));
            }

            StateCommand::RecordReward { reward, reply } => {
                debug!(reward_id = %reward.id, "actor_loop: RecordReward command");
                let _ = reply.send(store.upsert(reward).map_err(store_err));
            }

            StateCommand::ListRewards { plan_id, reply } => {
                debug!(%plan_id, "actor_loop: ListRewards command");
                let result = store
                    .list::<Reward>(&[Filter::eq("plan_id", plan_id)])
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::RecordActivity { event, reply } => {
                debug!(kind = %event.kind, "actor_loop: RecordActivity command");
                let _ = reply.send(store.upsert(event).map_err(store_err));
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}
