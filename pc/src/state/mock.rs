//! In-memory persistence for tests, with a switch that fails every write

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::messages::{StateError, StateResponse};
use super::persistence::Persistence;
use crate::domain::{ActivityEvent, Goal, MoodSample, Reward, TaskPlan};

#[derive(Default)]
struct Tables {
    moods: Vec<MoodSample>,
    plans: Vec<TaskPlan>,
    goals: Vec<Goal>,
    rewards: HashMap<String, Reward>,
    activity: Vec<ActivityEvent>,
}

#[derive(Default)]
pub struct MockPersistence {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    writes: Mutex<Vec<String>>,
}

impl MockPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (reads keep working)
    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    /// Names of the writes that succeeded, in order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn rewards(&self) -> Vec<Reward> {
        self.tables.lock().unwrap().rewards.values().cloned().collect()
    }

    pub fn activity(&self) -> Vec<ActivityEvent> {
        self.tables.lock().unwrap().activity.clone()
    }

    pub fn plans(&self) -> Vec<TaskPlan> {
        self.tables.lock().unwrap().plans.clone()
    }

    fn write(&self, name: &str, apply: impl FnOnce(&mut Tables) -> StateResponse<()>) -> StateResponse<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StateError::StoreError(format!("{} failed", name)));
        }
        apply(&mut self.tables.lock().unwrap())?;
        self.writes.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

#[async_trait]
impl Persistence for MockPersistence {
    async fn insert_mood(&self, sample: MoodSample) -> StateResponse<String> {
        let id = sample.id().to_string();
        self.write("insert_mood", |t| {
            t.moods.push(sample);
            Ok(())
        })?;
        Ok(id)
    }

    async fn delete_mood(&self, id: &str) -> StateResponse<()> {
        self.write("delete_mood", |t| {
            t.moods.retain(|m| m.id() != id);
            Ok(())
        })
    }

    async fn recent_moods(&self, limit: usize) -> StateResponse<Vec<MoodSample>> {
        let mut moods = self.tables.lock().unwrap().moods.clone();
        moods.sort_by_key(|m| std::cmp::Reverse(m.recorded_at()));
        moods.truncate(limit);
        Ok(moods)
    }

    async fn moods_since(&self, since: DateTime<Utc>) -> StateResponse<Vec<MoodSample>> {
        let mut moods: Vec<MoodSample> = self
            .tables
            .lock()
            .unwrap()
            .moods
            .iter()
            .filter(|m| m.recorded_at() >= since)
            .cloned()
            .collect();
        moods.sort_by_key(|m| std::cmp::Reverse(m.recorded_at()));
        Ok(moods)
    }

    async fn insert_plan(&self, plan: TaskPlan) -> StateResponse<String> {
        let id = plan.id.clone();
        self.write("insert_plan", |t| {
            t.plans.retain(|p| p.id != plan.id);
            t.plans.push(plan);
            Ok(())
        })?;
        Ok(id)
    }

    async fn update_plan(&self, plan: TaskPlan) -> StateResponse<()> {
        self.write("update_plan", |t| {
            let slot = t
                .plans
                .iter_mut()
                .find(|p| p.id == plan.id)
                .ok_or_else(|| StateError::NotFound(plan.id.clone()))?;
            *slot = plan;
            Ok(())
        })
    }

    async fn delete_plan(&self, id: &str) -> StateResponse<()> {
        self.write("delete_plan", |t| {
            t.plans.retain(|p| p.id != id);
            Ok(())
        })
    }

    async fn get_plan(&self, id: &str) -> StateResponse<Option<TaskPlan>> {
        Ok(self.tables.lock().unwrap().plans.iter().find(|p| p.id == id).cloned())
    }

    async fn list_plans(&self, include_completed: bool) -> StateResponse<Vec<TaskPlan>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .plans
            .iter()
            .filter(|p| include_completed || !p.is_complete())
            .cloned()
            .collect())
    }

    async fn insert_goal(&self, goal: Goal) -> StateResponse<String> {
        let id = goal.id.clone();
        self.write("insert_goal", |t| {
            t.goals.retain(|g| g.id != goal.id);
            t.goals.push(goal);
            Ok(())
        })?;
        Ok(id)
    }

    async fn update_goal(&self, goal: Goal) -> StateResponse<()> {
        self.write("update_goal", |t| {
            let slot = t
                .goals
                .iter_mut()
                .find(|g| g.id == goal.id)
                .ok_or_else(|| StateError::NotFound(goal.id.clone()))?;
            *slot = goal;
            Ok(())
        })
    }

    async fn delete_goal(&self, id: &str) -> StateResponse<()> {
        self.write("delete_goal", |t| {
            t.goals.retain(|g| g.id != id);
            Ok(())
        })
    }

    async fn list_goals(&self, active_only: bool) -> StateResponse<Vec<Goal>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .goals
            .iter()
            .filter(|g| !active_only || g.active)
            .cloned()
            .collect())
    }

    async fn record_reward(&self, reward: Reward) -> StateResponse<String> {
        let id = reward.id.clone();
        self.write("record_reward", |t| {
            t.rewards.insert(reward.id.clone(), reward);
            Ok(())
        })?;
        Ok(id)
    }

    async fn list_rewards(&self, plan_id: &str) -> StateResponse<Vec<Reward>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .rewards
            .values()
            .filter(|r| r.plan_id == plan_id)
            .cloned()
            .collect())
    }

    async fn record_activity(&self, event: ActivityEvent) -> StateResponse<String> {
        let id = event.id.clone();
        self.write("record_activity", |t| {
            t.activity.push(event);
            Ok(())
        })?;
        Ok(id)
    }
}
