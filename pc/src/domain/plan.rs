//! Task plans and micro-steps
//!
//! A TaskPlan owns an ordered list of MicroSteps. The step list is private:
//! it only changes through `toggle_step`, `remove_step`, `restore_step` and
//! `complete_all`, so the derived completion fields always agree with it.

use std::collections::HashMap;

use pacestore::{IndexValue, Record, now_ms};
use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::mood::EnergyLevel;
use super::priority::Priority;
use crate::error::ValidationError;

/// When a plan is due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DueDate {
    Today,
    Tomorrow,
    #[default]
    ThisWeek,
    NoRush,
}

impl std::fmt::Display for DueDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Today => write!(f, "today"),
            Self::Tomorrow => write!(f, "tomorrow"),
            Self::ThisWeek => write!(f, "this_week"),
            Self::NoRush => write!(f, "no_rush"),
        }
    }
}

impl std::str::FromStr for DueDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "today" => Ok(Self::Today),
            "tomorrow" => Ok(Self::Tomorrow),
            "this_week" | "week" => Ok(Self::ThisWeek),
            "no_rush" | "someday" => Ok(Self::NoRush),
            _ => Err(format!("Unknown due date: {}", s)),
        }
    }
}

/// One small actionable unit of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroStep {
    pub id: String,
    pub text: String,
    pub due_by: String,
    pub time_estimate_mins: u32,
    completed: bool,
}

impl MicroStep {
    pub fn new(text: impl Into<String>, due_by: impl Into<String>, time_estimate_mins: u32) -> Self {
        let text = text.into();
        Self {
            id: generate_id("step", &text),
            text,
            due_by: due_by.into(),
            time_estimate_mins,
            completed: false,
        }
    }

    /// Create a step with a known ID (advice results, tests)
    pub fn with_id(
        id: impl Into<String>,
        text: impl Into<String>,
        due_by: impl Into<String>,
        time_estimate_mins: u32,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            due_by: due_by.into(),
            time_estimate_mins,
            completed: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

/// Result of toggling one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepToggle {
    pub step_id: String,
    /// Step state after the toggle
    pub now_completed: bool,
    /// The toggle moved the plan from incomplete to 100%
    pub plan_completed: bool,
}

/// Result of bulk-completing a plan
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkCompletion {
    /// Steps that went from incomplete to complete
    pub newly_completed: Vec<String>,
    /// The plan itself went from incomplete to complete
    pub plan_completed: bool,
}

/// A persisted task with its micro-step breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub id: String,
    pub task_name: String,
    steps: Vec<MicroStep>,
    pub due: DueDate,
    pub energy_required: EnergyLevel,
    pub priority: Priority,
    pub related_goal_id: Option<String>,
    pub related_step_id: Option<String>,
    completed: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TaskPlan {
    pub fn new(task_name: impl Into<String>, steps: Vec<MicroStep>, due: DueDate, energy_required: EnergyLevel) -> Self {
        let task_name = task_name.into();
        let now = now_ms();
        let mut plan = Self {
            id: generate_id("plan", &task_name),
            task_name,
            steps,
            due,
            energy_required,
            priority: Priority::Normal,
            related_goal_id: None,
            related_step_id: None,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        plan.refresh();
        plan
    }

    /// A low-energy, deprioritized plan with no steps
    pub fn quick_capture(text: impl Into<String>) -> Self {
        let mut plan = Self::new(text, Vec::new(), DueDate::NoRush, EnergyLevel::Low);
        plan.priority = Priority::Low;
        plan
    }

    pub fn steps(&self) -> &[MicroStep] {
        &self.steps
    }

    pub fn step(&self, step_id: &str) -> Option<&MicroStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }

    /// Completion percentage, 0-100
    pub fn percent_complete(&self) -> u8 {
        if self.steps.is_empty() {
            return if self.completed { 100 } else { 0 };
        }
        ((self.completed_count() * 100) / self.steps.len()) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Flip one step and report whether the plan just reached 100%
    pub fn toggle_step(&mut self, step_id: &str) -> Result<StepToggle, ValidationError> {
        let was_complete = self.completed;
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| ValidationError::UnknownStep(step_id.to_string()))?;
        step.completed = !step.completed;
        let now_completed = step.completed;

        self.refresh();
        Ok(StepToggle {
            step_id: step_id.to_string(),
            now_completed,
            plan_completed: !was_complete && self.completed,
        })
    }

    /// Remove a step, returning its former index and value for a later restore
    ///
    /// Removing the last open step completes the plan. The focus monitor
    /// grants the plan reward for that when the deletion commits.
    pub fn remove_step(&mut self, step_id: &str) -> Result<(usize, MicroStep), ValidationError> {
        let index = self
            .steps
            .iter()
            .position(|s| s.id == step_id)
            .ok_or_else(|| ValidationError::UnknownStep(step_id.to_string()))?;
        let step = self.steps.remove(index);
        self.refresh();
        Ok((index, step))
    }

    /// Put a removed step back at (or near) its former position
    pub fn restore_step(&mut self, index: usize, step: MicroStep) {
        let index = index.min(self.steps.len());
        self.steps.insert(index, step);
        self.refresh();
    }

    /// Mark every remaining step and the plan itself complete
    pub fn complete_all(&mut self) -> BulkCompletion {
        let was_complete = self.completed;
        let mut newly_completed = Vec::new();
        for step in self.steps.iter_mut().filter(|s| !s.completed) {
            step.completed = true;
            newly_completed.push(step.id.clone());
        }
        self.completed = true;
        self.updated_at = now_ms();
        BulkCompletion {
            newly_completed,
            plan_completed: !was_complete,
        }
    }

    fn refresh(&mut self) {
        // A plan without steps keeps whatever completion it was given explicitly
        if !self.steps.is_empty() {
            self.completed = self.steps.iter().all(|s| s.completed);
        }
        self.updated_at = now_ms();
    }
}

impl Record for TaskPlan {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "task_plans"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("completed".to_string(), IndexValue::Bool(self.completed));
        fields.insert("due".to_string(), IndexValue::String(self.due.to_string()));
        fields.insert("priority".to_string(), IndexValue::Int(self.priority.rank()));
        if let Some(goal_id) = &self.related_goal_id {
            fields.insert("related_goal_id".to_string(), IndexValue::String(goal_id.clone()));
        }
        fields
    }
}
