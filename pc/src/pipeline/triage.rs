//! Triage list operations and the confirmation guards

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::capacity::{CapacityPolicy, CapacityReport, check_capacity, is_too_big};
use super::error::{ConfirmBlock, PipelineError};
use super::stage::PipelineFlags;
use crate::advice::{CandidateTask, Degradation};
use crate::domain::{EnergyLevel, generate_id};
use crate::error::ValidationError;

/// A candidate task under triage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageItem {
    pub id: String,
    pub text: String,
    /// Marked "break it down further" at the low-energy guard
    #[serde(default)]
    pub split_further: bool,
}

impl From<CandidateTask> for TriageItem {
    fn from(task: CandidateTask) -> Self {
        Self {
            id: task.id,
            text: task.text,
            split_further: false,
        }
    }
}

/// Answer to the low-energy guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooBigChoice {
    BreakDownFurther,
    ProceedAnyway,
}

/// The triage stage payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageList {
    pub tasks: Vec<TriageItem>,
    /// Items moved out by "defer last item"
    pub deferred: Vec<TriageItem>,
    pub degradation: Option<Degradation>,
}

impl TriageList {
    pub fn new(candidates: Vec<CandidateTask>, degradation: Option<Degradation>) -> Self {
        Self {
            tasks: candidates.into_iter().map(TriageItem::from).collect(),
            deferred: Vec::new(),
            degradation,
        }
    }

    pub fn add(&mut self, text: &str) -> Result<String, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        let id = generate_id("task", text);
        debug!(%id, "TriageList::add: called");
        self.tasks.push(TriageItem {
            id: id.clone(),
            text: text.to_string(),
            split_further: false,
        });
        Ok(id)
    }

    pub fn edit(&mut self, task_id: &str, text: &str) -> Result<(), ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        let item = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| ValidationError::UnknownTask(task_id.to_string()))?;
        item.text = text.to_string();
        Ok(())
    }

    pub fn remove(&mut self, task_id: &str) -> Result<TriageItem, ValidationError> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| ValidationError::UnknownTask(task_id.to_string()))?;
        Ok(self.tasks.remove(index))
    }

    /// Move the last task to the deferred list
    pub fn defer_last(&mut self) -> Result<TriageItem, ValidationError> {
        let item = self.tasks.pop().ok_or(ValidationError::NoTasks)?;
        debug!(task_id = %item.id, "TriageList::defer_last: called");
        self.deferred.push(item.clone());
        Ok(item)
    }

    pub fn capacity(&self, now: NaiveTime, policy: &CapacityPolicy) -> CapacityReport {
        check_capacity(self.tasks.iter().map(|t| t.text.as_str()), now, policy)
    }

    /// Run the confirmation guards in order
    ///
    /// `BreakDownFurther` marks every flagged task so its breakdown is
    /// requested at low energy.
    pub fn check_confirm(
        &mut self,
        flags: &PipelineFlags,
        policy: &CapacityPolicy,
        choice: Option<TooBigChoice>,
    ) -> Result<(), PipelineError> {
        if self.tasks.is_empty() {
            return Err(ValidationError::NoTasks.into());
        }

        if flags.sprint && self.tasks.len() > policy.sprint_limit {
            return Err(PipelineError::Blocked(ConfirmBlock::SprintTooMany {
                limit: policy.sprint_limit,
                count: self.tasks.len(),
            }));
        }

        if flags.energy == EnergyLevel::Low {
            let too_big: Vec<String> = self
                .tasks
                .iter()
                .filter(|t| is_too_big(&t.text))
                .map(|t| t.id.clone())
                .collect();
            if !too_big.is_empty() {
                match choice {
                    None => {
                        return Err(PipelineError::Blocked(ConfirmBlock::TooBig { task_ids: too_big }));
                    }
                    Some(TooBigChoice::BreakDownFurther) => {
                        for task in self.tasks.iter_mut().filter(|t| too_big.contains(&t.id)) {
                            task.split_further = true;
                        }
                    }
                    Some(TooBigChoice::ProceedAnyway) => {}
                }
            }
        }
        Ok(())
    }
}
