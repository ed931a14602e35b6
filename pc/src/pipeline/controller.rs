//! PipelineController - drives brain_dump -> triage -> context -> breakdown -> dashboard
//!
//! The controller owns the current stage payload and mirrors it into the
//! draft store: a full snapshot is written before every advice call and on
//! every stage transition. Within-stage edits only mark the draft dirty; the
//! session flushes it on the debounce timer.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use tracing::{debug, info, warn};

use super::capacity::{CapacityPolicy, CapacityReport};
use super::draft::{Breakdown, ContextTask, DraftPayload, DraftStore, SessionDraft};
use super::error::PipelineError;
use super::routing::EntryRoute;
use super::stage::{PipelineFlags, Stage};
use super::triage::{TooBigChoice, TriageItem, TriageList};
use crate::advice::{AdviceService, BreakdownRequest, Degradation, breakdown_with_fallback, parse_with_fallback};
use crate::domain::{DueDate, EnergyLevel, MicroStep, TaskPlan, generate_id};
use crate::error::ValidationError;

/// Shortest brain dump accepted
pub const MIN_DUMP_CHARS: usize = 3;

/// Text of the single task used for a gentle start
pub const GENTLE_TASK: &str = "one small gentle step";

/// Result of a stage transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub stage: Stage,
    /// Fallbacks taken while producing this stage
    pub degradations: Vec<Degradation>,
    /// Load against the rest of the day, filled in on entering triage
    pub capacity: Option<CapacityReport>,
}

/// Context choices for one task
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextUpdate {
    pub due: DueDate,
    pub energy: EnergyLevel,
    pub related_goal_id: Option<String>,
    pub related_step_id: Option<String>,
}

pub struct PipelineController {
    payload: DraftPayload,
    flags: PipelineFlags,
    drafts: Arc<dyn DraftStore>,
    advice: Arc<dyn AdviceService>,
    advice_timeout: Duration,
    capacity: CapacityPolicy,
    dirty: bool,
}

impl PipelineController {
    pub fn new(
        drafts: Arc<dyn DraftStore>,
        advice: Arc<dyn AdviceService>,
        advice_timeout: Duration,
        capacity: CapacityPolicy,
    ) -> Self {
        Self {
            payload: DraftPayload::empty_dump(),
            flags: PipelineFlags::default(),
            drafts,
            advice,
            advice_timeout,
            capacity,
            dirty: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.payload.stage()
    }

    pub fn payload(&self) -> &DraftPayload {
        &self.payload
    }

    pub fn flags(&self) -> PipelineFlags {
        self.flags
    }

    pub fn capacity_policy(&self) -> &CapacityPolicy {
        &self.capacity
    }

    /// Unsaved within-stage edits exist
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Every degradation visible at the current stage
    pub fn degradations(&self) -> Vec<Degradation> {
        match &self.payload {
            DraftPayload::Triage(list) => list.degradation.iter().cloned().collect(),
            DraftPayload::Context { degradation, .. } => degradation.iter().cloned().collect(),
            DraftPayload::Breakdown { breakdowns, degradation } => degradation
                .iter()
                .cloned()
                .chain(breakdowns.iter().filter_map(|b| b.degradation.clone()))
                .collect(),
            DraftPayload::BrainDump { .. } | DraftPayload::Dashboard => Vec::new(),
        }
    }

    /// The saved draft, or None when absent or unreadable
    ///
    /// An unreadable or inconsistent draft is discarded so the flow starts fresh.
    pub fn load_draft(&self) -> Option<SessionDraft> {
        match self.drafts.load() {
            Ok(draft) => draft,
            Err(e) => {
                warn!(error = %e, "Discarding invalid draft, starting fresh");
                self.clear_draft();
                None
            }
        }
    }

    /// Start the pipeline at the routed entry point
    pub async fn enter(&mut self, route: EntryRoute, flags: PipelineFlags) -> Advance {
        debug!(?route, "PipelineController::enter: called");
        self.flags = flags;
        self.dirty = false;
        match route {
            EntryRoute::Resume(draft) => {
                info!(stage = %draft.stage, "Resuming pipeline draft");
                self.flags = draft.flags;
                self.payload = draft.payload;
                return self.advance_report(self.degradations());
            }
            EntryRoute::Handoff(task) => {
                self.transition(DraftPayload::Context {
                    tasks: vec![self.context_task(generate_id("task", &task), task, false)],
                    degradation: None,
                });
            }
            EntryRoute::SeedGoal(goal) => {
                let mut task = self.context_task(generate_id("task", &goal.title), goal.title.clone(), false);
                task.related_goal_id = Some(goal.id.clone());
                self.transition(DraftPayload::Context {
                    tasks: vec![task],
                    degradation: None,
                });
            }
            EntryRoute::Gentle => {
                let task = ContextTask {
                    id: generate_id("task", GENTLE_TASK),
                    text: GENTLE_TASK.to_string(),
                    due: DueDate::NoRush,
                    energy: EnergyLevel::Low,
                    related_goal_id: None,
                    related_step_id: None,
                    split_further: false,
                };
                self.transition(DraftPayload::Context {
                    tasks: vec![task.clone()],
                    degradation: None,
                });
                return self.run_breakdowns(vec![task], None).await;
            }
            EntryRoute::Dashboard => {
                self.payload = DraftPayload::Dashboard;
            }
            EntryRoute::BrainDump => {
                self.payload = DraftPayload::empty_dump();
            }
        }
        self.advance_report(Vec::new())
    }

    /// Within-stage edit of the brain dump text
    pub fn set_dump_text(&mut self, text: &str) -> Result<(), PipelineError> {
        match &mut self.payload {
            DraftPayload::BrainDump { raw_text } => {
                *raw_text = text.to_string();
                self.dirty = true;
                Ok(())
            }
            _ => Err(self.wrong_stage("set_dump_text").into()),
        }
    }

    /// brain_dump -> triage
    pub async fn submit_dump(&mut self, text: &str) -> Result<Advance, PipelineError> {
        if self.stage() != Stage::BrainDump {
            return Err(self.wrong_stage("submit_dump").into());
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        if trimmed.chars().count() < MIN_DUMP_CHARS {
            return Err(ValidationError::TooShort { min: MIN_DUMP_CHARS }.into());
        }

        self.payload = DraftPayload::BrainDump {
            raw_text: text.to_string(),
        };
        self.save_now();

        let advised = parse_with_fallback(self.advice.as_ref(), trimmed, self.advice_timeout).await;
        let degradations: Vec<Degradation> = advised.degradation.iter().cloned().collect();
        self.transition(DraftPayload::Triage(TriageList::new(advised.value, advised.degradation)));
        info!(tasks = self.triage()?.tasks.len(), degraded = !degradations.is_empty(), "Brain dump triaged");
        Ok(self.advance_report(degradations))
    }

    pub fn triage(&self) -> Result<&TriageList, ValidationError> {
        match &self.payload {
            DraftPayload::Triage(list) => Ok(list),
            _ => Err(self.wrong_stage("triage")),
        }
    }

    fn triage_mut(&mut self, operation: &'static str) -> Result<&mut TriageList, ValidationError> {
        let stage = self.stage();
        match &mut self.payload {
            DraftPayload::Triage(list) => {
                self.dirty = true;
                Ok(list)
            }
            _ => Err(ValidationError::WrongStage {
                operation,
                stage: stage.to_string(),
            }),
        }
    }

    pub fn add_task(&mut self, text: &str) -> Result<String, PipelineError> {
        Ok(self.triage_mut("add_task")?.add(text)?)
    }

    pub fn edit_task(&mut self, task_id: &str, text: &str) -> Result<(), PipelineError> {
        Ok(self.triage_mut("edit_task")?.edit(task_id, text)?)
    }

    pub fn remove_task(&mut self, task_id: &str) -> Result<TriageItem, PipelineError> {
        Ok(self.triage_mut("remove_task")?.remove(task_id)?)
    }

    /// The "defer last item" affordance
    pub fn defer_last(&mut self) -> Result<TriageItem, PipelineError> {
        Ok(self.triage_mut("defer_last")?.defer_last()?)
    }

    pub fn capacity(&self, now: NaiveTime) -> Result<CapacityReport, PipelineError> {
        Ok(self.triage()?.capacity(now, &self.capacity))
    }

    /// triage -> context
    pub fn confirm_triage(&mut self, choice: Option<TooBigChoice>) -> Result<Advance, PipelineError> {
        let flags = self.flags;
        let capacity = self.capacity.clone();
        let stage = self.stage();
        // A blocked confirm leaves the list as it was, so it is not an edit
        let DraftPayload::Triage(list) = &mut self.payload else {
            return Err(ValidationError::WrongStage {
                operation: "confirm_triage",
                stage: stage.to_string(),
            }
            .into());
        };
        list.check_confirm(&flags, &capacity, choice)?;

        let items = list.tasks.clone();
        let degradation = list.degradation.clone();
        let tasks = items
            .into_iter()
            .map(|item| self.context_task(item.id, item.text, item.split_further))
            .collect();
        self.transition(DraftPayload::Context { tasks, degradation });
        Ok(self.advance_report(Vec::new()))
    }

    /// Within-stage edit of one task's context
    pub fn set_context(&mut self, task_id: &str, update: ContextUpdate) -> Result<(), PipelineError> {
        let stage = self.stage();
        let DraftPayload::Context { tasks, .. } = &mut self.payload else {
            return Err(ValidationError::WrongStage {
                operation: "set_context",
                stage: stage.to_string(),
            }
            .into());
        };
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| ValidationError::UnknownTask(task_id.to_string()))?;
        task.due = update.due;
        task.energy = update.energy;
        task.related_goal_id = update.related_goal_id;
        task.related_step_id = update.related_step_id;
        self.dirty = true;
        Ok(())
    }

    /// context -> breakdown; one advice call per task
    pub async fn advance_context(&mut self) -> Result<Advance, PipelineError> {
        let DraftPayload::Context { tasks, degradation } = &self.payload else {
            return Err(self.wrong_stage("advance_context").into());
        };
        if tasks.is_empty() {
            return Err(ValidationError::NoTasks.into());
        }
        let tasks = tasks.clone();
        let upstream = degradation.clone();
        self.save_now();
        Ok(self.run_breakdowns(tasks, upstream).await)
    }

    /// `upstream` is the parse degradation carried from triage
    async fn run_breakdowns(&mut self, tasks: Vec<ContextTask>, upstream: Option<Degradation>) -> Advance {
        let mut breakdowns = Vec::with_capacity(tasks.len());
        let mut degradations = Vec::new();
        for task in tasks {
            let request = BreakdownRequest {
                task_name: task.text.clone(),
                due: task.due,
                energy: if task.split_further {
                    EnergyLevel::Low
                } else {
                    task.energy
                },
            };
            let advised = breakdown_with_fallback(self.advice.as_ref(), &request, self.advice_timeout).await;
            degradations.extend(advised.degradation.clone());
            breakdowns.push(Breakdown {
                task,
                steps: advised.value,
                degradation: advised.degradation,
            });
        }
        info!(count = breakdowns.len(), degraded = degradations.len(), "Tasks broken down");
        self.transition(DraftPayload::Breakdown {
            breakdowns,
            degradation: upstream,
        });
        self.advance_report(degradations)
    }

    fn breakdown_mut(&mut self, task_id: &str, operation: &'static str) -> Result<&mut Breakdown, ValidationError> {
        let stage = self.stage();
        let DraftPayload::Breakdown { breakdowns, .. } = &mut self.payload else {
            return Err(ValidationError::WrongStage {
                operation,
                stage: stage.to_string(),
            });
        };
        let breakdown = breakdowns
            .iter_mut()
            .find(|b| b.task.id == task_id)
            .ok_or_else(|| ValidationError::UnknownTask(task_id.to_string()))?;
        self.dirty = true;
        Ok(breakdown)
    }

    pub fn edit_step(&mut self, task_id: &str, step_id: &str, text: &str) -> Result<(), PipelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        let breakdown = self.breakdown_mut(task_id, "edit_step")?;
        let step = breakdown
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| ValidationError::UnknownStep(step_id.to_string()))?;
        step.text = text.to_string();
        Ok(())
    }

    pub fn remove_step(&mut self, task_id: &str, step_id: &str) -> Result<MicroStep, PipelineError> {
        let breakdown = self.breakdown_mut(task_id, "remove_step")?;
        let index = breakdown
            .steps
            .iter()
            .position(|s| s.id == step_id)
            .ok_or_else(|| ValidationError::UnknownStep(step_id.to_string()))?;
        Ok(breakdown.steps.remove(index))
    }

    pub fn add_step(&mut self, task_id: &str, text: &str, time_estimate_mins: u32) -> Result<String, PipelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        let breakdown = self.breakdown_mut(task_id, "add_step")?;
        let step = MicroStep::new(text, breakdown.task.due.to_string(), time_estimate_mins.max(1));
        let id = step.id.clone();
        breakdown.steps.push(step);
        Ok(id)
    }

    /// breakdown -> dashboard; returns the plans to persist
    pub fn confirm_breakdown(&mut self) -> Result<Vec<TaskPlan>, PipelineError> {
        let DraftPayload::Breakdown { breakdowns, .. } = &self.payload else {
            return Err(self.wrong_stage("confirm_breakdown").into());
        };
        if breakdowns.is_empty() {
            return Err(ValidationError::NoTasks.into());
        }

        let plans: Vec<TaskPlan> = breakdowns
            .iter()
            .map(|b| {
                let mut plan = TaskPlan::new(b.task.text.clone(), b.steps.clone(), b.task.due, b.task.energy);
                plan.related_goal_id = b.task.related_goal_id.clone();
                plan.related_step_id = b.task.related_step_id.clone();
                plan
            })
            .collect();

        info!(count = plans.len(), "Pipeline complete");
        self.finish(DraftPayload::Dashboard);
        Ok(plans)
    }

    /// Drop everything and start again at brain_dump
    pub fn restart(&mut self) {
        info!(from = %self.stage(), "Pipeline restarted");
        self.finish(DraftPayload::empty_dump());
    }

    pub fn skip_to_dashboard(&mut self) {
        info!(from = %self.stage(), "Skipping to dashboard");
        self.finish(DraftPayload::Dashboard);
    }

    /// Flush pending within-stage edits
    pub fn save_draft(&mut self) {
        if self.dirty && self.stage() != Stage::Dashboard {
            self.save_now();
        }
    }

    fn transition(&mut self, payload: DraftPayload) {
        debug!(from = %self.stage(), to = %payload.stage(), "PipelineController::transition: called");
        self.payload = payload;
        self.save_now();
    }

    fn finish(&mut self, payload: DraftPayload) {
        self.payload = payload;
        self.dirty = false;
        self.clear_draft();
    }

    fn save_now(&mut self) {
        let draft = SessionDraft::new(self.payload.clone(), self.flags);
        if let Err(e) = self.drafts.save(&draft) {
            warn!(stage = %draft.stage, error = %e, "Failed to save pipeline draft");
        }
        self.dirty = false;
    }

    fn clear_draft(&self) {
        if let Err(e) = self.drafts.clear() {
            warn!(error = %e, "Failed to clear pipeline draft");
        }
    }

    fn context_task(&self, id: String, text: String, split_further: bool) -> ContextTask {
        ContextTask {
            id,
            text,
            due: DueDate::default(),
            energy: if split_further {
                EnergyLevel::Low
            } else {
                self.flags.energy
            },
            related_goal_id: None,
            related_step_id: None,
            split_further,
        }
    }

    fn advance_report(&self, degradations: Vec<Degradation>) -> Advance {
        Advance {
            stage: self.stage(),
            degradations,
            capacity: None,
        }
    }

    fn wrong_stage(&self, operation: &'static str) -> ValidationError {
        ValidationError::WrongStage {
            operation,
            stage: self.stage().to_string(),
        }
    }
}
