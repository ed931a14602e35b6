//! FocusMonitor - the live plan board and its watchers
//!
//! The board is the shared mutable resource of a session. Steps only change
//! through `toggle_step`, `delete_step` and `resolve_burst(MarkDone)`, which
//! keeps every plan's derived completion in step with its step list.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::deletion::{DeletionTarget, PendingDeletion};
use super::effects::{BurstChoice, DriftChoice, FocusCommand, FocusOutcome, FocusSignal};
use crate::domain::{ActivityEvent, ActivityKind, Reward, TaskPlan};
use crate::error::ValidationError;
use crate::timer::{TimerKey, TimerOwner, TimerPolicy, TimerScheduler};

pub struct FocusMonitor {
    plans: Vec<TaskPlan>,
    timers: TimerPolicy,
    /// Bursts that were running when the idle timer fired
    drifted: Vec<String>,
    /// Drifted bursts waiting for a keep/discount answer
    drift_choice: Vec<String>,
    /// Bursts that expired and wait for a choice
    awaiting_choice: BTreeSet<String>,
    stagnation_fired: bool,
    pending: Option<PendingDeletion>,
}

impl FocusMonitor {
    pub fn new(timers: TimerPolicy) -> Self {
        Self {
            plans: Vec::new(),
            timers,
            drifted: Vec::new(),
            drift_choice: Vec::new(),
            awaiting_choice: BTreeSet::new(),
            stagnation_fired: false,
            pending: None,
        }
    }

    /// Visible plans; a plan pending deletion is not among them
    pub fn plans(&self) -> &[TaskPlan] {
        &self.plans
    }

    pub fn plan(&self, plan_id: &str) -> Option<&TaskPlan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    /// Plans not yet complete
    pub fn unresolved(&self) -> impl Iterator<Item = &TaskPlan> {
        self.plans.iter().filter(|p| !p.is_complete())
    }

    pub fn pending_deletion(&self) -> Option<&PendingDeletion> {
        self.pending.as_ref()
    }

    pub fn stagnation_fired(&self) -> bool {
        self.stagnation_fired
    }

    /// Replace the board with persisted truth, keeping a pending deletion hidden
    pub fn load(&mut self, mut plans: Vec<TaskPlan>, scheduler: &mut TimerScheduler) {
        debug!(count = plans.len(), "FocusMonitor::load: called");
        if let Some(pending) = &self.pending {
            pending.mask(&mut plans);
        }
        self.plans = plans;
        self.ensure_stagnation(scheduler);
    }

    /// Put freshly confirmed plans on the board
    pub fn add_plans(&mut self, plans: Vec<TaskPlan>, scheduler: &mut TimerScheduler) -> FocusOutcome {
        let mut outcome = FocusOutcome::default();
        for plan in plans {
            outcome.commands.push(FocusCommand::InsertPlan(plan.clone()));
            self.plans.push(plan);
        }
        self.ensure_stagnation(scheduler);
        outcome
    }

    /// Any input activity: restart the idle countdown, maybe ask about drift
    pub fn note_activity(&mut self, scheduler: &mut TimerScheduler) -> FocusOutcome {
        scheduler.arm(TimerKey::Idle, self.timers.idle());

        let drifted: Vec<String> = std::mem::take(&mut self.drifted)
            .into_iter()
            .filter(|id| scheduler.is_armed(&TimerKey::ShortBurst(id.clone())))
            .collect();
        if drifted.is_empty() {
            return FocusOutcome::default();
        }
        debug!(count = drifted.len(), "FocusMonitor::note_activity: back from drift");
        self.drift_choice = drifted.clone();
        FocusOutcome::default().signal(FocusSignal::DriftChoice { plan_ids: drifted })
    }

    pub fn resolve_drift(&mut self, choice: DriftChoice, scheduler: &mut TimerScheduler) -> Result<(), ValidationError> {
        if self.drift_choice.is_empty() {
            return Err(ValidationError::NothingPending);
        }
        let drifted = std::mem::take(&mut self.drift_choice);
        if choice == DriftChoice::DiscountDrift {
            for plan_id in drifted {
                info!(%plan_id, "Drift discounted, burst restarted");
                scheduler.arm(TimerKey::ShortBurst(plan_id), self.timers.burst());
            }
        }
        Ok(())
    }

    pub fn start_burst(&mut self, plan_id: &str, scheduler: &mut TimerScheduler) -> Result<FocusOutcome, ValidationError> {
        if self.plan(plan_id).is_none() {
            return Err(ValidationError::UnknownPlan(plan_id.to_string()));
        }
        info!(%plan_id, "Short burst started");
        self.awaiting_choice.remove(plan_id);
        scheduler.arm(TimerKey::ShortBurst(plan_id.to_string()), self.timers.burst());
        scheduler.arm(TimerKey::Idle, self.timers.idle());
        Ok(FocusOutcome::default().command(FocusCommand::RecordActivity(ActivityEvent::new(
            ActivityKind::BurstStarted,
            Some(plan_id.to_string()),
            None,
        ))))
    }

    /// Answer the choice raised when a burst ends
    pub fn resolve_burst(
        &mut self,
        plan_id: &str,
        choice: BurstChoice,
        scheduler: &mut TimerScheduler,
    ) -> Result<FocusOutcome, ValidationError> {
        if !self.awaiting_choice.remove(plan_id) {
            return Err(ValidationError::NoBurst);
        }
        debug!(%plan_id, ?choice, "FocusMonitor::resolve_burst: called");
        let mut outcome = FocusOutcome::default().command(FocusCommand::RecordActivity(ActivityEvent::new(
            ActivityKind::BurstFinished,
            Some(plan_id.to_string()),
            Some(format!("{:?}", choice).to_lowercase()),
        )));
        if choice != BurstChoice::MarkDone {
            return Ok(outcome);
        }

        // Marking the whole plan done commits a step deletion still pending on it
        if self.pending.as_ref().is_some_and(|p| p.plan_id() == plan_id) {
            outcome.merge(self.supersede(scheduler));
        }
        let plan = self
            .plans
            .iter_mut()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| ValidationError::UnknownPlan(plan_id.to_string()))?;
        let completion = plan.complete_all();
        outcome.commands.push(FocusCommand::UpdatePlan(plan.clone()));

        let mut rewards: Vec<Reward> = completion
            .newly_completed
            .iter()
            .map(|step_id| Reward::step(plan_id, step_id.clone()))
            .collect();
        if completion.plan_completed {
            rewards.push(Reward::plan(plan_id));
        }
        info!(%plan_id, rewards = rewards.len(), "Plan marked done");
        for reward in rewards {
            outcome.commands.push(FocusCommand::RecordReward(reward.clone()));
            outcome.signals.push(FocusSignal::RewardGranted(reward));
        }
        Ok(outcome)
    }

    /// Flip one step; rewards follow each incomplete -> complete transition
    pub fn toggle_step(
        &mut self,
        plan_id: &str,
        step_id: &str,
        scheduler: &mut TimerScheduler,
    ) -> Result<FocusOutcome, ValidationError> {
        let index = self
            .plans
            .iter()
            .position(|p| p.id == plan_id)
            .ok_or_else(|| ValidationError::UnknownPlan(plan_id.to_string()))?;
        let was_complete = self.persisted_view(&self.plans[index]).is_complete();
        let toggle = self.plans[index].toggle_step(step_id)?;
        debug!(%plan_id, %step_id, now_completed = toggle.now_completed, "FocusMonitor::toggle_step: toggled");

        // Completion is judged on the stored copy, which still has any pending step
        let written = self.persisted_view(&self.plans[index]);
        let plan_completed = !was_complete && written.is_complete();

        let mut outcome = FocusOutcome::default().command(FocusCommand::UpdatePlan(written));
        let mut rewards = Vec::new();
        if toggle.now_completed {
            rewards.push(Reward::step(plan_id, step_id));
        }
        if plan_completed {
            info!(%plan_id, "Plan completed");
            rewards.push(Reward::plan(plan_id));
        }
        for reward in rewards {
            outcome.commands.push(FocusCommand::RecordReward(reward.clone()));
            outcome.signals.push(FocusSignal::RewardGranted(reward));
        }

        if !self.stagnation_fired {
            scheduler.arm(TimerKey::Stagnation, self.timers.stagnation());
        }
        Ok(outcome)
    }

    pub fn delete_plan(&mut self, plan_id: &str, scheduler: &mut TimerScheduler) -> Result<FocusOutcome, ValidationError> {
        let index = self
            .plans
            .iter()
            .position(|p| p.id == plan_id)
            .ok_or_else(|| ValidationError::UnknownPlan(plan_id.to_string()))?;
        let mut outcome = self.supersede(scheduler);
        let plan = self.plans.remove(index);
        outcome.merge(self.begin_deletion(PendingDeletion::plan(index, plan), scheduler));
        Ok(outcome)
    }

    pub fn delete_step(
        &mut self,
        plan_id: &str,
        step_id: &str,
        scheduler: &mut TimerScheduler,
    ) -> Result<FocusOutcome, ValidationError> {
        let plan = self
            .plans
            .iter()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| ValidationError::UnknownPlan(plan_id.to_string()))?;
        if plan.step(step_id).is_none() {
            return Err(ValidationError::UnknownStep(step_id.to_string()));
        }

        let mut outcome = self.supersede(scheduler);
        let plan = self
            .plans
            .iter_mut()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| ValidationError::UnknownPlan(plan_id.to_string()))?;
        let (index, step) = plan.remove_step(step_id)?;
        outcome.merge(self.begin_deletion(PendingDeletion::step(plan_id, index, step), scheduler));
        Ok(outcome)
    }

    /// Cancel the pending deletion and restore its target; nothing is written
    pub fn undo_deletion(&mut self, scheduler: &mut TimerScheduler) -> Result<FocusOutcome, ValidationError> {
        let pending = self.pending.take().ok_or(ValidationError::NothingPending)?;
        scheduler.cancel(&TimerKey::DeletionCommit);
        info!(label = %pending.label, "Deletion undone");

        match pending.target {
            DeletionTarget::Plan { index, plan } => {
                let index = index.min(self.plans.len());
                self.plans.insert(index, plan);
            }
            DeletionTarget::Step { plan_id, index, step } => match self.plans.iter_mut().find(|p| p.id == plan_id) {
                Some(plan) => plan.restore_step(index, step),
                None => warn!(%plan_id, "Plan of undone step is gone"),
            },
        }
        Ok(FocusOutcome::default().signal(FocusSignal::DeletionUndone { label: pending.label }))
    }

    /// Quick capture: a stepless, low-priority plan, persisted directly
    pub fn quick_capture(&mut self, text: &str, scheduler: &mut TimerScheduler) -> Result<FocusOutcome, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        let plan = TaskPlan::quick_capture(text);
        let plan_id = plan.id.clone();
        info!(%plan_id, "Quick capture");
        self.plans.push(plan.clone());
        self.ensure_stagnation(scheduler);

        Ok(FocusOutcome::default()
            .command(FocusCommand::InsertPlan(plan))
            .command(FocusCommand::RecordActivity(ActivityEvent::new(
                ActivityKind::QuickCapture,
                Some(plan_id.clone()),
                None,
            )))
            .signal(FocusSignal::Captured { plan_id }))
    }

    /// A pipeline restart makes stagnation detection live again
    pub fn rearm_stagnation(&mut self, scheduler: &mut TimerScheduler) {
        self.stagnation_fired = false;
        scheduler.cancel(&TimerKey::Stagnation);
        self.ensure_stagnation(scheduler);
    }

    /// React to an expired focus or burst timer
    pub fn handle_timer(&mut self, key: &TimerKey, scheduler: &mut TimerScheduler) -> FocusOutcome {
        debug!(%key, "FocusMonitor::handle_timer: called");
        match key {
            TimerKey::Idle => {
                let running: Vec<String> = self
                    .plans
                    .iter()
                    .filter(|p| scheduler.is_armed(&TimerKey::ShortBurst(p.id.clone())))
                    .map(|p| p.id.clone())
                    .collect();
                if running.is_empty() {
                    return FocusOutcome::default();
                }
                self.drifted = running;
                FocusOutcome::default().signal(FocusSignal::IdleCue)
            }
            TimerKey::ShortBurst(plan_id) => {
                if self.plan(plan_id).is_none() {
                    return FocusOutcome::default();
                }
                self.drifted.retain(|id| id != plan_id);
                self.drift_choice.retain(|id| id != plan_id);
                self.awaiting_choice.insert(plan_id.clone());
                FocusOutcome::default().signal(FocusSignal::BurstChoice {
                    plan_id: plan_id.clone(),
                })
            }
            TimerKey::Stagnation => {
                if self.stagnation_fired || self.plans.is_empty() {
                    return FocusOutcome::default();
                }
                self.stagnation_fired = true;
                info!("Stagnation detected");
                FocusOutcome::default()
                    .signal(FocusSignal::StagnationPrompt)
                    .command(FocusCommand::RecordActivity(ActivityEvent::new(
                        ActivityKind::Stagnation,
                        None,
                        None,
                    )))
            }
            TimerKey::DeletionCommit => self.commit_deletion(scheduler),
            _ => FocusOutcome::default(),
        }
    }

    fn ensure_stagnation(&self, scheduler: &mut TimerScheduler) {
        if !self.stagnation_fired && !self.plans.is_empty() && !scheduler.is_armed(&TimerKey::Stagnation) {
            scheduler.arm(TimerKey::Stagnation, self.timers.stagnation());
        }
    }

    /// A board plan as storage holds it: a pending step deletion is not written yet
    fn persisted_view(&self, plan: &TaskPlan) -> TaskPlan {
        let mut view = plan.clone();
        if let Some(pending) = &self.pending {
            pending.unmask(&mut view);
        }
        view
    }

    fn begin_deletion(&mut self, pending: PendingDeletion, scheduler: &mut TimerScheduler) -> FocusOutcome {
        info!(label = %pending.label, plan_id = %pending.plan_id(), "Deletion pending");
        let label = pending.label.clone();
        self.pending = Some(pending);
        scheduler.arm(TimerKey::DeletionCommit, self.timers.undo());
        FocusOutcome::default().signal(FocusSignal::DeletionPending { label })
    }

    /// Commit whatever is pending right away so a new deletion can start
    fn supersede(&mut self, scheduler: &mut TimerScheduler) -> FocusOutcome {
        if self.pending.is_none() {
            return FocusOutcome::default();
        }
        debug!("FocusMonitor::supersede: committing previous deletion");
        scheduler.cancel(&TimerKey::DeletionCommit);
        self.commit_deletion(scheduler)
    }

    fn commit_deletion(&mut self, scheduler: &mut TimerScheduler) -> FocusOutcome {
        let Some(pending) = self.pending.take() else {
            return FocusOutcome::default();
        };
        info!(label = %pending.label, "Deletion committed");

        let mut reward = None;
        let command = match &pending.target {
            DeletionTarget::Plan { plan, .. } => {
                scheduler.cancel_owned_by(&TimerOwner::Plan(plan.id.clone()));
                self.awaiting_choice.remove(&plan.id);
                Some(FocusCommand::DeletePlan(plan.id.clone()))
            }
            DeletionTarget::Step { plan_id, .. } => self.plan(plan_id).map(|plan| {
                let mut before = plan.clone();
                pending.unmask(&mut before);
                if plan.is_complete() && !before.is_complete() {
                    info!(%plan_id, "Plan completed by removing its last open step");
                    reward = Some(Reward::plan(plan_id.clone()));
                }
                FocusCommand::UpdatePlan(plan.clone())
            }),
        };

        let mut outcome = FocusOutcome::default().signal(FocusSignal::DeletionCommitted { label: pending.label });
        if let Some(command) = command {
            outcome.commands.push(command);
        }
        if let Some(reward) = reward {
            outcome.commands.push(FocusCommand::RecordReward(reward.clone()));
            outcome.signals.push(FocusSignal::RewardGranted(reward));
        }
        outcome
    }
}
