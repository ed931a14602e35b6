//! Deferred-commit deletion

use crate::domain::{MicroStep, TaskPlan};

/// What was removed from the board and how to put it back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionTarget {
    Plan { index: usize, plan: TaskPlan },
    Step { plan_id: String, index: usize, step: MicroStep },
}

/// A deletion waiting out its undo window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub target: DeletionTarget,
    pub label: String,
}

impl PendingDeletion {
    pub fn plan(index: usize, plan: TaskPlan) -> Self {
        Self {
            label: plan.task_name.clone(),
            target: DeletionTarget::Plan { index, plan },
        }
    }

    pub fn step(plan_id: impl Into<String>, index: usize, step: MicroStep) -> Self {
        Self {
            label: step.text.clone(),
            target: DeletionTarget::Step {
                plan_id: plan_id.into(),
                index,
                step,
            },
        }
    }

    /// Plan this deletion belongs to
    pub fn plan_id(&self) -> &str {
        match &self.target {
            DeletionTarget::Plan { plan, .. } => &plan.id,
            DeletionTarget::Step { plan_id, .. } => plan_id,
        }
    }

    /// Put a pending step back into its plan, giving the copy storage still holds
    pub fn unmask(&self, plan: &mut TaskPlan) {
        if let DeletionTarget::Step { plan_id, index, step } = &self.target
            && *plan_id == plan.id
        {
            plan.restore_step(*index, step.clone());
        }
    }

    /// Hide the pending target from a freshly read plan list
    pub fn mask(&self, plans: &mut Vec<TaskPlan>) {
        match &self.target {
            DeletionTarget::Plan { plan, .. } => plans.retain(|p| p.id != plan.id),
            DeletionTarget::Step { plan_id, step, .. } => {
                if let Some(plan) = plans.iter_mut().find(|p| &p.id == plan_id) {
                    let _ = plan.remove_step(&step.id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DueDate, EnergyLevel};

    fn plan(name: &str) -> TaskPlan {
        TaskPlan::new(
            name,
            vec![MicroStep::with_id("s1", "open laptop", "now", 2)],
            DueDate::Today,
            EnergyLevel::Medium,
        )
    }

    #[test]
    fn test_mask_hides_pending_plan() {
        let doomed = plan("doomed");
        let kept = plan("kept");
        let pending = PendingDeletion::plan(0, doomed.clone());
        let mut plans = vec![doomed, kept.clone()];
        pending.mask(&mut plans);
        assert_eq!(plans, vec![kept]);
        assert_eq!(pending.label, "doomed");
    }

    #[test]
    fn test_mask_hides_pending_step() {
        let p = plan("write");
        let pending = PendingDeletion::step(p.id.clone(), 0, p.steps()[0].clone());
        let mut plans = vec![p];
        pending.mask(&mut plans);
        assert!(plans[0].steps().is_empty());
        assert_eq!(pending.label, "open laptop");
    }

    #[test]
    fn test_unmask_restores_only_the_owning_plan() {
        let mut p = plan("write");
        let mut other = plan("read");
        let (index, step) = p.remove_step("s1").unwrap();
        let pending = PendingDeletion::step(p.id.clone(), index, step);

        pending.unmask(&mut other);
        assert_eq!(other.steps().len(), 1);

        pending.unmask(&mut p);
        assert_eq!(p.steps()[0].id, "s1");
    }
}
