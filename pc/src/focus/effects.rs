//! What the focus monitor asks of the session
//!
//! Every monitor operation applies its change to the local board at once and
//! hands back the writes still owed to persistence, plus the signals the
//! surface should show. The session commits the writes afterwards.

use crate::domain::{ActivityEvent, Reward, TaskPlan};

/// A write owed to persistence after an optimistic local change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusCommand {
    InsertPlan(TaskPlan),
    UpdatePlan(TaskPlan),
    DeletePlan(String),
    RecordReward(Reward),
    RecordActivity(ActivityEvent),
}

impl FocusCommand {
    /// Plan whose persisted copy this write touches
    pub fn plan_id(&self) -> Option<&str> {
        match self {
            Self::InsertPlan(plan) | Self::UpdatePlan(plan) => Some(&plan.id),
            Self::DeletePlan(id) => Some(id),
            Self::RecordReward(reward) => Some(&reward.plan_id),
            Self::RecordActivity(event) => event.plan_id.as_deref(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::InsertPlan(_) => "insert_plan",
            Self::UpdatePlan(_) => "update_plan",
            Self::DeletePlan(_) => "delete_plan",
            Self::RecordReward(_) => "record_reward",
            Self::RecordActivity(_) => "record_activity",
        }
    }
}

/// Something the surface should present
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusSignal {
    /// Soft, non-blocking cue: idle while a burst runs
    IdleCue,
    /// Back from idle during a burst: keep rolling or discount the drift
    DriftChoice { plan_ids: Vec<String> },
    /// A burst ended: continue, take a break or mark done
    BurstChoice { plan_id: String },
    /// No step toggled for a while: offer help or a break
    StagnationPrompt,
    RewardGranted(Reward),
    DeletionPending { label: String },
    DeletionCommitted { label: String },
    DeletionUndone { label: String },
    Captured { plan_id: String },
}

/// Answer to a drift choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftChoice {
    KeepRolling,
    DiscountDrift,
}

/// Answer to a burst choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstChoice {
    Continue,
    TakeBreak,
    MarkDone,
}

/// Local result of one monitor operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusOutcome {
    pub signals: Vec<FocusSignal>,
    pub commands: Vec<FocusCommand>,
}

impl FocusOutcome {
    pub fn signal(mut self, signal: FocusSignal) -> Self {
        self.signals.push(signal);
        self
    }

    pub fn command(mut self, command: FocusCommand) -> Self {
        self.commands.push(command);
        self
    }

    pub fn merge(&mut self, other: FocusOutcome) {
        self.signals.extend(other.signals);
        self.commands.extend(other.commands);
    }

    /// Rewards granted by this operation
    pub fn rewards(&self) -> impl Iterator<Item = &Reward> {
        self.signals.iter().filter_map(|s| match s {
            FocusSignal::RewardGranted(reward) => Some(reward),
            _ => None,
        })
    }
}
