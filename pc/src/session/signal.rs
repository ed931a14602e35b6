//! Signals a session broadcasts to whatever surface is attached

use crate::advice::Degradation;
use crate::domain::{Mode, Reward};
use crate::focus::FocusSignal;
use crate::mode::ModeSignal;
use crate::pipeline::CapacityReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    ModeChanged { from: Mode, to: Mode },
    /// Recovery re-check elapsed: "Feeling better?" / "Need more time?"
    RecoveryCheckIn,
    /// A pipeline stage was produced by a local fallback
    Degraded(Degradation),
    OverCapacity(CapacityReport),
    IdleCue,
    DriftChoice { plan_ids: Vec<String> },
    BurstChoice { plan_id: String },
    StagnationPrompt,
    RewardGranted(Reward),
    DeletionPending { label: String },
    DeletionCommitted { label: String },
    DeletionUndone { label: String },
    /// A write failed after its local change was applied; local state stays
    PersistenceFailed {
        operation: &'static str,
        plan_id: Option<String>,
        error: String,
    },
    Captured { plan_id: String },
}

impl From<FocusSignal> for SessionSignal {
    fn from(signal: FocusSignal) -> Self {
        match signal {
            FocusSignal::IdleCue => Self::IdleCue,
            FocusSignal::DriftChoice { plan_ids } => Self::DriftChoice { plan_ids },
            FocusSignal::BurstChoice { plan_id } => Self::BurstChoice { plan_id },
            FocusSignal::StagnationPrompt => Self::StagnationPrompt,
            FocusSignal::RewardGranted(reward) => Self::RewardGranted(reward),
            FocusSignal::DeletionPending { label } => Self::DeletionPending { label },
            FocusSignal::DeletionCommitted { label } => Self::DeletionCommitted { label },
            FocusSignal::DeletionUndone { label } => Self::DeletionUndone { label },
            FocusSignal::Captured { plan_id } => Self::Captured { plan_id },
        }
    }
}

impl From<ModeSignal> for SessionSignal {
    fn from(signal: ModeSignal) -> Self {
        match signal {
            ModeSignal::Changed { from, to } => Self::ModeChanged { from, to },
            ModeSignal::RecoveryCheckIn => Self::RecoveryCheckIn,
        }
    }
}
