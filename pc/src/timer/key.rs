//! Timer keys and owners

/// Logical timers a session can hold at once
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    /// Auto-advance out of `warming_up`
    ModeDwell,
    /// Inactivity check-in while in `recovery`
    RecoveryRecheck,
    /// No input activity during a focus session
    Idle,
    /// Short focus burst for one plan
    ShortBurst(String),
    /// No step toggled for a while
    Stagnation,
    /// Undo window of the pending deletion
    DeletionCommit,
    /// Debounced draft snapshot
    DraftSave,
}

/// Who is responsible for clearing a timer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    Mode,
    Focus,
    Plan(String),
    Pipeline,
}

impl TimerKey {
    pub fn owner(&self) -> TimerOwner {
        match self {
            Self::ModeDwell | Self::RecoveryRecheck => TimerOwner::Mode,
            Self::Idle | Self::Stagnation | Self::DeletionCommit => TimerOwner::Focus,
            Self::ShortBurst(plan_id) => TimerOwner::Plan(plan_id.clone()),
            Self::DraftSave => TimerOwner::Pipeline,
        }
    }
}

impl std::fmt::Display for TimerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModeDwell => write!(f, "mode_dwell"),
            Self::RecoveryRecheck => write!(f, "recovery_recheck"),
            Self::Idle => write!(f, "idle"),
            Self::ShortBurst(plan_id) => write!(f, "short_burst:{}", plan_id),
            Self::Stagnation => write!(f, "stagnation"),
            Self::DeletionCommit => write!(f, "deletion_commit"),
            Self::DraftSave => write!(f, "draft_save"),
        }
    }
}
