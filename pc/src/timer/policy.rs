//! Timer durations

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Inactivity re-check while in recovery
pub const RECOVERY_RECHECK_MINS: u64 = 15;
/// Dwell before warming_up settles into maintenance
pub const WARMING_UP_DWELL_MINS: u64 = 10;
/// Idle threshold during a focus session
pub const IDLE_MINS: u64 = 3;
/// Length of a short focus burst
pub const SHORT_BURST_MINS: u64 = 5;
/// No-toggle window before the stagnation prompt
pub const STAGNATION_MINS: u64 = 5;
/// Undo window for deletions
pub const DELETION_UNDO_SECS: u64 = 5;
/// Debounce for within-stage draft saves
pub const DRAFT_SAVE_DEBOUNCE_MS: u64 = 1_500;

/// All session timer durations in one place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerPolicy {
    #[serde(rename = "recovery-recheck-mins")]
    pub recovery_recheck_mins: u64,

    #[serde(rename = "dwell-mins")]
    pub dwell_mins: u64,

    #[serde(rename = "idle-mins")]
    pub idle_mins: u64,

    #[serde(rename = "burst-mins")]
    pub burst_mins: u64,

    #[serde(rename = "stagnation-mins")]
    pub stagnation_mins: u64,

    #[serde(rename = "undo-secs")]
    pub undo_secs: u64,

    #[serde(rename = "draft-save-debounce-ms")]
    pub draft_save_debounce_ms: u64,
}

impl Default for TimerPolicy {
    fn default() -> Self {
        Self {
            recovery_recheck_mins: RECOVERY_RECHECK_MINS,
            dwell_mins: WARMING_UP_DWELL_MINS,
            idle_mins: IDLE_MINS,
            burst_mins: SHORT_BURST_MINS,
            stagnation_mins: STAGNATION_MINS,
            undo_secs: DELETION_UNDO_SECS,
            draft_save_debounce_ms: DRAFT_SAVE_DEBOUNCE_MS,
        }
    }
}

impl TimerPolicy {
    pub fn recovery_recheck(&self) -> Duration {
        Duration::from_secs(self.recovery_recheck_mins * 60)
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_secs(self.dwell_mins * 60)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_mins * 60)
    }

    pub fn burst(&self) -> Duration {
        Duration::from_secs(self.burst_mins * 60)
    }

    pub fn stagnation(&self) -> Duration {
        Duration::from_secs(self.stagnation_mins * 60)
    }

    pub fn undo(&self) -> Duration {
        Duration::from_secs(self.undo_secs)
    }

    pub fn draft_save_debounce(&self) -> Duration {
        Duration::from_millis(self.draft_save_debounce_ms)
    }
}
