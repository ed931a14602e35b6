//! Time-capacity heuristics for triage

use std::sync::LazyLock;

use chrono::{NaiveTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minutes assumed for quick errands
pub const QUICK_TASK_MINS: u32 = 10;
/// Minutes assumed for anything else
pub const DEFAULT_TASK_MINS: u32 = 15;
/// Minutes assumed for big chunks of work
pub const BIG_TASK_MINS: u32 = 30;
/// Extra minutes for long, wordy tasks
pub const LONG_TEXT_BONUS_MINS: u32 = 15;
/// Texts longer than this count as long
pub const LONG_TEXT_CHARS: usize = 80;

static QUICK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(call|text|email|buy|pay|reply|book|send)\b").expect("quick-task pattern is valid")
});

static BIG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(clean|write|research|organi[sz]e|plan|project|study|prepare)\b")
        .expect("big-task pattern is valid")
});

static TOO_BIG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(entire|whole|everything|all of|project|finish|overhaul|organi[sz]e|clean the house)\b")
        .expect("too-big pattern is valid")
});

/// Capacity limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityPolicy {
    /// Local hour at which the working day ends
    #[serde(rename = "cutoff-hour")]
    pub cutoff_hour: u32,

    /// Budget used once the cutoff has passed
    #[serde(rename = "fallback-budget-mins")]
    pub fallback_budget_mins: u32,

    /// Most tasks a sprint may confirm
    #[serde(rename = "sprint-limit")]
    pub sprint_limit: usize,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            cutoff_hour: 22,
            fallback_budget_mins: 60,
            sprint_limit: 3,
        }
    }
}

impl CapacityPolicy {
    /// Minutes left before the cutoff, or the fallback budget past it
    pub fn budget_mins(&self, now: NaiveTime) -> u32 {
        let cutoff_mins = self.cutoff_hour.min(24) * 60;
        let now_mins = now.hour() * 60 + now.minute();
        if now_mins >= cutoff_mins {
            self.fallback_budget_mins
        } else {
            cutoff_mins - now_mins
        }
    }
}

/// Heuristic time estimate for one task
pub fn estimate_mins(text: &str) -> u32 {
    let base = if QUICK.is_match(text) {
        QUICK_TASK_MINS
    } else if BIG.is_match(text) {
        BIG_TASK_MINS
    } else {
        DEFAULT_TASK_MINS
    };
    if text.chars().count() > LONG_TEXT_CHARS {
        base + LONG_TEXT_BONUS_MINS
    } else {
        base
    }
}

/// Whether a task looks too large to start on low energy
pub fn is_too_big(text: &str) -> bool {
    text.chars().count() > LONG_TEXT_CHARS || TOO_BIG.is_match(text)
}

/// Estimated load against the remaining budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub total_mins: u32,
    pub budget_mins: u32,
    pub over_capacity: bool,
    pub overflow_mins: u32,
    /// Offer "defer last item"
    pub can_defer_last: bool,
}

/// Compare the summed estimates with what is left of the day
pub fn check_capacity<'a>(
    texts: impl IntoIterator<Item = &'a str>,
    now: NaiveTime,
    policy: &CapacityPolicy,
) -> CapacityReport {
    let mut count = 0usize;
    let total_mins: u32 = texts
        .into_iter()
        .inspect(|_| count += 1)
        .map(estimate_mins)
        .sum();
    let budget_mins = policy.budget_mins(now);
    let over_capacity = total_mins > budget_mins;

    CapacityReport {
        total_mins,
        budget_mins,
        over_capacity,
        overflow_mins: total_mins.saturating_sub(budget_mins),
        can_defer_last: over_capacity && count > 1,
    }
}
