//! Pure mood classification

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{Mode, MoodSample};

static OVERWHELMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(overwhelm(ed|ing)?|too much|can'?t cope|burn(ed|t)[ -]?out|exhausted|panic(king|ked)?)\b")
        .expect("overwhelmed pattern is valid")
});

/// Thresholds for mood classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodPolicy {
    /// Scores at or below this classify as recovery
    #[serde(rename = "recovery-max-score")]
    pub recovery_max_score: u8,

    /// Scores at or above this may classify as growth
    #[serde(rename = "growth-min-score")]
    pub growth_min_score: u8,

    /// Growth also needs a streak strictly longer than this
    #[serde(rename = "growth-min-streak")]
    pub growth_min_streak: u32,

    /// Length of a snooze window
    #[serde(rename = "snooze-mins")]
    pub snooze_mins: i64,

    /// Days of mood history read for streaks
    #[serde(rename = "history-window")]
    pub history_window: u32,
}

impl Default for MoodPolicy {
    fn default() -> Self {
        Self {
            recovery_max_score: 3,
            growth_min_score: 8,
            growth_min_streak: 2,
            snooze_mins: 60,
            history_window: 30,
        }
    }
}

/// Whether a note carries an "overwhelmed" signal
pub fn has_overwhelmed_signal(note: Option<&str>) -> bool {
    note.is_some_and(|n| OVERWHELMED.is_match(n))
}

/// Classify a sample into a mode
///
/// Without a sample the answer is always maintenance. A snooze window turns
/// what would be recovery into maintenance, however low the score.
pub fn classify(
    sample: Option<&MoodSample>,
    streak_days: u32,
    snooze_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    policy: &MoodPolicy,
) -> Mode {
    let Some(sample) = sample else {
        return Mode::Maintenance;
    };

    if sample.mood_score() <= policy.recovery_max_score || has_overwhelmed_signal(sample.note()) {
        if snooze_until.is_some_and(|until| now < until) {
            Mode::Maintenance
        } else {
            Mode::Recovery
        }
    } else if sample.mood_score() >= policy.growth_min_score && streak_days > policy.growth_min_streak {
        Mode::Growth
    } else {
        Mode::Maintenance
    }
}
