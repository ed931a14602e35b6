//! Mood samples, energy levels and affective modes

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use pacestore::{IndexValue, Record};
use serde::{Deserialize, Serialize};

use super::id::generate_id;
use crate::error::ValidationError;

/// Highest valid mood score
pub const MAX_MOOD_SCORE: u8 = 10;

/// Self-reported energy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for EnergyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown energy level: {}", s)),
        }
    }
}

/// Affective/capacity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Recovery,
    WarmingUp,
    #[default]
    Maintenance,
    Growth,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recovery => write!(f, "recovery"),
            Self::WarmingUp => write!(f, "warming_up"),
            Self::Maintenance => write!(f, "maintenance"),
            Self::Growth => write!(f, "growth"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "recovery" => Ok(Self::Recovery),
            "warming_up" => Ok(Self::WarmingUp),
            "maintenance" => Ok(Self::Maintenance),
            "growth" => Ok(Self::Growth),
            _ => Err(format!("Unknown mode: {}", s)),
        }
    }
}

/// The single live mode state of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeState {
    pub mode: Mode,
    pub manual_override: bool,
    pub snooze_until: Option<DateTime<Utc>>,
    pub entered_at: DateTime<Utc>,
}

impl ModeState {
    /// Fresh state: maintenance, no override, no snooze
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            mode: Mode::Maintenance,
            manual_override: false,
            snooze_until: None,
            entered_at: now,
        }
    }

    /// Whether a snooze window is active at `now`
    pub fn is_snoozed(&self, now: DateTime<Utc>) -> bool {
        self.snooze_until.is_some_and(|until| now < until)
    }
}

/// A self-reported mood sample; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodSample {
    id: String,
    recorded_at: DateTime<Utc>,
    mood_score: u8,
    energy: EnergyLevel,
    note: Option<String>,
}

impl MoodSample {
    /// Create a sample stamped with the current time
    pub fn new(mood_score: u8, energy: EnergyLevel, note: Option<String>) -> Result<Self, ValidationError> {
        Self::recorded(mood_score, energy, note, Utc::now())
    }

    /// Create a sample with an explicit timestamp
    pub fn recorded(
        mood_score: u8,
        energy: EnergyLevel,
        note: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if mood_score > MAX_MOOD_SCORE {
            return Err(ValidationError::MoodOutOfRange(mood_score));
        }
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        Ok(Self {
            id: generate_id("mood", ""),
            recorded_at,
            mood_score,
            energy,
            note,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn mood_score(&self) -> u8 {
        self.mood_score
    }

    pub fn energy(&self) -> EnergyLevel {
        self.energy
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

impl Record for MoodSample {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.recorded_at.timestamp_millis()
    }

    fn collection_name() -> &'static str {
        "mood_samples"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert(
            "recorded_at".to_string(),
            IndexValue::Int(self.recorded_at.timestamp_millis()),
        );
        fields.insert("mood_score".to_string(), IndexValue::Int(i64::from(self.mood_score)));
        fields
    }
}

/// Count consecutive calendar days (UTC) with at least one sample
///
/// The run must end today or yesterday; an older run counts as broken.
pub fn streak_days(samples: &[MoodSample], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = samples.iter().map(|s| s.recorded_at.date_naive()).collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_mood_score_range() {
        assert!(MoodSample::new(10, EnergyLevel::High, None).is_ok());
        assert_eq!(
            MoodSample::new(11, EnergyLevel::High, None).unwrap_err(),
            ValidationError::MoodOutOfRange(11)
        );
    }

    #[test]
    fn test_blank_note_is_dropped() {
        let sample = MoodSample::new(5, EnergyLevel::Medium, Some("   ".to_string())).unwrap();
        assert!(sample.note().is_none());
    }

    #[test]
    fn test_mode_serde_names() {
        assert_eq!(serde_json::to_string(&Mode::WarmingUp).unwrap(), "\"warming_up\"");
        assert_eq!("warming-up".parse::<Mode>().unwrap(), Mode::WarmingUp);
    }

    #[test]
    fn test_snooze_window() {
        let mut state = ModeState::new(at(1, 9));
        assert!(!state.is_snoozed(at(1, 9)));
        state.snooze_until = Some(at(1, 10));
        assert!(state.is_snoozed(at(1, 9)));
        assert!(!state.is_snoozed(at(1, 10)));
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        let samples: Vec<MoodSample> = [3, 4, 5, 5]
            .iter()
            .map(|d| MoodSample::recorded(6, EnergyLevel::Medium, None, at(*d, 8)).unwrap())
            .collect();
        let today = at(5, 12).date_naive();
        assert_eq!(streak_days(&samples, today), 3);
    }

    #[test]
    fn test_streak_allows_yesterday_end() {
        let samples = vec![
            MoodSample::recorded(6, EnergyLevel::Medium, None, at(3, 8)).unwrap(),
            MoodSample::recorded(6, EnergyLevel::Medium, None, at(4, 8)).unwrap(),
        ];
        assert_eq!(streak_days(&samples, at(5, 12).date_naive()), 2);
        assert_eq!(streak_days(&samples, at(7, 12).date_naive()), 0);
    }
}
