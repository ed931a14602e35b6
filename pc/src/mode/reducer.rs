//! Pure `(state, event) -> state` mode reducer

use chrono::{DateTime, Utc};

use super::classify::{MoodPolicy, classify};
use crate::domain::{Mode, ModeState, MoodSample};

/// Anything that can move the mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeEvent {
    /// A new mood sample arrived
    MoodLogged { sample: MoodSample, streak_days: u32 },
    /// "Feeling a little better" (recovery -> warming_up)
    FeelingBetter,
    /// "Okay now" (warming_up -> maintenance)
    OkayNow,
    /// "Need more time" (warming_up -> recovery)
    NeedMoreTime,
    /// The warming-up dwell window passed without input
    DwellElapsed,
    /// Suppress recovery until `until`
    Snooze { until: DateTime<Utc> },
    /// Pin the mode
    Override(Mode),
    /// Unpin and recompute from the latest sample
    ClearOverride {
        latest: Option<MoodSample>,
        streak_days: u32,
    },
}

impl ModeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MoodLogged { .. } => "mood_logged",
            Self::FeelingBetter => "feeling_better",
            Self::OkayNow => "okay_now",
            Self::NeedMoreTime => "need_more_time",
            Self::DwellElapsed => "dwell_elapsed",
            Self::Snooze { .. } => "snooze",
            Self::Override(_) => "override",
            Self::ClearOverride { .. } => "clear_override",
        }
    }
}

/// Outcome of reducing one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTransition {
    pub state: ModeState,
    /// The mode differs from the previous one
    pub changed: bool,
    /// The event landed on the mode we were already in
    pub reentered: bool,
}

impl ModeTransition {
    fn unchanged(state: &ModeState) -> Self {
        Self {
            state: state.clone(),
            changed: false,
            reentered: false,
        }
    }

    fn to(state: &ModeState, mode: Mode, now: DateTime<Utc>) -> Self {
        let mut next = state.clone();
        let changed = next.mode != mode;
        if changed {
            next.mode = mode;
            next.entered_at = now;
        }
        Self {
            state: next,
            changed,
            reentered: !changed,
        }
    }
}

/// Apply one event to a mode state
///
/// Explicit edge events that have no edge from the current mode are no-ops.
/// While an override is active only `Override` and `ClearOverride` move the
/// mode; a `Snooze` still records its deadline.
pub fn reduce(state: &ModeState, event: &ModeEvent, now: DateTime<Utc>, policy: &MoodPolicy) -> ModeTransition {
    match event {
        ModeEvent::Override(mode) => {
            let mut transition = ModeTransition::to(state, *mode, now);
            transition.state.manual_override = true;
            transition
        }
        ModeEvent::ClearOverride { latest, streak_days } => {
            let mode = classify(latest.as_ref(), *streak_days, state.snooze_until, now, policy);
            let mut transition = ModeTransition::to(state, mode, now);
            transition.state.manual_override = false;
            transition
        }
        ModeEvent::Snooze { until } => {
            let mut base = state.clone();
            base.snooze_until = Some(*until);
            if !state.manual_override && state.mode == Mode::Recovery {
                ModeTransition::to(&base, Mode::Maintenance, now)
            } else {
                ModeTransition::unchanged(&base)
            }
        }
        _ if state.manual_override => ModeTransition::unchanged(state),
        ModeEvent::MoodLogged { sample, streak_days } => {
            let mode = classify(Some(sample), *streak_days, state.snooze_until, now, policy);
            ModeTransition::to(state, mode, now)
        }
        ModeEvent::FeelingBetter if state.mode == Mode::Recovery => ModeTransition::to(state, Mode::WarmingUp, now),
        ModeEvent::OkayNow | ModeEvent::DwellElapsed if state.mode == Mode::WarmingUp => {
            ModeTransition::to(state, Mode::Maintenance, now)
        }
        ModeEvent::NeedMoreTime if state.mode == Mode::WarmingUp => ModeTransition::to(state, Mode::Recovery, now),
        _ => ModeTransition::unchanged(state),
    }
}
