//! ModeEngine - reducer plus timer effects
//!
//! The engine owns the live `ModeState` and the latest mood inputs. Every
//! state change goes through `reduce`; the engine then fixes up the timers
//! owned by the mode so no stale dwell or re-check can fire after a switch.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info};

use super::classify::{MoodPolicy, classify};
use super::reducer::{ModeEvent, ModeTransition, reduce};
use crate::domain::{Mode, ModeState, MoodSample};
use crate::timer::{TimerKey, TimerOwner, TimerPolicy, TimerScheduler};

/// Something the surface should react to after a mode operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeSignal {
    /// The mode moved
    Changed { from: Mode, to: Mode },
    /// The recovery re-check elapsed; ask how the user is doing
    RecoveryCheckIn,
}

/// Live mode state for one session
#[derive(Debug)]
pub struct ModeEngine {
    state: ModeState,
    policy: MoodPolicy,
    timers: TimerPolicy,
    latest: Option<MoodSample>,
    streak_days: u32,
}

impl ModeEngine {
    pub fn new(policy: MoodPolicy, timers: TimerPolicy, now: DateTime<Utc>) -> Self {
        Self {
            state: ModeState::new(now),
            policy,
            timers,
            latest: None,
            streak_days: 0,
        }
    }

    /// Seed the engine from persisted history without emitting a change
    pub fn restore(
        &mut self,
        latest: Option<MoodSample>,
        streak_days: u32,
        now: DateTime<Utc>,
        scheduler: &mut TimerScheduler,
    ) -> Mode {
        let mode = classify(latest.as_ref(), streak_days, self.state.snooze_until, now, &self.policy);
        debug!(%mode, streak_days, "ModeEngine::restore: called");
        self.latest = latest;
        self.streak_days = streak_days;

        let mut state = self.state.clone();
        let changed = state.mode != mode;
        state.mode = mode;
        state.entered_at = now;
        self.apply(
            ModeTransition {
                state,
                changed,
                reentered: !changed,
            },
            scheduler,
        );
        mode
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn policy(&self) -> &MoodPolicy {
        &self.policy
    }

    pub fn latest_sample(&self) -> Option<&MoodSample> {
        self.latest.as_ref()
    }

    pub fn streak_days(&self) -> u32 {
        self.streak_days
    }

    /// Pure classification against the engine's thresholds and snooze window
    pub fn classify(&self, sample: Option<&MoodSample>, streak_days: u32, now: DateTime<Utc>) -> Mode {
        classify(sample, streak_days, self.state.snooze_until, now, &self.policy)
    }

    /// Apply one event and fix up the mode-owned timers
    pub fn transition(
        &mut self,
        event: ModeEvent,
        now: DateTime<Utc>,
        scheduler: &mut TimerScheduler,
    ) -> Option<ModeSignal> {
        debug!(event = event.name(), mode = %self.state.mode, "ModeEngine::transition: called");
        if let ModeEvent::MoodLogged { sample, streak_days } = &event {
            self.latest = Some(sample.clone());
            self.streak_days = *streak_days;
        }

        let from = self.state.mode;
        let transition = reduce(&self.state, &event, now, &self.policy);
        self.apply(transition, scheduler);

        let to = self.state.mode;
        if from != to {
            info!(%from, %to, "Mode changed");
            Some(ModeSignal::Changed { from, to })
        } else {
            None
        }
    }

    /// Record a new sample and reclassify
    pub fn log_mood(
        &mut self,
        sample: MoodSample,
        streak_days: u32,
        now: DateTime<Utc>,
        scheduler: &mut TimerScheduler,
    ) -> Option<ModeSignal> {
        self.transition(ModeEvent::MoodLogged { sample, streak_days }, now, scheduler)
    }

    /// Pin the mode until `clear_override`
    pub fn apply_override(&mut self, mode: Mode, now: DateTime<Utc>, scheduler: &mut TimerScheduler) -> Option<ModeSignal> {
        self.transition(ModeEvent::Override(mode), now, scheduler)
    }

    /// Unpin and recompute from the latest sample
    pub fn clear_override(&mut self, now: DateTime<Utc>, scheduler: &mut TimerScheduler) -> Option<ModeSignal> {
        let event = ModeEvent::ClearOverride {
            latest: self.latest.clone(),
            streak_days: self.streak_days,
        };
        self.transition(event, now, scheduler)
    }

    /// Suppress recovery for the configured snooze window
    pub fn snooze(&mut self, now: DateTime<Utc>, scheduler: &mut TimerScheduler) -> Option<ModeSignal> {
        let until = now + ChronoDuration::minutes(self.policy.snooze_mins);
        self.transition(ModeEvent::Snooze { until }, now, scheduler)
    }

    /// Any user input while warming up restarts the dwell window
    pub fn note_activity(&self, scheduler: &mut TimerScheduler) {
        if self.state.mode == Mode::WarmingUp && !self.state.manual_override {
            scheduler.arm(TimerKey::ModeDwell, self.timers.dwell());
        }
    }

    /// React to an expired mode-owned timer
    pub fn handle_timer(
        &mut self,
        key: &TimerKey,
        now: DateTime<Utc>,
        scheduler: &mut TimerScheduler,
    ) -> Option<ModeSignal> {
        debug!(%key, mode = %self.state.mode, "ModeEngine::handle_timer: called");
        match key {
            TimerKey::ModeDwell => self.transition(ModeEvent::DwellElapsed, now, scheduler),
            TimerKey::RecoveryRecheck if self.state.mode == Mode::Recovery => Some(ModeSignal::RecoveryCheckIn),
            _ => None,
        }
    }

    fn apply(&mut self, transition: ModeTransition, scheduler: &mut TimerScheduler) {
        let ModeTransition {
            state,
            changed,
            reentered,
        } = transition;
        self.state = state;

        let rearm = changed || (reentered && self.state.mode == Mode::Recovery);
        if !rearm {
            return;
        }

        scheduler.cancel_owned_by(&TimerOwner::Mode);
        match self.state.mode {
            Mode::Recovery => {
                scheduler.arm(TimerKey::RecoveryRecheck, self.timers.recovery_recheck());
            }
            Mode::WarmingUp if !self.state.manual_override => {
                scheduler.arm(TimerKey::ModeDwell, self.timers.dwell());
            }
            _ => {}
        }
    }
}
