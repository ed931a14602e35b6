//! TimerScheduler - keyed, cancellable deadlines
//!
//! The scheduler does not spawn tasks. It records deadlines and lets the
//! session loop sleep until the earliest one, then collect whatever is due.
//! Expiry handling therefore runs on the same loop as every other session
//! operation, and a cancelled timer can never fire late.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::key::{TimerKey, TimerOwner};

/// Owns every armed timer of one session
#[derive(Debug, Default)]
pub struct TimerScheduler {
    deadlines: HashMap<TimerKey, Instant>,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `key` to fire after `after`, replacing any existing deadline
    ///
    /// Returns true when an earlier instance of the same key was replaced.
    pub fn arm(&mut self, key: TimerKey, after: Duration) -> bool {
        let deadline = Instant::now() + after;
        let replaced = self.deadlines.insert(key.clone(), deadline).is_some();
        debug!(%key, ?after, replaced, "TimerScheduler::arm: called");
        replaced
    }

    /// Disarm `key`; returns whether it was armed
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        let removed = self.deadlines.remove(key).is_some();
        debug!(%key, removed, "TimerScheduler::cancel: called");
        removed
    }

    /// Disarm every timer belonging to `owner`; returns how many were removed
    pub fn cancel_owned_by(&mut self, owner: &TimerOwner) -> usize {
        let before = self.deadlines.len();
        self.deadlines.retain(|key, _| key.owner() != *owner);
        let removed = before - self.deadlines.len();
        debug!(?owner, removed, "TimerScheduler::cancel_owned_by: called");
        removed
    }

    pub fn is_armed(&self, key: &TimerKey) -> bool {
        self.deadlines.contains_key(key)
    }

    pub fn armed_count(&self) -> usize {
        self.deadlines.len()
    }

    /// Number of armed timers with the given owner
    pub fn armed_for(&self, owner: &TimerOwner) -> usize {
        self.deadlines.keys().filter(|k| k.owner() == *owner).count()
    }

    pub fn deadline(&self, key: &TimerKey) -> Option<Instant> {
        self.deadlines.get(key).copied()
    }

    /// Time left before `key` fires
    pub fn remaining(&self, key: &TimerKey) -> Option<Duration> {
        self.deadline(key)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Earliest armed deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Disarm and return every key due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKey> {
        let mut due: Vec<(Instant, TimerKey)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*deadline, key.clone()))
            .collect();
        due.sort();

        for (_, key) in &due {
            self.deadlines.remove(key);
        }
        if !due.is_empty() {
            debug!(count = due.len(), "TimerScheduler::take_due: timers expired");
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    /// Sleep until the earliest deadline; pends forever when nothing is armed
    pub async fn wait_next(&self) {
        match self.next_deadline() {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_instead_of_stacking() {
        let mut timers = TimerScheduler::new();
        assert!(!timers.arm(TimerKey::RecoveryRecheck, Duration::from_secs(900)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(timers.arm(TimerKey::RecoveryRecheck, Duration::from_secs(900)));

        assert_eq!(timers.armed_count(), 1);
        assert_eq!(
            timers.remaining(&TimerKey::RecoveryRecheck),
            Some(Duration::from_secs(900))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_due_in_deadline_order() {
        let mut timers = TimerScheduler::new();
        timers.arm(TimerKey::Stagnation, Duration::from_secs(300));
        timers.arm(TimerKey::Idle, Duration::from_secs(180));
        timers.arm(TimerKey::DeletionCommit, Duration::from_secs(5));

        tokio::time::advance(Duration::from_secs(200)).await;
        let due = timers.take_due(Instant::now());
        assert_eq!(due, vec![TimerKey::DeletionCommit, TimerKey::Idle]);
        assert!(timers.is_armed(&TimerKey::Stagnation));
        assert!(!timers.is_armed(&TimerKey::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut timers = TimerScheduler::new();
        timers.arm(TimerKey::ModeDwell, Duration::from_secs(600));
        assert!(timers.cancel(&TimerKey::ModeDwell));
        assert!(!timers.cancel(&TimerKey::ModeDwell));

        tokio::time::advance(Duration::from_secs(601)).await;
        assert!(timers.take_due(Instant::now()).is_empty());
    }

    #[test]
    fn test_cancel_owned_by() {
        let mut timers = TimerScheduler::new();
        timers.arm(TimerKey::ModeDwell, Duration::from_secs(1));
        timers.arm(TimerKey::RecoveryRecheck, Duration::from_secs(1));
        timers.arm(TimerKey::ShortBurst("p1".to_string()), Duration::from_secs(1));
        timers.arm(TimerKey::ShortBurst("p2".to_string()), Duration::from_secs(1));

        assert_eq!(timers.cancel_owned_by(&TimerOwner::Mode), 2);
        assert_eq!(timers.cancel_owned_by(&TimerOwner::Plan("p1".to_string())), 1);
        assert_eq!(timers.armed_for(&TimerOwner::Plan("p2".to_string())), 1);
        assert_eq!(timers.armed_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_next_wakes_at_deadline() {
        let mut timers = TimerScheduler::new();
        timers.arm(TimerKey::Idle, Duration::from_secs(180));

        let start = Instant::now();
        timers.wait_next().await;
        assert!(start.elapsed() >= Duration::from_secs(180));
        assert_eq!(timers.take_due(Instant::now()), vec![TimerKey::Idle]);
    }
}
