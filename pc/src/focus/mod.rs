//! Focus session monitor
//!
//! Idle/drift detection, short bursts, stagnation, optimistic step toggles,
//! deferred-commit deletion and quick capture over the live plan board.

mod deletion;
mod effects;
mod monitor;

pub use deletion::{DeletionTarget, PendingDeletion};
pub use effects::{BurstChoice, DriftChoice, FocusCommand, FocusOutcome, FocusSignal};
pub use monitor::FocusMonitor;
