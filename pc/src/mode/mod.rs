//! Mode engine
//!
//! Classifies the user into an affective mode from mood samples and drives
//! the explicit mode state machine. The classification and the transition
//! reducer are pure functions; `ModeEngine` wraps them and owns the timer
//! side effects (warming-up dwell, recovery re-check).

mod classify;
mod engine;
mod reducer;

pub use classify::{MoodPolicy, classify, has_overwhelmed_signal};
pub use engine::{ModeEngine, ModeSignal};
pub use reducer::{ModeEvent, ModeTransition, reduce};
