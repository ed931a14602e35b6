//! Named-timer scheduler
//!
//! Every timer in a session has a key and an owner. Arming a key that is
//! already armed replaces its deadline, so "replace timer X" is one call and
//! re-arming can never stack duplicate timers.

mod key;
mod policy;
mod scheduler;

pub use key::{TimerKey, TimerOwner};
pub use policy::TimerPolicy;
pub use scheduler::TimerScheduler;
