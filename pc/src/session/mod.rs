//! Session orchestration
//!
//! Threads the mode engine, pipeline, focus monitor and timers through one
//! explicit context and exposes it either directly (`Session`) or as an
//! actor (`SessionHandle`).

mod context;
mod error;
mod handle;
mod signal;

pub use context::Session;
pub use error::SessionError;
pub use handle::{SessionCommand, SessionHandle, SessionSnapshot, run};
pub use signal::SessionSignal;
