//! State management with actor pattern
//!
//! StateManager owns the record store and serves persistence commands over
//! channels; the rest of the crate only sees the `Persistence` trait.

mod manager;
mod messages;
mod persistence;

#[cfg(test)]
pub mod mock;

pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse};
pub use persistence::Persistence;
