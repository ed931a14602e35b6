//! Task-breakdown pipeline
//!
//! `brain_dump -> triage -> context -> breakdown -> dashboard`, resumable
//! through a draft snapshot and degraded gracefully when advice fails.

mod capacity;
mod controller;
mod draft;
mod error;
mod routing;
mod stage;
mod triage;

pub use capacity::{CapacityPolicy, CapacityReport, check_capacity, estimate_mins, is_too_big};
pub use controller::{Advance, ContextUpdate, GENTLE_TASK, MIN_DUMP_CHARS, PipelineController};
pub use draft::{
    Breakdown, ContextTask, DraftError, DraftPayload, DraftStore, FileDraftStore, MemoryDraftStore, SessionDraft,
};
pub use error::{ConfirmBlock, PipelineError};
pub use routing::{EntryContext, EntryRoute, route_entry};
pub use stage::{PipelineFlags, Stage};
pub use triage::{TooBigChoice, TriageItem, TriageList};
