//! PaceStore - generic persistent record storage
//!
//! Records are stored as JSON documents in SQLite, one row per record, with
//! a side table of indexed fields so callers can filter without
//! deserializing every document.
//!
//! # Usage
//!
//! Implement [`Record`] for a serde type, then use [`Store`] to create,
//! read, update, delete and list it:
//!
//! ```ignore
//! let mut store = Store::open("/tmp/pace")?;
//! store.create(plan)?;
//! let open: Vec<Plan> = store.list(&[Filter::eq("completed", false)])?;
//! ```

mod record;
mod store;

pub use record::{Filter, FilterOp, IndexValue, Record};
pub use store::Store;

/// Current time in Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
