//! Tracking store: durable record of every submitted episode.
//!
//! The store is the single source of truth for de-duplication and lifecycle
//! state. Records are created by the planner at submission time and only
//! mutated by the monitor afterwards.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteEpisodeStore;
pub use store::{EpisodeStore, StoreError};
pub use types::*;
