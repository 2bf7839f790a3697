//! Acquisition planner.
//!
//! For each show: work out which seasons to scan, read the feed, drop what
//! is already tracked or unwanted, and submit the rest while honouring the
//! show's concurrency limit.

mod pass;
mod types;

pub use pass::{discover_show, run_discovery_pass};
pub use types::*;
