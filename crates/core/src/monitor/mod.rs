//! Transfer lifecycle monitor.
//!
//! Polls the torrent client for every tracked episode and moves each record
//! along `Incomplete -> Seeding -> Complete`, placing the episode file when
//! the download finishes and cleaning up once the seed target is met.

mod cleanup;
mod pass;
mod types;

pub use pass::{check_record, run_monitor_pass};
pub use types::*;
