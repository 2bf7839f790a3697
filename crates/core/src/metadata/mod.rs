//! Series metadata lookup.
//!
//! The planner uses a lookup to learn how many seasons a series has and to
//! fill in episode titles the feed leaves out.

mod tmdb;
mod types;

pub use tmdb::TmdbLookup;
pub use types::*;
