//! Episode feed sources.
//!
//! A feed is queried one season at a time and yields raw entries whose
//! summaries are parsed by [`crate::identity::parse_summary`].

mod rss;
mod types;

pub use rss::RssFeedSource;
pub use types::*;
