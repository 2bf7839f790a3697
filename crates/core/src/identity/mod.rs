//! Episode identity: parsing feed summaries and ordering episodes.
//!
//! Feed entries describe their episode in a free-text field list such as
//! `Show Name: Dexter; Episode Title: My Bad; Season: 5; Episode: 1`.
//! This module turns that into an [`EpisodeInfo`] and defines the keys used
//! to order feed items and compare episodes against a configured floor.

mod ordering;
mod summary;

pub use ordering::{EpisodeOrdinal, FeedOrder};
pub use summary::{parse_summary, EpisodeInfo, IdentityError};
