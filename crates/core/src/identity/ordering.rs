//! Ordering keys for feed items and episodes.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of an episode within a series.
///
/// Ordered by season, then episode. This matches the `season * 100 +
/// episode` numbering while both parts stay below 100 and remains correct
/// for longer seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeOrdinal {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeOrdinal {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }

    /// Whether this episode sorts before the configured floor.
    pub fn is_below(&self, floor: EpisodeOrdinal) -> bool {
        *self < floor
    }
}

impl fmt::Display for EpisodeOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{:02}e{:02}", self.season, self.episode)
    }
}

/// Deterministic processing order for a merged multi-season feed.
///
/// Items are ordered by season, then episode, then arrival order (the
/// zero-based position within the originating page). A scalar
/// `episode * 100 + arrival_order` key is not used: it ignores the season
/// and lets arrival overflow into the next episode on long pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedOrder {
    pub ordinal: EpisodeOrdinal,
    pub arrival_order: usize,
}

impl FeedOrder {
    pub fn new(ordinal: EpisodeOrdinal, arrival_order: usize) -> Self {
        Self {
            ordinal,
            arrival_order,
        }
    }
}

impl Ord for FeedOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal
            .cmp(&other.ordinal)
            .then(self.arrival_order.cmp(&other.arrival_order))
    }
}

impl PartialOrd for FeedOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
