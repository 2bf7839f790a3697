//! Mock feed source for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::feed::{FeedEntry, FeedError, FeedSource};

/// Mock implementation of the FeedSource trait.
///
/// Entries are configured per show query and season. A season with nothing
/// configured returns an empty page, like a real feed would.
#[derive(Debug, Default)]
pub struct MockFeedSource {
    pages: Arc<RwLock<HashMap<(String, u32), Vec<FeedEntry>>>>,
    /// Show queries whose fetches fail.
    failing: Arc<RwLock<HashSet<String>>>,
    /// Recorded `(show_query, quality, season)` fetches.
    fetches: Arc<RwLock<Vec<(String, String, u32)>>>,
}

impl MockFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the page for one season of a show.
    pub async fn set_entries(&self, show_query: &str, season: u32, entries: Vec<FeedEntry>) {
        self.pages
            .write()
            .await
            .insert((show_query.to_string(), season), entries);
    }

    /// Append one entry to a season page.
    pub async fn push_entry(&self, show_query: &str, season: u32, entry: FeedEntry) {
        self.pages
            .write()
            .await
            .entry((show_query.to_string(), season))
            .or_default()
            .push(entry);
    }

    /// Make every fetch for `show_query` fail with HTTP 503.
    pub async fn set_failing(&self, show_query: &str, failing: bool) {
        let mut set = self.failing.write().await;
        if failing {
            set.insert(show_query.to_string());
        } else {
            set.remove(show_query);
        }
    }

    /// Recorded fetches, in order.
    pub async fn fetches(&self) -> Vec<(String, String, u32)> {
        self.fetches.read().await.clone()
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        show_query: &str,
        quality: &str,
        season: u32,
    ) -> Result<Vec<FeedEntry>, FeedError> {
        self.fetches
            .write()
            .await
            .push((show_query.to_string(), quality.to_string(), season));

        if self.failing.read().await.contains(show_query) {
            return Err(FeedError::Status(503));
        }
        Ok(self
            .pages
            .read()
            .await
            .get(&(show_query.to_string(), season))
            .cloned()
            .unwrap_or_default())
    }
}
