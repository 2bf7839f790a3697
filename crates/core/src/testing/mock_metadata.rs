//! Mock metadata lookup for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::metadata::{LookupError, MetadataLookup, ShowHandle};

/// Mock implementation of the MetadataLookup trait.
///
/// Series are matched by exact name. Unknown series and titles return
/// [`LookupError::NotFound`].
#[derive(Debug, Default)]
pub struct MockMetadataLookup {
    seasons: Arc<RwLock<HashMap<String, u32>>>,
    titles: Arc<RwLock<HashMap<(String, u32, u32), String>>>,
    /// Series whose lookups fail with a rate limit error.
    rate_limited: Arc<RwLock<HashSet<String>>>,
}

impl MockMetadataLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series with its number of regular seasons.
    pub async fn add_series(&self, name: &str, seasons: u32) {
        self.seasons.write().await.insert(name.to_string(), seasons);
    }

    pub async fn set_title(&self, name: &str, season: u32, episode: u32, title: &str) {
        self.titles
            .write()
            .await
            .insert((name.to_string(), season, episode), title.to_string());
    }

    pub async fn set_rate_limited(&self, name: &str, limited: bool) {
        let mut set = self.rate_limited.write().await;
        if limited {
            set.insert(name.to_string());
        } else {
            set.remove(name);
        }
    }

    async fn check_limit(&self, name: &str) -> Result<(), LookupError> {
        if self.rate_limited.read().await.contains(name) {
            return Err(LookupError::RateLimitExceeded);
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataLookup for MockMetadataLookup {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve(&self, series: &str, language: &str) -> Result<ShowHandle, LookupError> {
        self.check_limit(series).await?;
        if !self.seasons.read().await.contains_key(series) {
            return Err(LookupError::NotFound(series.to_string()));
        }
        Ok(ShowHandle {
            id: series.to_lowercase().replace(' ', "-"),
            name: series.to_string(),
            language: language.to_string(),
        })
    }

    async fn season_count(&self, show: &ShowHandle) -> Result<u32, LookupError> {
        self.check_limit(&show.name).await?;
        self.seasons
            .read()
            .await
            .get(&show.name)
            .copied()
            .ok_or_else(|| LookupError::NotFound(show.name.clone()))
    }

    async fn episode_title(
        &self,
        show: &ShowHandle,
        season: u32,
        episode: u32,
    ) -> Result<String, LookupError> {
        self.check_limit(&show.name).await?;
        self.titles
            .read()
            .await
            .get(&(show.name.clone(), season, episode))
            .cloned()
            .ok_or_else(|| {
                LookupError::NotFound(format!("{} s{:02}e{:02}", show.name, season, episode))
            })
    }
}
