//! TMDB (The Movie Database) metadata lookup.
//!
//! TMDB requires an API key for access.
//! Rate limits are generous (around 40 requests per second).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::TmdbConfig;

use super::{LookupError, MetadataLookup, ShowHandle};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB lookup client.
pub struct TmdbLookup {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbLookup {
    /// Create a new TMDB lookup.
    pub fn new(config: &TmdbConfig) -> Result<Self, LookupError> {
        if config.api_key.is_empty() {
            return Err(LookupError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<Response, LookupError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == 401 {
            return Err(LookupError::NotConfigured(
                "Invalid TMDB API key".to_string(),
            ));
        }
        if status == 404 {
            return Err(LookupError::NotFound(what.to_string()));
        }
        if status == 429 {
            return Err(LookupError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl MetadataLookup for TmdbLookup {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn resolve(&self, series: &str, language: &str) -> Result<ShowHandle, LookupError> {
        debug!(series = %series, language = %language, "TMDB TV search");

        let response = self
            .get(
                "/search/tv",
                &[("query", series), ("language", language)],
                series,
            )
            .await?;
        let search: TmdbSearchResponse = response.json().await.map_err(|e| {
            LookupError::ParseError(format!("Failed to parse TV search response: {}", e))
        })?;

        pick_series(search.results, series)
            .map(|r| ShowHandle {
                id: r.id.to_string(),
                name: r.name,
                language: language.to_string(),
            })
            .ok_or_else(|| LookupError::NotFound(format!("TV series '{}'", series)))
    }

    async fn season_count(&self, show: &ShowHandle) -> Result<u32, LookupError> {
        debug!(series = %show.name, id = %show.id, "TMDB get TV");

        let response = self
            .get(
                &format!("/tv/{}", show.id),
                &[("language", show.language.as_str())],
                &format!("TV series ID {}", show.id),
            )
            .await?;
        let details: TmdbTvDetails = response.json().await.map_err(|e| {
            LookupError::ParseError(format!("Failed to parse TV response: {}", e))
        })?;

        match details.regular_season_count() {
            0 => Err(LookupError::NoSeasons(show.name.clone())),
            n => Ok(n),
        }
    }

    async fn episode_title(
        &self,
        show: &ShowHandle,
        season: u32,
        episode: u32,
    ) -> Result<String, LookupError> {
        debug!(series = %show.name, season, episode, "TMDB get episode");

        let response = self
            .get(
                &format!("/tv/{}/season/{}/episode/{}", show.id, season, episode),
                &[("language", show.language.as_str())],
                &format!("{} s{:02}e{:02}", show.name, season, episode),
            )
            .await?;
        let details: TmdbEpisodeDetails = response.json().await.map_err(|e| {
            LookupError::ParseError(format!("Failed to parse episode response: {}", e))
        })?;

        let name = details.name.trim();
        if name.is_empty() {
            return Err(LookupError::NotFound(format!(
                "title for {} s{:02}e{:02}",
                show.name, season, episode
            )));
        }
        Ok(name.to_string())
    }
}

/// Prefer an exact (case-insensitive) name match, else TMDB's top result.
fn pick_series(results: Vec<TmdbTvResult>, series: &str) -> Option<TmdbTvResult> {
    let wanted = series.trim().to_lowercase();
    let exact = results
        .iter()
        .position(|r| r.name.to_lowercase() == wanted);
    let mut results = results;
    match exact {
        Some(idx) => Some(results.swap_remove(idx)),
        None => results.into_iter().next(),
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    results: Vec<TmdbTvResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvResult {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbTvDetails {
    number_of_seasons: Option<u32>,
    #[serde(default)]
    seasons: Vec<TmdbSeasonResult>,
}

impl TmdbTvDetails {
    fn regular_season_count(&self) -> u32 {
        if self.seasons.is_empty() {
            return self.number_of_seasons.unwrap_or(0);
        }
        self.seasons
            .iter()
            .filter(|s| s.season_number > 0)
            .map(|s| s.season_number)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonResult {
    season_number: u32,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisodeDetails {
    #[serde(default)]
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv_result(id: u32, name: &str) -> TmdbTvResult {
        TmdbTvResult {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = TmdbLookup::new(&TmdbConfig {
            api_key: String::new(),
            base_url: None,
            timeout_secs: 5,
        });
        assert!(matches!(result, Err(LookupError::NotConfigured(_))));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let lookup = TmdbLookup::new(&TmdbConfig {
            api_key: "key".to_string(),
            base_url: Some("http://tmdb.local/3/".to_string()),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(lookup.base_url, "http://tmdb.local/3");
        assert_eq!(lookup.name(), "tmdb");
    }

    #[test]
    fn test_pick_series_prefers_exact_match() {
        let results = vec![
            tv_result(1, "Dexter: New Blood"),
            tv_result(2, "Dexter"),
            tv_result(3, "Dexter's Laboratory"),
        ];
        assert_eq!(pick_series(results, "dexter").unwrap().id, 2);
    }

    #[test]
    fn test_pick_series_falls_back_to_first() {
        let results = vec![tv_result(7, "The Office (US)"), tv_result(8, "The Office")];
        assert_eq!(pick_series(results, "Office").unwrap().id, 7);
        assert!(pick_series(vec![], "Office").is_none());
    }

    #[test]
    fn test_season_count_excludes_specials() {
        let json = r#"{
            "id": 1405, "name": "Dexter", "number_of_seasons": 8,
            "seasons": [
                {"season_number": 0, "name": "Specials", "episode_count": 30},
                {"season_number": 1, "episode_count": 12},
                {"season_number": 2, "episode_count": 12},
                {"season_number": 3, "episode_count": 12}
            ]
        }"#;
        let details: TmdbTvDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.regular_season_count(), 3);
    }

    #[test]
    fn test_season_count_only_specials() {
        let json = r#"{"number_of_seasons": 1, "seasons": [{"season_number": 0}]}"#;
        let details: TmdbTvDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.regular_season_count(), 0);
    }

    #[test]
    fn test_season_count_without_season_list() {
        let json = r#"{"number_of_seasons": 4}"#;
        let details: TmdbTvDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.regular_season_count(), 4);
    }

    #[test]
    fn test_episode_details_parse() {
        let json = r#"{"id": 1, "name": "My Bad", "episode_number": 1, "season_number": 5}"#;
        let details: TmdbEpisodeDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.name, "My Bad");
    }
}
