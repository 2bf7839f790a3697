//! Feed summary parsing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing a feed summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The summary lacks a usable `Season` or `Episode` field.
    #[error("malformed metadata: {reason} in {summary:?}")]
    MalformedMetadata { summary: String, reason: String },
}

impl IdentityError {
    fn malformed(summary: &str, reason: impl Into<String>) -> Self {
        IdentityError::MalformedMetadata {
            summary: summary.to_string(),
            reason: reason.into(),
        }
    }
}

/// Structured episode identity extracted from a feed summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    /// Series name as the feed spells it (may be absent).
    pub show_name: Option<String>,
    /// Season number.
    pub season: u32,
    /// Episode number within the season.
    pub episode: u32,
    /// Episode title, `None` when the feed does not know it.
    pub title: Option<String>,
}

impl EpisodeInfo {
    /// Short `s01e02` style label for log lines.
    pub fn label(&self) -> String {
        format!("s{:02}e{:02}", self.season, self.episode)
    }
}

const SHOW_NAME_KEY: &str = "Show Name";
const SEASON_KEY: &str = "Season";
const EPISODE_KEY: &str = "Episode";
const TITLE_KEY: &str = "Episode Title";

/// Placeholder some feeds use for a missing title.
const UNKNOWN_TITLE: &str = "N/A";

/// Parse a `Key: Value; Key: Value` summary into an [`EpisodeInfo`].
///
/// Segments without a `": "` separator are ignored. `Season` and `Episode`
/// are required and must be positive integers.
pub fn parse_summary(summary: &str) -> Result<EpisodeInfo, IdentityError> {
    let mut show_name = None;
    let mut season = None;
    let mut episode = None;
    let mut title = None;

    for segment in summary.split(';') {
        let Some((key, value)) = segment.split_once(": ") else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            SHOW_NAME_KEY => show_name = non_empty(value),
            SEASON_KEY => season = Some(value),
            EPISODE_KEY => episode = Some(value),
            TITLE_KEY => {
                title = non_empty(value).filter(|t| t != UNKNOWN_TITLE);
            }
            _ => {}
        }
    }

    let season = parse_number(summary, SEASON_KEY, season)?;
    let episode = parse_number(summary, EPISODE_KEY, episode)?;

    Ok(EpisodeInfo {
        show_name,
        season,
        episode,
        title,
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_number(summary: &str, key: &str, value: Option<&str>) -> Result<u32, IdentityError> {
    let value = value.ok_or_else(|| IdentityError::malformed(summary, format!("missing {}", key)))?;
    let number: u32 = value
        .parse()
        .map_err(|_| IdentityError::malformed(summary, format!("non-numeric {} {:?}", key, value)))?;
    if number == 0 {
        return Err(IdentityError::malformed(summary, format!("{} must be positive", key)));
    }
    Ok(number)
}
