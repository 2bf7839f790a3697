//! Per-show configuration resolved against `[defaults]`.

use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{Config, ShowDefaults, ShowEntry};
use super::ConfigError;
use crate::identity::EpisodeOrdinal;
use crate::placer::DestinationTemplate;

/// Fully resolved settings for one tracked show.
#[derive(Debug, Clone, Serialize)]
pub struct ShowConfig {
    /// Stable key (the `[shows.<key>]` table name).
    pub key: String,
    /// Series name used for feed queries and metadata lookup.
    pub name: String,
    pub quality: String,
    pub seed_ratio: f64,
    pub start_season: u32,
    pub start_episode: u32,
    /// Lowercased, without leading dots.
    pub exclude_extensions: Vec<String>,
    pub max_concurrent: usize,
    pub destination: DestinationTemplate,
    pub keep_paused: bool,
    pub language: String,
}

impl ShowConfig {
    /// Resolve a show entry, filling unset fields from `defaults`.
    pub fn resolve(
        key: &str,
        entry: &ShowEntry,
        defaults: &ShowDefaults,
    ) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidShow {
            show: key.to_string(),
            reason,
        };

        let raw_destination = entry
            .destination
            .as_deref()
            .or(defaults.destination.as_deref())
            .ok_or_else(|| invalid("no destination configured".to_string()))?;
        let destination =
            DestinationTemplate::parse(raw_destination).map_err(|e| invalid(e.to_string()))?;

        let seed_ratio = entry.seed_ratio.unwrap_or(defaults.seed_ratio);
        if !seed_ratio.is_finite() || seed_ratio < 0.0 {
            return Err(invalid(format!("seed_ratio must be >= 0, got {}", seed_ratio)));
        }

        let start_season = entry.start_season.unwrap_or(defaults.start_season);
        let start_episode = entry.start_episode.unwrap_or(defaults.start_episode);
        if start_season == 0 || start_episode == 0 {
            return Err(invalid("start_season and start_episode must be >= 1".to_string()));
        }

        let max_concurrent = entry.max_concurrent.unwrap_or(defaults.max_concurrent);
        if max_concurrent == 0 {
            return Err(invalid("max_concurrent must be >= 1".to_string()));
        }

        let name = entry
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| key.to_string());

        let exclude_extensions = entry
            .exclude_extensions
            .as_ref()
            .unwrap_or(&defaults.exclude_extensions)
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();

        Ok(Self {
            key: key.to_string(),
            name,
            quality: entry.quality.clone().unwrap_or_else(|| defaults.quality.clone()),
            seed_ratio,
            start_season,
            start_episode,
            exclude_extensions,
            max_concurrent,
            destination,
            keep_paused: entry.keep_paused.unwrap_or(defaults.keep_paused),
            language: entry.language.clone().unwrap_or_else(|| defaults.language.clone()),
        })
    }

    /// The configured season/episode floor.
    pub fn floor(&self) -> EpisodeOrdinal {
        EpisodeOrdinal::new(self.start_season, self.start_episode)
    }

    /// Whether a file with this extension must not be downloaded.
    pub fn is_excluded_extension(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        !extension.is_empty() && self.exclude_extensions.iter().any(|e| *e == extension)
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// A show whose configuration could not be resolved.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidShow {
    pub key: String,
    pub reason: String,
}

/// Every configured show, split into usable and invalid entries.
#[derive(Debug, Clone, Default)]
pub struct ShowRegistry {
    shows: BTreeMap<String, ShowConfig>,
    invalid: BTreeMap<String, InvalidShow>,
}

impl ShowRegistry {
    /// Resolve every `[shows.<key>]` table. One bad show never hides the others.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::default();
        for (key, entry) in &config.shows {
            match ShowConfig::resolve(key, entry, &config.defaults) {
                Ok(show) => {
                    registry.shows.insert(key.clone(), show);
                }
                Err(e) => {
                    let reason = match e {
                        ConfigError::InvalidShow { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    registry.invalid.insert(
                        key.clone(),
                        InvalidShow {
                            key: key.clone(),
                            reason,
                        },
                    );
                }
            }
        }
        registry
    }

    /// Build a registry from already resolved shows.
    pub fn from_shows(shows: impl IntoIterator<Item = ShowConfig>) -> Self {
        Self {
            shows: shows.into_iter().map(|s| (s.key.clone(), s)).collect(),
            invalid: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ShowConfig> {
        self.shows.get(key)
    }

    /// The configuration error for `key`, if that show is invalid.
    pub fn error_for(&self, key: &str) -> Option<ConfigError> {
        self.invalid.get(key).map(|i| ConfigError::InvalidShow {
            show: i.key.clone(),
            reason: i.reason.clone(),
        })
    }

    /// Whether `key` names a configured show, valid or not.
    pub fn contains(&self, key: &str) -> bool {
        self.shows.contains_key(key) || self.invalid.contains_key(key)
    }

    pub fn shows(&self) -> impl Iterator<Item = &ShowConfig> {
        self.shows.values()
    }

    pub fn invalid(&self) -> impl Iterator<Item = &InvalidShow> {
        self.invalid.values()
    }

    pub fn len(&self) -> usize {
        self.shows.len() + self.invalid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    const CONFIG: &str = r#"
[defaults]
quality = "720p"
seed_ratio = 1.5
exclude_extensions = [".RAR"]

[shows.dexter]
name = "Dexter"
destination = "/tv/{show_name}/s{season:02}e{episode:02} {title}"
start_season = 2
start_episode = 5

[shows.lost]
destination = "/tv/lost/{title}"
quality = "HDTV"
max_concurrent = 1
exclude_extensions = ["zip", "  .Avi "]

[shows.broken]
name = "Broken"

[shows.typo]
destination = "/tv/{series}/{title}"
"#;

    #[test]
    fn test_resolve_applies_defaults() {
        let config = load_config_from_str(CONFIG).unwrap();
        let registry = ShowRegistry::from_config(&config);

        let dexter = registry.get("dexter").unwrap();
        assert_eq!(dexter.name, "Dexter");
        assert_eq!(dexter.quality, "720p");
        assert_eq!(dexter.seed_ratio, 1.5);
        assert_eq!(dexter.max_concurrent, 2);
        assert_eq!(dexter.language, "en");
        assert!(!dexter.keep_paused);
        assert_eq!(dexter.floor(), EpisodeOrdinal::new(2, 5));
        assert!(dexter.is_excluded_extension("rar"));
        assert!(dexter.is_excluded_extension(".Rar"));
        assert!(!dexter.is_excluded_extension("mkv"));
    }

    #[test]
    fn test_resolve_overrides_and_key_as_name() {
        let config = load_config_from_str(CONFIG).unwrap();
        let registry = ShowRegistry::from_config(&config);

        let lost = registry.get("lost").unwrap();
        assert_eq!(lost.name, "lost");
        assert_eq!(lost.quality, "HDTV");
        assert_eq!(lost.max_concurrent, 1);
        assert_eq!(lost.exclude_extensions, vec!["zip", "avi"]);
        assert!(!lost.is_excluded_extension("rar"));
        assert!(lost.is_excluded_extension("AVI"));
    }

    #[test]
    fn test_invalid_shows_are_isolated() {
        let config = load_config_from_str(CONFIG).unwrap();
        let registry = ShowRegistry::from_config(&config);

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.shows().count(), 2);
        assert!(registry.get("broken").is_none());
        assert!(registry.contains("broken"));

        let err = registry.error_for("broken").unwrap();
        assert!(err.to_string().contains("no destination"));

        let err = registry.error_for("typo").unwrap();
        assert!(err.to_string().contains("{series}"));
        assert!(registry.error_for("dexter").is_none());
    }

    #[test]
    fn test_default_destination_is_used() {
        let config = load_config_from_str(
            r#"
[defaults]
destination = "/tv/{show_name}/{title}"

[shows.fringe]
name = "Fringe"
"#,
        )
        .unwrap();
        let registry = ShowRegistry::from_config(&config);
        let fringe = registry.get("fringe").unwrap();
        assert_eq!(fringe.destination.as_str(), "/tv/{show_name}/{title}");
    }

    #[test]
    fn test_zero_max_concurrent_rejected() {
        let entry = ShowEntry {
            destination: Some("/tv/{title}".to_string()),
            max_concurrent: Some(0),
            ..Default::default()
        };
        let err = ShowConfig::resolve("x", &entry, &ShowDefaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidShow { .. }));
    }
}
