use super::{
    types::{Config, MetadataBackend, TorrentClientBackend},
    ConfigError,
};

/// Validate process-wide configuration.
///
/// Per-show problems are not errors here; they are reported by
/// [`ShowRegistry::from_config`](super::ShowRegistry::from_config) so that one
/// bad show does not stop the others.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let orch = &config.orchestrator;
    if orch.monitor_interval_secs == 0 || orch.discovery_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator intervals must be greater than 0".to_string(),
        ));
    }
    if orch.cleanup_retry_base_secs == 0 || orch.cleanup_retry_base_secs > orch.cleanup_retry_max_secs
    {
        return Err(ConfigError::ValidationError(
            "orchestrator.cleanup_retry_base_secs must be in 1..=cleanup_retry_max_secs".to_string(),
        ));
    }

    if !config.feed.url_template.contains("{show_name}") {
        return Err(ConfigError::ValidationError(
            "feed.url_template must contain {show_name}".to_string(),
        ));
    }

    if let Some(tc) = &config.torrent_client {
        let present = match tc.backend {
            TorrentClientBackend::Transmission => tc.transmission.is_some(),
            TorrentClientBackend::QBittorrent => tc.qbittorrent.is_some(),
        };
        if !present {
            return Err(ConfigError::ValidationError(format!(
                "torrent_client.backend is '{}' but [torrent_client.{}] is missing",
                tc.backend.as_str(),
                tc.backend.as_str()
            )));
        }
    }

    if let Some(metadata) = &config.metadata {
        match metadata.backend {
            MetadataBackend::Tmdb => match &metadata.tmdb {
                Some(tmdb) if !tmdb.api_key.is_empty() => {}
                _ => {
                    return Err(ConfigError::ValidationError(
                        "metadata.backend is 'tmdb' but metadata.tmdb.api_key is missing"
                            .to_string(),
                    ))
                }
            },
        }
    }

    Ok(())
}
