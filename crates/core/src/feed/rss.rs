//! RSS feed source.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::FeedConfig;

use super::{FeedEntry, FeedError, FeedSource};

/// Feed source that fills a URL template and parses the RSS response.
///
/// The template may contain `{show_name}`, `{quality}` and `{season}`; each
/// value is URL-encoded before substitution.
pub struct RssFeedSource {
    client: Client,
    url_template: String,
}

impl RssFeedSource {
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            url_template: config.url_template.clone(),
        })
    }

    /// Build the feed URL for one show/season page.
    pub fn feed_url(&self, show_query: &str, quality: &str, season: u32) -> String {
        self.url_template
            .replace("{show_name}", &urlencoding::encode(show_query))
            .replace("{quality}", &urlencoding::encode(quality))
            .replace("{season}", &season.to_string())
    }
}

#[derive(Default)]
struct ItemBuilder {
    link: String,
    description: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Link,
    Description,
    Other,
}

/// Parse RSS XML into feed entries, in document order.
///
/// Items without a link or description are dropped.
pub fn parse_rss(content: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    let mut field = Field::Other;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"item" => current = Some(ItemBuilder::default()),
                b"link" => field = Field::Link,
                b"description" => field = Field::Description,
                _ => field = Field::Other,
            },
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        if item.link.is_empty() || item.description.is_empty() {
                            debug!("Dropping feed item without link or description");
                        } else {
                            entries.push(FeedEntry::new(item.link, item.description));
                        }
                    }
                }
                field = Field::Other;
            }
            Ok(Event::Text(ref e)) => {
                if let Some(item) = current.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|err| FeedError::Parse(err.to_string()))?;
                    match field {
                        Field::Link => item.link.push_str(&text),
                        Field::Description => item.description.push_str(&text),
                        Field::Other => {}
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(item) = current.as_mut() {
                    let text = String::from_utf8_lossy(e.as_ref());
                    match field {
                        Field::Link => item.link.push_str(&text),
                        Field::Description => item.description.push_str(&text),
                        Field::Other => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FeedError::Parse(format!(
                    "at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(entries)
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn name(&self) -> &str {
        "rss"
    }

    async fn fetch(
        &self,
        show_query: &str,
        quality: &str,
        season: u32,
    ) -> Result<Vec<FeedEntry>, FeedError> {
        let url = self.feed_url(show_query, quality, season);
        debug!(url = %url, show = %show_query, season, "Fetching feed page");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Feed returned error status");
            return Err(FeedError::Status(status.as_u16()));
        }

        let content = response.text().await?;
        let entries = parse_rss(&content)?;
        debug!(show = %show_query, season, count = entries.len(), "Parsed feed page");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>ezRSS - Search Results</title>
    <link>http://ezrss.it/</link>
    <description>Custom RSS feed</description>
    <item>
      <title><![CDATA[Dexter 5x02 [HDTV - LOL]]]></title>
      <link>http://torrent.example/dexter.s05e02.torrent</link>
      <description><![CDATA[Show Name: Dexter; Episode Title: Hello, Bandit; Season: 5; Episode: 2]]></description>
    </item>
    <item>
      <title>Dexter 5x01</title>
      <link>http://torrent.example/dexter.s05e01.torrent?a=1&amp;b=2</link>
      <description>Show Name: Dexter; Episode Title: My Bad; Season: 5; Episode: 1</description>
    </item>
    <item>
      <title>No link here</title>
      <description>Show Name: Dexter; Season: 5; Episode: 3</description>
    </item>
  </channel>
</rss>"#;

    fn source(template: &str) -> RssFeedSource {
        RssFeedSource::new(&FeedConfig {
            url_template: template.to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_rss_items_in_order() {
        let entries = parse_rss(SAMPLE).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].link, "http://torrent.example/dexter.s05e02.torrent");
        assert_eq!(
            entries[0].summary,
            "Show Name: Dexter; Episode Title: Hello, Bandit; Season: 5; Episode: 2"
        );
        assert_eq!(
            entries[1].link,
            "http://torrent.example/dexter.s05e01.torrent?a=1&b=2"
        );
    }

    #[test]
    fn test_channel_fields_are_not_items() {
        let entries = parse_rss(SAMPLE).unwrap();
        assert!(entries.iter().all(|e| e.link != "http://ezrss.it/"));
    }

    #[test]
    fn test_parse_empty_channel() {
        let entries = parse_rss("<rss><channel><title>x</title></channel></rss>").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_parse_malformed_xml() {
        let result = parse_rss("<rss><channel><item><link>a</link></item></rss>");
        assert!(matches!(result, Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_feed_url_encodes_values() {
        let rss = source(
            "http://feed.example/?show={show_name}&q={quality}&s={season}",
        );
        assert_eq!(
            rss.feed_url("Law & Order", "720p HDTV", 3),
            "http://feed.example/?show=Law%20%26%20Order&q=720p%20HDTV&s=3"
        );
    }

    #[test]
    fn test_default_template() {
        let rss = RssFeedSource::new(&FeedConfig::default()).unwrap();
        assert_eq!(
            rss.feed_url("Dexter", "HDTV", 5),
            "http://ezrss.it/search/?mode=rss&show_name=Dexter&quality=HDTV&season=5"
        );
    }
}
