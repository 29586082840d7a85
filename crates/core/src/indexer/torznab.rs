//! Torznab feed indexer backend.
//!
//! Torznab endpoints nominally return XML RSS feeds, but several
//! implementations (and Jackett's Torznab shim in some configurations) answer
//! with the JSON results shape instead. The response body is format-sniffed
//! and parsed accordingly.

use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use reqwest::Client;
use tracing::debug;

use crate::config::IndexerConfig;

use super::jackett::{parse_feed_date, parse_jackett_body};
use super::release::ReleaseQuality;
use super::types::{episode_query, movie_query};
use super::{Indexer, IndexerError, SearchResult};

pub struct TorznabIndexer {
    client: Client,
    config: IndexerConfig,
}

impl TorznabIndexer {
    pub fn new(config: IndexerConfig, timeout_secs: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn build_url(&self, query: &str) -> String {
        format!(
            "{}/api?apikey={}&t=search&q={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&self.config.api_key),
            urlencoding::encode(query)
        )
    }

    async fn query(&self, query: &str) -> Result<Vec<SearchResult>, IndexerError> {
        let url = self.build_url(query);
        debug!(indexer = %self.config.name, query = %query, "Searching Torznab feed");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                IndexerError::Timeout
            } else if e.is_connect() {
                IndexerError::ConnectionFailed(e.to_string())
            } else {
                IndexerError::ApiError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IndexerError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| IndexerError::ApiError(e.to_string()))?;

        let results = parse_torznab_body(&body, &self.config.name)?;
        debug!(
            indexer = %self.config.name,
            results = results.len(),
            "Torznab search complete"
        );
        Ok(results)
    }
}

#[async_trait]
impl Indexer for TorznabIndexer {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn priority(&self) -> u32 {
        self.config.priority
    }

    async fn search_episode(
        &self,
        series_name: &str,
        season: u32,
        episode: u32,
    ) -> Result<Vec<SearchResult>, IndexerError> {
        self.query(&episode_query(series_name, season, episode))
            .await
    }

    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchResult>, IndexerError> {
        self.query(&movie_query(title, year)).await
    }

    async fn search_raw(&self, query: &str) -> Result<Vec<SearchResult>, IndexerError> {
        self.query(query).await
    }

    async fn test_connection(&self) -> Result<(), IndexerError> {
        self.query("test").await.map(|_| ())
    }
}

/// Sniff the body format and dispatch to the right parser.
pub(super) fn parse_torznab_body(
    body: &str,
    indexer: &str,
) -> Result<Vec<SearchResult>, IndexerError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        parse_torznab_xml(body, indexer)
    } else {
        parse_jackett_body(body, indexer)
    }
}

fn parse_torznab_xml(body: &str, indexer: &str) -> Result<Vec<SearchResult>, IndexerError> {
    let item_re = Regex::new(r"(?s)<item>(.*?)</item>")
        .map_err(|e| IndexerError::InvalidResponse(e.to_string()))?;

    let mut results = Vec::new();
    for cap in item_re.captures_iter(body) {
        let item = &cap[1];
        let title = match extract_tag(item, "title") {
            Some(t) => t,
            None => continue,
        };

        let seeders = extract_torznab_attr(item, "seeders")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let peers = extract_torznab_attr(item, "peers")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let size_bytes = extract_tag(item, "size")
            .and_then(|v| v.parse::<u64>().ok())
            .or_else(|| {
                extract_torznab_attr(item, "size").and_then(|v| v.parse::<u64>().ok())
            })
            .unwrap_or(0);

        let quality = ReleaseQuality::from_title(&title);
        let mut result = SearchResult {
            title,
            magnet_uri: extract_torznab_attr(item, "magneturl"),
            download_url: extract_enclosure_url(item).or_else(|| extract_tag(item, "link")),
            info_hash: extract_torznab_attr(item, "infohash"),
            size_bytes,
            seeders,
            leechers: peers.saturating_sub(seeders),
            quality,
            indexer: indexer.to_string(),
            publish_date: extract_tag(item, "pubDate").and_then(|d| parse_feed_date(&d)),
        };
        result.normalize_locators();
        results.push(result);
    }

    Ok(results)
}

fn extract_tag(item: &str, tag: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?s)<{0}[^>]*>(.*?)</{0}>", tag)).ok()?;
    re.captures(item)
        .map(|c| unescape_xml(c[1].trim()))
        .filter(|v| !v.is_empty())
}

fn extract_torznab_attr(item: &str, name: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r#"<torznab:attr\s+name="{}"\s+value="([^"]*)""#,
        name
    ))
    .ok()?;
    re.captures(item)
        .map(|c| unescape_xml(&c[1]))
        .filter(|v| !v.is_empty())
}

fn extract_enclosure_url(item: &str) -> Option<String> {
    let re = Regex::new(r#"<enclosure\s+url="([^"]*)""#).ok()?;
    re.captures(item)
        .map(|c| unescape_xml(&c[1]))
        .filter(|v| !v.is_empty())
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("<![CDATA[", "")
        .replace("]]>", "")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:torznab="http://torznab.com/schemas/2015/feed">
  <channel>
    <title>Indexer</title>
    <item>
      <title>Show.S01E02.720p.HDTV.x264</title>
      <link>http://indexer/dl/1.torrent</link>
      <pubDate>Sat, 15 Jun 2024 10:30:00 +0000</pubDate>
      <size>734003200</size>
      <enclosure url="http://indexer/dl/1.torrent" type="application/x-bittorrent" />
      <torznab:attr name="seeders" value="15" />
      <torznab:attr name="peers" value="20" />
      <torznab:attr name="infohash" value="CCDD" />
      <torznab:attr name="magneturl" value="magnet:?xt=urn:btih:CCDD" />
    </item>
    <item>
      <title><![CDATA[Other Show S02E05 1080p]]></title>
      <enclosure url="http://indexer/dl/2.torrent" type="application/x-bittorrent" />
      <torznab:attr name="seeders" value="3" />
      <torznab:attr name="peers" value="3" />
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_xml_feed() {
        let results = parse_torznab_body(FEED, "nyaa").unwrap();
        assert_eq!(results.len(), 2);

        let r = &results[0];
        assert_eq!(r.title, "Show.S01E02.720p.HDTV.x264");
        assert_eq!(r.info_hash.as_deref(), Some("ccdd"));
        assert_eq!(r.magnet_uri.as_deref(), Some("magnet:?xt=urn:btih:CCDD"));
        assert_eq!(r.download_url.as_deref(), Some("http://indexer/dl/1.torrent"));
        assert_eq!(r.size_bytes, 734003200);
        assert_eq!(r.seeders, 15);
        assert_eq!(r.leechers, 5);
        assert_eq!(r.quality.resolution.as_deref(), Some("720p"));
        assert!(r.publish_date.is_some());
    }

    #[test]
    fn test_parse_xml_cdata_title() {
        let results = parse_torznab_body(FEED, "nyaa").unwrap();
        let r = &results[1];
        assert_eq!(r.title, "Other Show S02E05 1080p");
        assert!(r.magnet_uri.is_none());
        assert_eq!(r.locator(), Some("http://indexer/dl/2.torrent"));
        assert_eq!(r.leechers, 0);
    }

    #[test]
    fn test_sniffs_json_body() {
        let body = r#"{"Results": [{"Title": "X", "MagnetUri": "magnet:?xt=urn:btih:ee",
            "Link": null, "InfoHash": "EE", "Size": 10, "Seeders": 2, "Peers": 4,
            "PublishDate": null}]}"#;
        let results = parse_torznab_body(body, "shim").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].info_hash.as_deref(), Some("ee"));
        assert_eq!(results[0].indexer, "shim");
    }

    #[test]
    fn test_empty_feed() {
        let body = r#"<?xml version="1.0"?><rss><channel></channel></rss>"#;
        let results = parse_torznab_body(body, "x").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape_xml("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(unescape_xml("<![CDATA[Raw]]>"), "Raw");
    }
}
