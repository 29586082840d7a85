//! Jackett indexer backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::IndexerConfig;

use super::release::ReleaseQuality;
use super::types::{episode_query, movie_query};
use super::{Indexer, IndexerError, SearchResult};

/// One configured Jackett endpoint, queried through its aggregate JSON
/// results API.
pub struct JackettIndexer {
    client: Client,
    config: IndexerConfig,
}

impl JackettIndexer {
    pub fn new(config: IndexerConfig, timeout_secs: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn build_url(&self, query: &str) -> String {
        format!(
            "{}/api/v2.0/indexers/all/results?apikey={}&Query={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&self.config.api_key),
            urlencoding::encode(query)
        )
    }

    async fn query(&self, query: &str) -> Result<Vec<SearchResult>, IndexerError> {
        let url = self.build_url(query);
        debug!(indexer = %self.config.name, query = %query, "Searching Jackett");

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

        let results = parse_jackett_body(&body, &self.config.name)?;
        debug!(
            indexer = %self.config.name,
            results = results.len(),
            "Jackett search complete"
        );
        Ok(results)
    }
}

#[async_trait]
impl Indexer for JackettIndexer {
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

/// Parse a Jackett aggregate results body into normalized search results.
pub(super) fn parse_jackett_body(
    body: &str,
    indexer: &str,
) -> Result<Vec<SearchResult>, IndexerError> {
    let response: JackettResponse = serde_json::from_str(body)
        .map_err(|e| IndexerError::InvalidResponse(e.to_string()))?;

    Ok(response
        .Results
        .into_iter()
        .map(|r| {
            let quality = ReleaseQuality::from_title(&r.Title);
            let mut result = SearchResult {
                title: r.Title,
                magnet_uri: r.MagnetUri.filter(|m| !m.is_empty()),
                download_url: r.Link.filter(|l| !l.is_empty()),
                info_hash: r.InfoHash,
                size_bytes: r.Size.unwrap_or(0).max(0) as u64,
                seeders: r.Seeders.unwrap_or(0).max(0) as u32,
                leechers: r
                    .Peers
                    .unwrap_or(0)
                    .saturating_sub(r.Seeders.unwrap_or(0))
                    .max(0) as u32,
                quality,
                indexer: indexer.to_string(),
                publish_date: r.PublishDate.and_then(|d| parse_feed_date(&d)),
            };
            result.normalize_locators();
            result
        })
        .collect())
}

/// Parse the ISO-ish dates Jackett and Torznab feeds emit.
pub(super) fn parse_feed_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            DateTime::parse_from_rfc2822(date_str)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

// Jackett API response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResponse {
    Results: Vec<JackettResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResult {
    Title: String,
    MagnetUri: Option<String>,
    Link: Option<String>,
    InfoHash: Option<String>,
    Size: Option<i64>,
    Seeders: Option<i32>,
    Peers: Option<i32>,
    PublishDate: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_jackett_body() {
        let body = r#"{
            "Results": [
                {
                    "Title": "Show.S01E02.1080p.WEB-DL.x264",
                    "MagnetUri": "magnet:?xt=urn:btih:AABB",
                    "Link": "http://jackett/dl/1",
                    "InfoHash": "AABB",
                    "Size": 1500000000,
                    "Seeders": 42,
                    "Peers": 50,
                    "PublishDate": "2024-06-15T10:30:00Z"
                }
            ]
        }"#;

        let results = parse_jackett_body(body, "rarbg").unwrap();
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.info_hash.as_deref(), Some("aabb"));
        assert_eq!(r.seeders, 42);
        assert_eq!(r.leechers, 8);
        assert_eq!(r.indexer, "rarbg");
        assert_eq!(r.quality.resolution.as_deref(), Some("1080p"));
        assert_eq!(r.publish_date.unwrap().year(), 2024);
    }

    #[test]
    fn test_parse_jackett_body_empty_magnet_dropped() {
        let body = r#"{
            "Results": [
                {
                    "Title": "X",
                    "MagnetUri": "",
                    "Link": "http://jackett/dl/2",
                    "InfoHash": null,
                    "Size": 100,
                    "Seeders": 1,
                    "Peers": 1,
                    "PublishDate": null
                }
            ]
        }"#;

        let results = parse_jackett_body(body, "t").unwrap();
        assert!(results[0].magnet_uri.is_none());
        assert_eq!(results[0].locator(), Some("http://jackett/dl/2"));
    }

    #[test]
    fn test_parse_jackett_body_invalid_json() {
        assert!(matches!(
            parse_jackett_body("<rss/>", "t"),
            Err(IndexerError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_feed_date_formats() {
        assert!(parse_feed_date("2024-06-15T10:30:00Z").is_some());
        assert!(parse_feed_date("2024-06-15T10:30:00+02:00").is_some());
        assert!(parse_feed_date("Sat, 15 Jun 2024 10:30:00 +0000").is_some());
        assert!(parse_feed_date("2024-06-15T10:30:00").is_some());
        assert!(parse_feed_date("nope").is_none());
    }

    #[test]
    fn test_build_url() {
        let indexer = JackettIndexer::new(
            IndexerConfig {
                name: "jackett".to_string(),
                kind: crate::config::IndexerKind::Jackett,
                url: "http://localhost:9117/".to_string(),
                api_key: "key".to_string(),
                enabled: true,
                priority: 1,
            },
            30,
        );
        let url = indexer.build_url("some show");
        assert!(url.starts_with("http://localhost:9117/api/v2.0/indexers/all/results"));
        assert!(url.contains("apikey=key"));
        assert!(url.contains("Query=some%20show"));
    }
}
