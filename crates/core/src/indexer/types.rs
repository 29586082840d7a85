//! Indexer contract and search result types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::release::ReleaseQuality;

/// Errors from a single indexer query.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Indexer API error: {0}")]
    ApiError(String),

    #[error("Unparseable response: {0}")]
    InvalidResponse(String),
}

/// A single release candidate returned by an indexer search.
///
/// Ephemeral: results live only for the duration of a search round trip and
/// are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub magnet_uri: Option<String>,
    pub download_url: Option<String>,
    /// Lowercase info hash, when the indexer reports one.
    pub info_hash: Option<String>,
    pub size_bytes: u64,
    pub seeders: u32,
    pub leechers: u32,
    pub quality: ReleaseQuality,
    /// Name of the indexer that produced this result.
    pub indexer: String,
    pub publish_date: Option<DateTime<Utc>>,
}

impl SearchResult {
    /// The string handed to the torrent client: magnet when present,
    /// otherwise the indexer's download URL.
    pub fn locator(&self) -> Option<&str> {
        self.magnet_uri
            .as_deref()
            .or(self.download_url.as_deref())
    }

    /// Some upstream feeds put the magnet URI in the link field and vice
    /// versa. Swap the two when the scheme says they are crossed, so every
    /// consumer downstream can trust the field names.
    pub fn normalize_locators(&mut self) {
        let magnet_is_magnet = self
            .magnet_uri
            .as_deref()
            .map(|m| m.starts_with("magnet:"))
            .unwrap_or(true);
        let url_is_magnet = self
            .download_url
            .as_deref()
            .map(|u| u.starts_with("magnet:"))
            .unwrap_or(false);

        if !magnet_is_magnet && url_is_magnet {
            std::mem::swap(&mut self.magnet_uri, &mut self.download_url);
        } else if !magnet_is_magnet {
            // Magnet field holds a plain URL and the link field is empty or
            // also non-magnet: demote it.
            if self.download_url.is_none() {
                self.download_url = self.magnet_uri.take();
            } else {
                self.magnet_uri = None;
            }
        }
        if let Some(hash) = &self.info_hash {
            if hash.is_empty() {
                self.info_hash = None;
            } else {
                self.info_hash = Some(hash.to_lowercase());
            }
        }
    }
}

/// A search backend: one configured indexer endpoint.
#[async_trait]
pub trait Indexer: Send + Sync {
    fn name(&self) -> &str;

    fn enabled(&self) -> bool;

    /// Ordering hint for the aggregator; lower wins ties.
    fn priority(&self) -> u32;

    async fn search_episode(
        &self,
        series_name: &str,
        season: u32,
        episode: u32,
    ) -> Result<Vec<SearchResult>, IndexerError>;

    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchResult>, IndexerError>;

    async fn search_raw(&self, query: &str) -> Result<Vec<SearchResult>, IndexerError>;

    /// Issue a minimal query to verify the endpoint is reachable and the API
    /// key is accepted.
    async fn test_connection(&self) -> Result<(), IndexerError>;
}

/// Standard query text for an episode search: "Name S01E02".
pub fn episode_query(series_name: &str, season: u32, episode: u32) -> String {
    format!("{} S{:02}E{:02}", series_name, season, episode)
}

/// Standard query text for a movie search: title plus year when known.
pub fn movie_query(title: &str, year: Option<u16>) -> String {
    match year {
        Some(y) => format!("{} {}", title, y),
        None => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(magnet: Option<&str>, url: Option<&str>) -> SearchResult {
        SearchResult {
            title: "Test".to_string(),
            magnet_uri: magnet.map(String::from),
            download_url: url.map(String::from),
            info_hash: None,
            size_bytes: 0,
            seeders: 0,
            leechers: 0,
            quality: ReleaseQuality::default(),
            indexer: "test".to_string(),
            publish_date: None,
        }
    }

    #[test]
    fn test_locator_prefers_magnet() {
        let r = result(Some("magnet:?xt=urn:btih:abc"), Some("http://x/dl"));
        assert_eq!(r.locator(), Some("magnet:?xt=urn:btih:abc"));
    }

    #[test]
    fn test_locator_falls_back_to_url() {
        let r = result(None, Some("http://x/dl"));
        assert_eq!(r.locator(), Some("http://x/dl"));
    }

    #[test]
    fn test_normalize_swaps_crossed_fields() {
        let mut r = result(Some("http://x/dl"), Some("magnet:?xt=urn:btih:abc"));
        r.normalize_locators();
        assert_eq!(r.magnet_uri.as_deref(), Some("magnet:?xt=urn:btih:abc"));
        assert_eq!(r.download_url.as_deref(), Some("http://x/dl"));
    }

    #[test]
    fn test_normalize_demotes_plain_url_in_magnet_field() {
        let mut r = result(Some("http://x/dl"), None);
        r.normalize_locators();
        assert!(r.magnet_uri.is_none());
        assert_eq!(r.download_url.as_deref(), Some("http://x/dl"));
    }

    #[test]
    fn test_normalize_lowercases_hash() {
        let mut r = result(Some("magnet:?xt=urn:btih:ABC"), None);
        r.info_hash = Some("ABCDEF".to_string());
        r.normalize_locators();
        assert_eq!(r.info_hash.as_deref(), Some("abcdef"));
    }

    #[test]
    fn test_normalize_drops_empty_hash() {
        let mut r = result(None, Some("http://x"));
        r.info_hash = Some(String::new());
        r.normalize_locators();
        assert!(r.info_hash.is_none());
    }

    #[test]
    fn test_episode_query_zero_pads() {
        assert_eq!(episode_query("Show", 1, 2), "Show S01E02");
        assert_eq!(episode_query("Show", 12, 34), "Show S12E34");
    }

    #[test]
    fn test_movie_query() {
        assert_eq!(movie_query("Film", Some(1999)), "Film 1999");
        assert_eq!(movie_query("Film", None), "Film");
    }
}
