use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub qbittorrent: QbittorrentConfig,
    #[serde(default)]
    pub indexers: Vec<IndexerConfig>,
    #[serde(default)]
    pub search: SearchConfig,
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("fetcharr.db")
}

/// qBittorrent Web API connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QbittorrentConfig {
    /// qBittorrent server URL (e.g., "http://localhost:8080")
    pub url: String,
    pub username: String,
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Category all managed torrents are tagged with
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_timeout() -> u32 {
    30
}

fn default_category() -> String {
    "fetcharr".to_string()
}

/// One configured indexer endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
    pub name: String,
    pub kind: IndexerKind,
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ordering hint, lower wins ties (default: 100)
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u32 {
    100
}

/// Available indexer protocols
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexerKind {
    Jackett,
    Torznab,
}

/// Search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

/// Download destination configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    /// Where the torrent client writes incoming data
    pub save_path: String,
    /// Library root for movie folders
    pub movies_root: String,
    /// Library root for series folders
    pub tv_root: String,
    /// Minimum free space that must remain after a download (default: 5 GiB)
    #[serde(default = "default_min_free_space")]
    pub min_free_space_bytes: u64,
    /// Whether new downloads are imported automatically on completion
    #[serde(default = "default_true")]
    pub auto_import: bool,
}

fn default_min_free_space() -> u64 {
    5 * 1024 * 1024 * 1024
}

/// Worker poll intervals
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(default = "default_progress_interval")]
    pub progress_interval_secs: u64,
    #[serde(default = "default_import_interval")]
    pub import_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            progress_interval_secs: default_progress_interval(),
            import_interval_secs: default_import_interval(),
        }
    }
}

fn default_progress_interval() -> u64 {
    5
}

fn default_import_interval() -> u64 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub database: DatabaseConfig,
    pub qbittorrent: SanitizedQbittorrentConfig,
    pub indexers: Vec<SanitizedIndexerConfig>,
    pub search: SearchConfig,
    pub downloads: DownloadsConfig,
    pub workers: WorkerConfig,
}

/// Sanitized qBittorrent config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQbittorrentConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
    pub category: String,
}

/// Sanitized indexer config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedIndexerConfig {
    pub name: String,
    pub kind: IndexerKind,
    pub url: String,
    pub api_key_configured: bool,
    pub enabled: bool,
    pub priority: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            database: config.database.clone(),
            qbittorrent: SanitizedQbittorrentConfig {
                url: config.qbittorrent.url.clone(),
                username: config.qbittorrent.username.clone(),
                password_configured: !config.qbittorrent.password.is_empty(),
                timeout_secs: config.qbittorrent.timeout_secs,
                category: config.qbittorrent.category.clone(),
            },
            indexers: config
                .indexers
                .iter()
                .map(|i| SanitizedIndexerConfig {
                    name: i.name.clone(),
                    kind: i.kind,
                    url: i.url.clone(),
                    api_key_configured: !i.api_key.is_empty(),
                    enabled: i.enabled,
                    priority: i.priority,
                })
                .collect(),
            search: config.search.clone(),
            downloads: config.downloads.clone(),
            workers: config.workers.clone(),
        }
    }
}
