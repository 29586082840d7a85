//! Types for the external torrent client adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from external client operations.
///
/// `Unreachable` and `AuthenticationFailed` mean the client itself is
/// unavailable; `Rejected` means the client refused the specific command.
/// Callers treat these differently: the reconciliation worker absorbs the
/// former, the manager surfaces the latter.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("client unreachable: {0}")]
    Unreachable(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("command rejected: {0}")]
    Rejected(String),

    #[error("torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("request timeout")]
    Timeout,
}

impl TorrentClientError {
    /// True when the client as a whole is unavailable rather than a single
    /// command having been refused.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            TorrentClientError::Unreachable(_)
                | TorrentClientError::AuthenticationFailed(_)
                | TorrentClientError::Timeout
        )
    }
}

/// Normalized transfer state reported by the external client.
///
/// Concrete adapters map their backend's vocabulary onto this enum once, at
/// the adapter boundary. `Checking` covers post-resume verification,
/// allocation and moving, which the reconciliation worker treats as
/// "keep current state".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Actively transferring down.
    Downloading,
    /// Actively transferring up, or complete and stalled-up.
    Seeding,
    /// Paused in either direction.
    Paused,
    /// Queued, stalled-down, fetching metadata, or pre-transfer checking.
    Queued,
    /// Verifying after resume, allocating, or moving files.
    Checking,
    /// The client reports a torrent-level error.
    Error,
    /// Vocabulary the adapter does not recognize.
    Unknown,
}

impl TorrentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::Downloading => "downloading",
            TorrentState::Seeding => "seeding",
            TorrentState::Paused => "paused",
            TorrentState::Queued => "queued",
            TorrentState::Checking => "checking",
            TorrentState::Error => "error",
            TorrentState::Unknown => "unknown",
        }
    }
}

/// A live torrent entry from the external client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentInfo {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// Normalized state.
    pub state: TorrentState,
    /// Progress fraction (0.0 - 1.0).
    pub progress: f64,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// Downloaded bytes.
    pub downloaded_bytes: u64,
    /// Current download rate in bytes/second.
    pub download_rate: u64,
    /// Current upload rate in bytes/second.
    pub upload_rate: u64,
    /// Connected seeders.
    pub seeders: u32,
    /// Connected leechers.
    pub leechers: u32,
    /// ETA in seconds (None if unknown or complete).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<u64>,
    /// Save directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
    /// Resolved content path on disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<String>,
    /// Category/label assigned in the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Request to add a new torrent.
#[derive(Debug, Clone)]
pub struct AddTorrentRequest {
    /// Magnet URI or .torrent download URL.
    pub locator: String,
    /// Target save directory.
    pub save_path: String,
    /// Category to file the torrent under.
    pub category: String,
}

impl AddTorrentRequest {
    pub fn new(
        locator: impl Into<String>,
        save_path: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            locator: locator.into(),
            save_path: save_path.into(),
            category: category.into(),
        }
    }
}

/// Trait for external torrent client backends.
///
/// The adapter owns the authenticated session; callers never see session
/// expiry, the adapter re-authenticates transparently.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// List live torrents, optionally filtered to one category.
    async fn list_torrents(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError>;

    /// Submit a new torrent by magnet/locator.
    async fn add_torrent(&self, request: AddTorrentRequest) -> Result<(), TorrentClientError>;

    /// Pause a torrent by hash.
    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    /// Resume a paused torrent by hash.
    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    /// Remove a torrent; optionally delete downloaded files.
    async fn delete_torrent(
        &self,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), TorrentClientError>;

    /// Create the category with its save path if it does not exist.
    /// Idempotent: "already exists" is success.
    async fn ensure_category(
        &self,
        name: &str,
        save_path: &str,
    ) -> Result<(), TorrentClientError>;

    /// Connectivity probe.
    async fn probe(&self) -> Result<(), TorrentClientError>;
}
