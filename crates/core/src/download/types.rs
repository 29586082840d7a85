//! Core download record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a download record.
///
/// State machine flow:
/// ```text
/// Queued -> Downloading -> {Completed | Seeding} -> Importing -> Imported
///
/// Paused is reachable from Queued/Downloading and returns to Downloading
/// on resume. Error is reachable from any non-terminal state.
/// Importing and Imported are sticky: reconciliation never regresses them.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Waiting for the external client to start transferring.
    Queued,
    /// Actively transferring from peers.
    Downloading,
    /// Paused in the external client.
    Paused,
    /// All bytes downloaded, not yet imported.
    Completed,
    /// Download finished, still uploading to peers.
    Seeding,
    /// Library import in progress.
    Importing,
    /// Files placed in the library (terminal).
    Imported,
    /// Failed (terminal).
    Error,
}

impl DownloadState {
    /// Returns the string representation for API responses and filtering.
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadState::Queued => "queued",
            DownloadState::Downloading => "downloading",
            DownloadState::Paused => "paused",
            DownloadState::Completed => "completed",
            DownloadState::Seeding => "seeding",
            DownloadState::Importing => "importing",
            DownloadState::Imported => "imported",
            DownloadState::Error => "error",
        }
    }

    /// States the reconciliation worker polls the external client for.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DownloadState::Queued
                | DownloadState::Downloading
                | DownloadState::Paused
                | DownloadState::Seeding
        )
    }

    /// Sticky states owned by the import pipeline. External reconciliation
    /// must never overwrite these.
    pub fn is_import_locked(&self) -> bool {
        matches!(self, DownloadState::Importing | DownloadState::Imported)
    }
}

/// The media item a download belongs to. Exactly one branch is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaKind {
    /// A single TV episode.
    Episode {
        series_id: i64,
        series_name: String,
        season: u32,
        episode: u32,
    },
    /// A movie.
    Movie { movie_id: i64, title: String },
}

impl MediaKind {
    /// Returns the media kind as a string (for filtering and events).
    pub fn kind_str(&self) -> &'static str {
        match self {
            MediaKind::Episode { .. } => "episode",
            MediaKind::Movie { .. } => "movie",
        }
    }

    /// Display name of the owning media item.
    pub fn display_name(&self) -> &str {
        match self {
            MediaKind::Episode { series_name, .. } => series_name,
            MediaKind::Movie { title, .. } => title,
        }
    }
}

/// A tracked download, correlated with the external torrent client by hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Unique identifier (UUID), assigned at creation. Immutable.
    pub id: String,
    /// Torrent info hash (lowercase hex), extracted from the locator at
    /// add-time. Immutable; the correlation key against the external client.
    pub hash: String,
    /// The owning media item.
    pub media: MediaKind,
    /// Current lifecycle state.
    pub state: DownloadState,

    /// Download progress (0.0 - 100.0).
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
    /// Estimated seconds remaining (None when unknown or complete).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<u64>,

    /// Save directory handed to the external client.
    pub save_path: String,
    /// Resolved content path on disk, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<String>,

    /// When the record was created. Set once.
    pub added_at: DateTime<Utc>,
    /// First transition into Completed/Seeding. Write-once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// First transition into Imported. Write-once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,

    /// User that started the download.
    pub user: String,
    /// Indexer the release came from.
    pub indexer: String,
    /// Whether the import worker should pick this record up on completion.
    pub auto_import: bool,

    /// Human-readable failure detail, populated only when state is Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DownloadRecord {
    /// Create a fresh record in Queued state.
    pub fn new(
        hash: impl Into<String>,
        media: MediaKind,
        save_path: impl Into<String>,
        user: impl Into<String>,
        indexer: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            hash: hash.into().to_lowercase(),
            media,
            state: DownloadState::Queued,
            progress: 0.0,
            size_bytes: 0,
            downloaded_bytes: 0,
            download_rate: 0,
            upload_rate: 0,
            seeders: 0,
            leechers: 0,
            eta_secs: None,
            save_path: save_path.into(),
            content_path: None,
            added_at: Utc::now(),
            completed_at: None,
            imported_at: None,
            user: user.into(),
            indexer: indexer.into(),
            auto_import: false,
            error_message: None,
        }
    }

    /// Set the auto-import flag.
    pub fn with_auto_import(mut self, auto_import: bool) -> Self {
        self.auto_import = auto_import;
        self
    }

    /// True when the import worker may claim this record.
    pub fn is_pending_import(&self) -> bool {
        self.state == DownloadState::Completed && self.auto_import && self.imported_at.is_none()
    }

    /// Transition to Error with a message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = DownloadState::Error;
        self.error_message = Some(message.into());
    }
}
