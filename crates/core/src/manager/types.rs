//! Download manager error taxonomy.

use thiserror::Error;

use crate::client::TorrentClientError;
use crate::download::StoreError;
use crate::library::LibraryError;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Download already exists: {0}")]
    Conflict(String),

    #[error("Torrent client unavailable: {0}")]
    ExternalUnavailable(String),

    #[error("Torrent client rejected the request: {0}")]
    ExternalRejected(String),

    #[error("Insufficient disk space: need {needed} bytes, {available} available")]
    InsufficientSpace { needed: u64, available: u64 },

    #[error("Invalid state for this operation: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for DownloadError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => DownloadError::NotFound(id),
            other => DownloadError::Internal(other.to_string()),
        }
    }
}

impl From<TorrentClientError> for DownloadError {
    fn from(e: TorrentClientError) -> Self {
        if e.is_unavailable() {
            DownloadError::ExternalUnavailable(e.to_string())
        } else {
            DownloadError::ExternalRejected(e.to_string())
        }
    }
}

impl From<LibraryError> for DownloadError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::SeriesNotFound(_) | LibraryError::MovieNotFound(_) => {
                DownloadError::NotFound(e.to_string())
            }
            LibraryError::RescanFailed(msg) => DownloadError::Internal(msg),
        }
    }
}
