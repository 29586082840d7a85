//! Download record storage trait.

use async_trait::async_trait;
use thiserror::Error;

use super::{DownloadRecord, DownloadState};

/// Errors from download store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("download record not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt record {id}: {detail}")]
    Corrupt { id: String, detail: String },
}

/// Trait for download record storage backends.
///
/// Updates to the same record id are serialized by the backend; updates to
/// distinct records must not observe each other's partial state. Persisted
/// records survive process restart.
#[async_trait]
pub trait DownloadStore: Send + Sync {
    /// Persist a new record. The record keeps its id and added_at if already
    /// set, otherwise the store assigns them.
    async fn create(&self, record: DownloadRecord) -> Result<DownloadRecord, StoreError>;

    /// Fetch a record by id.
    async fn get(&self, id: &str) -> Result<Option<DownloadRecord>, StoreError>;

    /// Fetch a record by torrent hash (case-insensitive). A hash may appear
    /// on several records when a release is retried after a failure; the
    /// newest record wins.
    async fn get_by_hash(&self, hash: &str) -> Result<Option<DownloadRecord>, StoreError>;

    /// All records, newest first.
    async fn list_all(&self) -> Result<Vec<DownloadRecord>, StoreError>;

    /// Records in a specific state.
    async fn list_by_state(&self, state: DownloadState) -> Result<Vec<DownloadRecord>, StoreError>;

    /// Records the reconciliation worker tracks
    /// (Queued/Downloading/Paused/Seeding).
    async fn list_active(&self) -> Result<Vec<DownloadRecord>, StoreError>;

    /// The record for an episode association, if any.
    async fn find_episode(
        &self,
        series_id: i64,
        season: u32,
        episode: u32,
    ) -> Result<Vec<DownloadRecord>, StoreError>;

    /// The record(s) for a movie association, if any.
    async fn find_movie(&self, movie_id: i64) -> Result<Vec<DownloadRecord>, StoreError>;

    /// Completed records flagged for auto-import that have not been imported
    /// yet.
    async fn list_pending_import(&self) -> Result<Vec<DownloadRecord>, StoreError>;

    /// Full-replace update of an existing record. Returns the stored record.
    async fn update(&self, record: DownloadRecord) -> Result<DownloadRecord, StoreError>;

    /// Delete a record. Returns the deleted record.
    async fn delete(&self, id: &str) -> Result<DownloadRecord, StoreError>;
}
