//! Media library collaborator contract.
//!
//! The acquisition core does not own the media catalog; it asks the library
//! for series/movie identity and paths, and tells it to rescan a folder after
//! an import lands files there.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Series not found: {0}")]
    SeriesNotFound(i64),

    #[error("Movie not found: {0}")]
    MovieNotFound(i64),

    #[error("Rescan failed: {0}")]
    RescanFailed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRef {
    pub id: i64,
    pub title: String,
    /// Root folder of the series inside the library.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieRef {
    pub id: i64,
    pub title: String,
    pub year: Option<u16>,
    pub path: String,
}

#[async_trait]
pub trait MediaLibrary: Send + Sync {
    async fn series(&self, id: i64) -> Result<SeriesRef, LibraryError>;

    async fn movie(&self, id: i64) -> Result<MovieRef, LibraryError>;

    /// Ask the library to pick up new files under `path`.
    async fn rescan(&self, path: &str) -> Result<(), LibraryError>;
}
