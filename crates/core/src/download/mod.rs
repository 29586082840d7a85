//! Download record entity and storage.
//!
//! A `DownloadRecord` tracks one torrent through its lifecycle from Queued to
//! Imported, correlated with the external client by info hash.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteDownloadStore;
pub use store::{DownloadStore, StoreError};
pub use types::{DownloadRecord, DownloadState, MediaKind};
