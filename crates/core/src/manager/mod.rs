//! Download manager: the typed API that turns search results into tracked
//! downloads and drives their lifecycle.

mod paths;
mod types;

pub use paths::{free_space, movie_dir, safe_title, season_dir, stable_media_id};
pub use types::DownloadError;

use std::sync::Arc;

use tracing::{info, warn};

use crate::client::{AddTorrentRequest, TorrentClient, TorrentClientError};
use crate::config::DownloadsConfig;
use crate::download::{DownloadRecord, DownloadState, DownloadStore, MediaKind};
use crate::indexer::SearchResult;
use crate::library::MediaLibrary;

pub struct DownloadManager {
    store: Arc<dyn DownloadStore>,
    client: Arc<dyn TorrentClient>,
    library: Arc<dyn MediaLibrary>,
    config: DownloadsConfig,
    category: String,
}

impl DownloadManager {
    pub fn new(
        store: Arc<dyn DownloadStore>,
        client: Arc<dyn TorrentClient>,
        library: Arc<dyn MediaLibrary>,
        config: DownloadsConfig,
        category: String,
    ) -> Self {
        Self {
            store,
            client,
            library,
            config,
            category,
        }
    }

    /// Start downloading a release for an episode known to the library.
    pub async fn start_episode_download(
        &self,
        result: &SearchResult,
        series_id: i64,
        season: u32,
        episode: u32,
        user: &str,
    ) -> Result<DownloadRecord, DownloadError> {
        let series = self.library.series(series_id).await?;

        let existing = self.store.find_episode(series_id, season, episode).await?;
        if let Some(blocking) = existing.iter().find(|r| blocks_new_download(r)) {
            return Err(DownloadError::Conflict(format!(
                "episode S{:02}E{:02} of '{}' already has download {} ({})",
                season,
                episode,
                series.title,
                blocking.id,
                blocking.state.as_str()
            )));
        }

        let media = MediaKind::Episode {
            series_id,
            series_name: series.title,
            season,
            episode,
        };
        self.add_and_persist(result, media, self.config.save_path.clone(), user)
            .await
    }

    /// Start downloading a release for a movie known to the library.
    pub async fn start_movie_download(
        &self,
        result: &SearchResult,
        movie_id: i64,
        user: &str,
    ) -> Result<DownloadRecord, DownloadError> {
        let movie = self.library.movie(movie_id).await?;

        let existing = self.store.find_movie(movie_id).await?;
        if let Some(blocking) = existing.iter().find(|r| blocks_new_download(r)) {
            return Err(DownloadError::Conflict(format!(
                "movie '{}' already has download {} ({})",
                movie.title,
                blocking.id,
                blocking.state.as_str()
            )));
        }

        let media = MediaKind::Movie {
            movie_id,
            title: movie.title,
        };
        self.add_and_persist(result, media, self.config.save_path.clone(), user)
            .await
    }

    /// Start a download for a movie discovered outside the library. The
    /// destination folder is derived from the library root and the media id
    /// from the external catalog id, so retries converge on the same record.
    pub async fn start_discovery_movie(
        &self,
        result: &SearchResult,
        catalog_id: &str,
        title: &str,
        year: Option<u16>,
        user: &str,
    ) -> Result<DownloadRecord, DownloadError> {
        let movie_id = stable_media_id("movie", catalog_id);

        let existing = self.store.find_movie(movie_id).await?;
        if let Some(blocking) = existing.iter().find(|r| blocks_new_download(r)) {
            return Err(DownloadError::Conflict(format!(
                "movie '{}' already has download {} ({})",
                title,
                blocking.id,
                blocking.state.as_str()
            )));
        }

        let dest = movie_dir(&self.config.movies_root, title, year);
        self.check_free_space(&self.config.movies_root, result.size_bytes)?;

        let media = MediaKind::Movie {
            movie_id,
            title: title.to_string(),
        };
        self.add_and_persist(result, media, dest, user).await
    }

    /// Start a download for an episode of a series discovered outside the
    /// library.
    pub async fn start_discovery_episode(
        &self,
        result: &SearchResult,
        catalog_id: &str,
        series_name: &str,
        season: u32,
        episode: u32,
        user: &str,
    ) -> Result<DownloadRecord, DownloadError> {
        let series_id = stable_media_id("series", catalog_id);

        let existing = self.store.find_episode(series_id, season, episode).await?;
        if let Some(blocking) = existing.iter().find(|r| blocks_new_download(r)) {
            return Err(DownloadError::Conflict(format!(
                "episode S{:02}E{:02} of '{}' already has download {} ({})",
                season,
                episode,
                series_name,
                blocking.id,
                blocking.state.as_str()
            )));
        }

        let dest = season_dir(&self.config.tv_root, series_name, season);
        self.check_free_space(&self.config.tv_root, result.size_bytes)?;

        let media = MediaKind::Episode {
            series_id,
            series_name: series_name.to_string(),
            season,
            episode,
        };
        self.add_and_persist(result, media, dest, user).await
    }

    /// Shared tail of every start operation: hash extraction, category setup,
    /// hand-off to the client, then persistence. The hash is resolved before
    /// the client sees the torrent so a failure here leaves no orphan on
    /// either side.
    async fn add_and_persist(
        &self,
        result: &SearchResult,
        media: MediaKind,
        save_path: String,
        user: &str,
    ) -> Result<DownloadRecord, DownloadError> {
        let locator = result.locator().ok_or_else(|| {
            DownloadError::Internal(format!("release '{}' has no usable locator", result.title))
        })?;

        let hash = match &result.info_hash {
            Some(h) if !h.is_empty() => h.to_lowercase(),
            _ => extract_hash(locator).ok_or_else(|| {
                DownloadError::Internal(format!(
                    "cannot determine info hash for release '{}'",
                    result.title
                ))
            })?,
        };

        self.client
            .ensure_category(&self.category, &save_path)
            .await?;
        self.client
            .add_torrent(AddTorrentRequest::new(locator, &save_path, &self.category))
            .await?;

        let mut record = DownloadRecord::new(
            hash,
            media,
            save_path,
            user.to_string(),
            result.indexer.clone(),
        )
        .with_auto_import(self.config.auto_import);
        record.size_bytes = result.size_bytes;
        record.seeders = result.seeders;
        record.leechers = result.leechers;

        let record = self.store.create(record).await?;
        info!(
            id = %record.id,
            hash = %record.hash,
            media = %record.media.display_name(),
            "Download started"
        );
        Ok(record)
    }

    fn check_free_space(&self, path: &str, torrent_size: u64) -> Result<(), DownloadError> {
        let needed = self.config.min_free_space_bytes.saturating_add(torrent_size);
        match free_space(path) {
            Some(available) if available < needed => {
                Err(DownloadError::InsufficientSpace { needed, available })
            }
            Some(_) => Ok(()),
            None => {
                // Unknown filesystem layout; let the download proceed rather
                // than refusing on a measurement failure.
                warn!(path = %path, "Could not determine free space");
                Ok(())
            }
        }
    }

    pub async fn pause(&self, id: &str) -> Result<DownloadRecord, DownloadError> {
        let mut record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))?;

        self.client.pause_torrent(&record.hash).await?;
        record.state = DownloadState::Paused;
        Ok(self.store.update(record).await?)
    }

    pub async fn resume(&self, id: &str) -> Result<DownloadRecord, DownloadError> {
        let mut record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))?;

        self.client.resume_torrent(&record.hash).await?;
        record.state = DownloadState::Downloading;
        Ok(self.store.update(record).await?)
    }

    /// Remove the download from the client and delete its record. A torrent
    /// the client no longer knows about is not an error; the record is the
    /// thing being cancelled.
    pub async fn cancel(
        &self,
        id: &str,
        delete_files: bool,
    ) -> Result<DownloadRecord, DownloadError> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))?;

        match self.client.delete_torrent(&record.hash, delete_files).await {
            Ok(()) | Err(TorrentClientError::TorrentNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let deleted = self.store.delete(id).await?;
        info!(id = %deleted.id, "Download cancelled");
        Ok(deleted)
    }

    /// Hand a finished download to the import pipeline. Only valid from
    /// Completed or Seeding; the import worker takes it from Importing.
    pub async fn import(&self, id: &str) -> Result<DownloadRecord, DownloadError> {
        let mut record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))?;

        match record.state {
            DownloadState::Completed | DownloadState::Seeding => {}
            other => {
                return Err(DownloadError::InvalidState(format!(
                    "cannot import download in state {}",
                    other.as_str()
                )))
            }
        }

        record.state = DownloadState::Importing;
        Ok(self.store.update(record).await?)
    }

    pub async fn all(&self) -> Result<Vec<DownloadRecord>, DownloadError> {
        Ok(self.store.list_all().await?)
    }

    pub async fn active(&self) -> Result<Vec<DownloadRecord>, DownloadError> {
        Ok(self.store.list_active().await?)
    }

    pub async fn get(&self, id: &str) -> Result<DownloadRecord, DownloadError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))
    }

    pub async fn pending_import(&self) -> Result<Vec<DownloadRecord>, DownloadError> {
        Ok(self.store.list_pending_import().await?)
    }
}

/// An existing record blocks a new download for the same media unless it
/// already failed or its content was already imported.
fn blocks_new_download(existing: &DownloadRecord) -> bool {
    !matches!(
        existing.state,
        DownloadState::Error | DownloadState::Imported
    )
}

/// Pull the info hash out of a magnet URI (`xt=urn:btih:<hash>`), lowercased.
fn extract_hash(locator: &str) -> Option<String> {
    let start = locator.find("btih:")? + "btih:".len();
    let rest = &locator[start..];
    let end = rest.find('&').unwrap_or(rest.len());
    let hash = &rest[..end];

    if hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hash.to_lowercase())
    } else if hash.len() == 32 && hash.chars().all(|c| c.is_ascii_alphanumeric()) {
        // Base32-encoded v1 hash
        Some(hash.to_lowercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::SqliteDownloadStore;
    use crate::indexer::ReleaseQuality;
    use crate::testing::{MockMediaLibrary, MockTorrentClient};

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    fn search_result(hash: Option<&str>) -> SearchResult {
        SearchResult {
            title: "Show.S01E02.1080p.WEB-DL.x264".to_string(),
            magnet_uri: Some(format!(
                "magnet:?xt=urn:btih:{}&dn=x",
                hash.unwrap_or(HASH)
            )),
            download_url: None,
            info_hash: hash.map(String::from),
            size_bytes: 1_500_000_000,
            seeders: 12,
            leechers: 3,
            quality: ReleaseQuality::default(),
            indexer: "jackett".to_string(),
            publish_date: None,
        }
    }

    fn downloads_config() -> DownloadsConfig {
        DownloadsConfig {
            save_path: "/downloads".to_string(),
            movies_root: "/media/movies".to_string(),
            tv_root: "/media/tv".to_string(),
            min_free_space_bytes: 0,
            auto_import: true,
        }
    }

    fn manager() -> (DownloadManager, Arc<SqliteDownloadStore>, Arc<MockTorrentClient>) {
        let store = Arc::new(SqliteDownloadStore::in_memory().unwrap());
        let client = Arc::new(MockTorrentClient::new());
        let library = Arc::new(MockMediaLibrary::with_defaults());
        let manager = DownloadManager::new(
            store.clone(),
            client.clone(),
            library,
            downloads_config(),
            "fetcharr".to_string(),
        );
        (manager, store, client)
    }

    #[tokio::test]
    async fn test_start_episode_download() {
        let (manager, _store, client) = manager();

        let record = manager
            .start_episode_download(&search_result(Some(HASH)), 1, 1, 2, "alice")
            .await
            .unwrap();

        assert_eq!(record.state, DownloadState::Queued);
        assert_eq!(record.hash, HASH);
        assert_eq!(record.seeders, 12);
        assert!(record.auto_import);
        assert_eq!(client.added_torrents().len(), 1);
    }

    #[tokio::test]
    async fn test_start_episode_conflict() {
        let (manager, _store, _client) = manager();
        let result = search_result(Some(HASH));

        manager
            .start_episode_download(&result, 1, 1, 2, "alice")
            .await
            .unwrap();

        let second = SearchResult {
            info_hash: Some("ffffffffffffffffffffffffffffffffffffffff".to_string()),
            ..result
        };
        let err = manager
            .start_episode_download(&second, 1, 1, 2, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_errored_record_does_not_block() {
        let (manager, store, _client) = manager();
        let result = search_result(Some(HASH));

        let record = manager
            .start_episode_download(&result, 1, 1, 2, "alice")
            .await
            .unwrap();

        let mut failed = record.clone();
        failed.fail("tracker offline".to_string());
        store.update(failed).await.unwrap();

        let second = SearchResult {
            info_hash: Some("ffffffffffffffffffffffffffffffffffffffff".to_string()),
            ..result
        };
        assert!(manager
            .start_episode_download(&second, 1, 1, 2, "alice")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_retry_same_release_after_error() {
        let (manager, store, client) = manager();
        let result = search_result(Some(HASH));

        let record = manager
            .start_episode_download(&result, 1, 1, 2, "alice")
            .await
            .unwrap();

        let mut failed = record.clone();
        failed.fail("tracker offline");
        store.update(failed).await.unwrap();

        // The exact same release again: identical hash, fresh record.
        let retry = manager
            .start_episode_download(&result, 1, 1, 2, "alice")
            .await
            .unwrap();

        assert_ne!(retry.id, record.id);
        assert_eq!(retry.hash, HASH);
        assert_eq!(retry.state, DownloadState::Queued);
        assert_eq!(client.added_torrents().len(), 2);
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_series_is_not_found() {
        let (manager, _store, client) = manager();
        let err = manager
            .start_episode_download(&search_result(Some(HASH)), 999_999, 1, 2, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::NotFound(_)));
        assert!(client.added_torrents().is_empty());
    }

    #[tokio::test]
    async fn test_missing_hash_no_side_effects() {
        let (manager, store, client) = manager();
        let result = SearchResult {
            magnet_uri: Some("magnet:?dn=nohash".to_string()),
            info_hash: None,
            ..search_result(None)
        };

        let err = manager
            .start_episode_download(&result, 1, 1, 2, "alice")
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Internal(_)));
        assert!(client.added_torrents().is_empty());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_client_rejection_persists_nothing() {
        let (manager, store, client) = manager();
        client.fail_next_add("duplicate torrent");

        let err = manager
            .start_episode_download(&search_result(Some(HASH)), 1, 1, 2, "alice")
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::ExternalRejected(_)));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_movie_download() {
        let (manager, _store, _client) = manager();
        let record = manager
            .start_movie_download(&search_result(Some(HASH)), 7, "bob")
            .await
            .unwrap();
        assert!(matches!(record.media, MediaKind::Movie { movie_id: 7, .. }));
    }

    #[tokio::test]
    async fn test_discovery_movie_derives_destination_and_id() {
        let (manager, _store, client) = manager();

        let record = manager
            .start_discovery_movie(
                &search_result(Some(HASH)),
                "tt0111161",
                "Big Film: Returns",
                Some(2020),
                "bob",
            )
            .await
            .unwrap();

        assert_eq!(record.save_path, "/media/movies/Big Film Returns (2020)");
        match record.media {
            MediaKind::Movie { movie_id, .. } => {
                assert_eq!(movie_id, stable_media_id("movie", "tt0111161"));
                assert!(movie_id >= 0);
            }
            _ => panic!("expected movie media"),
        }
        assert_eq!(client.added_torrents()[0].save_path, record.save_path);
    }

    #[tokio::test]
    async fn test_discovery_episode_destination() {
        let (manager, _store, _client) = manager();

        let record = manager
            .start_discovery_episode(
                &search_result(Some(HASH)),
                "anidb-123",
                "Some Show",
                3,
                4,
                "bob",
            )
            .await
            .unwrap();

        assert_eq!(record.save_path, "/media/tv/Some Show/Season 03");
    }

    #[tokio::test]
    async fn test_pause_resume() {
        let (manager, _store, client) = manager();
        let record = manager
            .start_episode_download(&search_result(Some(HASH)), 1, 1, 2, "alice")
            .await
            .unwrap();

        let paused = manager.pause(&record.id).await.unwrap();
        assert_eq!(paused.state, DownloadState::Paused);
        assert_eq!(client.paused_hashes(), vec![HASH.to_string()]);

        let resumed = manager.resume(&record.id).await.unwrap();
        assert_eq!(resumed.state, DownloadState::Downloading);
    }

    #[tokio::test]
    async fn test_cancel_deletes_record() {
        let (manager, store, _client) = manager();
        let record = manager
            .start_episode_download(&search_result(Some(HASH)), 1, 1, 2, "alice")
            .await
            .unwrap();

        manager.cancel(&record.id, true).await.unwrap();
        assert!(store.get(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_tolerates_unknown_torrent() {
        let (manager, store, client) = manager();
        let record = manager
            .start_episode_download(&search_result(Some(HASH)), 1, 1, 2, "alice")
            .await
            .unwrap();

        client.forget_torrents();
        manager.cancel(&record.id, false).await.unwrap();
        assert!(store.get(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_import_requires_completed_or_seeding() {
        let (manager, store, _client) = manager();
        let record = manager
            .start_episode_download(&search_result(Some(HASH)), 1, 1, 2, "alice")
            .await
            .unwrap();

        let err = manager.import(&record.id).await.unwrap_err();
        assert!(matches!(err, DownloadError::InvalidState(_)));

        let mut completed = store.get(&record.id).await.unwrap().unwrap();
        completed.state = DownloadState::Completed;
        store.update(completed).await.unwrap();

        let importing = manager.import(&record.id).await.unwrap();
        assert_eq!(importing.state, DownloadState::Importing);
    }

    #[test]
    fn test_extract_hash_hex() {
        let locator = format!("magnet:?xt=urn:btih:{}&dn=x", HASH.to_uppercase());
        assert_eq!(extract_hash(&locator), Some(HASH.to_string()));
    }

    #[test]
    fn test_extract_hash_base32() {
        let locator = "magnet:?xt=urn:btih:ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
        assert_eq!(
            extract_hash(locator),
            Some("abcdefghijklmnopqrstuvwxyz234567".to_string())
        );
    }

    #[test]
    fn test_extract_hash_missing() {
        assert_eq!(extract_hash("magnet:?dn=x"), None);
        assert_eq!(extract_hash("magnet:?xt=urn:btih:short"), None);
        assert_eq!(extract_hash("http://indexer/dl/1.torrent"), None);
    }
}
