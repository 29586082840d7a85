//! Mock torrent client for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::client::{
    AddTorrentRequest, TorrentClient, TorrentClientError, TorrentInfo, TorrentState,
};

/// Mock implementation of the TorrentClient trait.
///
/// Adding a torrent registers a live entry keyed by the hash pulled from the
/// magnet locator, so lifecycle tests can drive progress with
/// `update_torrent` and watch reconciliation converge. Locks are plain std
/// mutexes held only for the duration of an accessor, never across an await.
pub struct MockTorrentClient {
    torrents: Mutex<HashMap<String, TorrentInfo>>,
    added: Mutex<Vec<AddTorrentRequest>>,
    paused: Mutex<Vec<String>>,
    resumed: Mutex<Vec<String>>,
    categories: Mutex<Vec<(String, String)>>,
    fail_next_add: Mutex<Option<String>>,
    unavailable: Mutex<bool>,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self {
            torrents: Mutex::new(HashMap::new()),
            added: Mutex::new(Vec::new()),
            paused: Mutex::new(Vec::new()),
            resumed: Mutex::new(Vec::new()),
            categories: Mutex::new(Vec::new()),
            fail_next_add: Mutex::new(None),
            unavailable: Mutex::new(false),
        }
    }

    /// All recorded add_torrent requests.
    pub fn added_torrents(&self) -> Vec<AddTorrentRequest> {
        self.added.lock().unwrap().clone()
    }

    pub fn paused_hashes(&self) -> Vec<String> {
        self.paused.lock().unwrap().clone()
    }

    pub fn resumed_hashes(&self) -> Vec<String> {
        self.resumed.lock().unwrap().clone()
    }

    pub fn created_categories(&self) -> Vec<(String, String)> {
        self.categories.lock().unwrap().clone()
    }

    /// Make the next add_torrent call fail as a client rejection.
    pub fn fail_next_add(&self, message: &str) {
        *self.fail_next_add.lock().unwrap() = Some(message.to_string());
    }

    /// Make every call fail as unreachable until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Drop all live torrents, as if someone removed them out of band.
    pub fn forget_torrents(&self) {
        self.torrents.lock().unwrap().clear();
    }

    /// Drive a live torrent's state and progress (fraction 0.0 to 1.0).
    pub fn update_torrent(&self, hash: &str, state: TorrentState, progress: f64) {
        let mut torrents = self.torrents.lock().unwrap();
        if let Some(t) = torrents.get_mut(hash) {
            t.state = state;
            t.progress = progress;
            t.downloaded_bytes = (t.size_bytes as f64 * progress) as u64;
        }
    }

    pub fn set_content_path(&self, hash: &str, content_path: &str) {
        let mut torrents = self.torrents.lock().unwrap();
        if let Some(t) = torrents.get_mut(hash) {
            t.content_path = Some(content_path.to_string());
        }
    }

    fn check_available(&self) -> Result<(), TorrentClientError> {
        if *self.unavailable.lock().unwrap() {
            Err(TorrentClientError::Unreachable(
                "mock client unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

fn hash_from_locator(locator: &str) -> Option<String> {
    let start = locator.find("btih:")? + "btih:".len();
    let rest = &locator[start..];
    let end = rest.find('&').unwrap_or(rest.len());
    Some(rest[..end].to_lowercase())
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_torrents(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        self.check_available()?;
        let torrents = self.torrents.lock().unwrap();
        Ok(torrents
            .values()
            .filter(|t| match category {
                Some(cat) => t.category.as_deref() == Some(cat),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn add_torrent(&self, request: AddTorrentRequest) -> Result<(), TorrentClientError> {
        self.check_available()?;
        if let Some(message) = self.fail_next_add.lock().unwrap().take() {
            return Err(TorrentClientError::Rejected(message));
        }

        self.added.lock().unwrap().push(request.clone());

        if let Some(hash) = hash_from_locator(&request.locator) {
            self.torrents.lock().unwrap().insert(
                hash.clone(),
                TorrentInfo {
                    hash,
                    name: request.locator.clone(),
                    state: TorrentState::Queued,
                    progress: 0.0,
                    size_bytes: 0,
                    downloaded_bytes: 0,
                    download_rate: 0,
                    upload_rate: 0,
                    seeders: 0,
                    leechers: 0,
                    eta_secs: None,
                    save_path: Some(request.save_path.clone()),
                    content_path: None,
                    category: Some(request.category.clone()),
                },
            );
        }
        Ok(())
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.check_available()?;
        let hash = hash.to_lowercase();
        self.paused.lock().unwrap().push(hash.clone());
        if let Some(t) = self.torrents.lock().unwrap().get_mut(&hash) {
            t.state = TorrentState::Paused;
        }
        Ok(())
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.check_available()?;
        self.resumed.lock().unwrap().push(hash.to_lowercase());
        Ok(())
    }

    async fn delete_torrent(
        &self,
        hash: &str,
        _delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        self.check_available()?;
        match self.torrents.lock().unwrap().remove(&hash.to_lowercase()) {
            Some(_) => Ok(()),
            None => Err(TorrentClientError::TorrentNotFound(hash.to_string())),
        }
    }

    async fn ensure_category(
        &self,
        name: &str,
        save_path: &str,
    ) -> Result<(), TorrentClientError> {
        self.check_available()?;
        let mut categories = self.categories.lock().unwrap();
        if !categories.iter().any(|(n, _)| n == name) {
            categories.push((name.to_string(), save_path.to_string()));
        }
        Ok(())
    }

    async fn probe(&self) -> Result<(), TorrentClientError> {
        self.check_available()
    }
}
