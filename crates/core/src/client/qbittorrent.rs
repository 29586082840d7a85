//! qBittorrent client adapter.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::QbittorrentConfig;

use super::{AddTorrentRequest, TorrentClient, TorrentClientError, TorrentInfo, TorrentState};

/// Minimum gap between login attempts, so a flapping client does not get
/// hammered with credential posts.
const LOGIN_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// qBittorrent Web API adapter.
///
/// The session cookie lives in the reqwest cookie jar; `session` only tracks
/// whether we believe it is valid and when we last tried to log in. All login
/// attempts funnel through the mutex so concurrent callers hitting an expired
/// session produce a single re-login.
pub struct QbittorrentClient {
    client: Client,
    config: QbittorrentConfig,
    session: Mutex<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    authenticated: bool,
    last_attempt: Option<Instant>,
}

impl QbittorrentClient {
    pub fn new(config: QbittorrentConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            session: Mutex::new(SessionState::default()),
        }
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn map_send_error(e: reqwest::Error) -> TorrentClientError {
        if e.is_timeout() {
            TorrentClientError::Timeout
        } else if e.is_connect() {
            TorrentClientError::Unreachable(e.to_string())
        } else {
            TorrentClientError::Unreachable(e.to_string())
        }
    }

    /// Log in, holding the session lock for the whole attempt.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let mut session = self.session.lock().await;
        if session.authenticated {
            return Ok(());
        }
        if let Some(last) = session.last_attempt {
            if last.elapsed() < LOGIN_RETRY_INTERVAL {
                return Err(TorrentClientError::AuthenticationFailed(
                    "login throttled after recent failure".to_string(),
                ));
            }
        }
        session.last_attempt = Some(Instant::now());

        let url = format!("{}/api/v2/auth/login", self.base_url());
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];
        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            session.authenticated = true;
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(TorrentClientError::AuthenticationFailed(
                "invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "unexpected login response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        {
            let session = self.session.lock().await;
            if session.authenticated {
                return Ok(());
            }
        }
        self.login().await
    }

    async fn invalidate_session(&self) {
        let mut session = self.session.lock().await;
        session.authenticated = false;
    }

    /// Authenticated GET with one transparent re-login on 403.
    async fn get(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;
        let url = format!("{}{}", self.base_url(), endpoint);

        for attempt in 0..2 {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(Self::map_send_error)?;

            let status = response.status();
            if status.as_u16() == 403 && attempt == 0 {
                warn!("qBittorrent session expired, re-authenticating");
                self.invalidate_session().await;
                self.login().await?;
                continue;
            }
            if !status.is_success() {
                return Err(TorrentClientError::Rejected(format!("HTTP {}", status)));
            }
            return response
                .text()
                .await
                .map_err(|e| TorrentClientError::Unreachable(e.to_string()));
        }
        Err(TorrentClientError::AuthenticationFailed(
            "session could not be re-established".to_string(),
        ))
    }

    /// Authenticated form POST with one transparent re-login on 403.
    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;
        let url = format!("{}{}", self.base_url(), endpoint);

        for attempt in 0..2 {
            let response = self
                .client
                .post(&url)
                .form(params)
                .send()
                .await
                .map_err(Self::map_send_error)?;

            let status = response.status();
            if status.as_u16() == 403 && attempt == 0 {
                warn!("qBittorrent session expired, re-authenticating");
                self.invalidate_session().await;
                self.login().await?;
                continue;
            }
            if !status.is_success() {
                return Err(TorrentClientError::Rejected(format!("HTTP {}", status)));
            }
            return response
                .text()
                .await
                .map_err(|e| TorrentClientError::Unreachable(e.to_string()));
        }
        Err(TorrentClientError::AuthenticationFailed(
            "session could not be re-established".to_string(),
        ))
    }
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QbTorrentInfo {
    hash: String,
    name: String,
    state: String,
    progress: f64,
    size: i64,
    downloaded: i64,
    dlspeed: i64,
    upspeed: i64,
    num_seeds: i64,
    num_leechs: i64,
    eta: i64,
    save_path: String,
    #[serde(default)]
    content_path: String,
    category: String,
}

impl QbTorrentInfo {
    fn into_torrent_info(self) -> TorrentInfo {
        TorrentInfo {
            hash: self.hash.to_lowercase(),
            name: self.name,
            state: parse_qb_state(&self.state),
            progress: self.progress.clamp(0.0, 1.0),
            size_bytes: self.size.max(0) as u64,
            downloaded_bytes: self.downloaded.max(0) as u64,
            download_rate: self.dlspeed.max(0) as u64,
            upload_rate: self.upspeed.max(0) as u64,
            seeders: self.num_seeds.max(0) as u32,
            leechers: self.num_leechs.max(0) as u32,
            // qBittorrent reports 8640000 for "unknown"
            eta_secs: if self.eta > 0 && self.eta < 8_640_000 {
                Some(self.eta as u64)
            } else {
                None
            },
            save_path: if self.save_path.is_empty() {
                None
            } else {
                Some(self.save_path)
            },
            content_path: if self.content_path.is_empty() {
                None
            } else {
                Some(self.content_path)
            },
            category: if self.category.is_empty() {
                None
            } else {
                Some(self.category)
            },
        }
    }
}

/// Map qBittorrent's state vocabulary onto the normalized adapter states.
///
/// Stalled-down counts as Queued (no transfer happening) while stalled-up is
/// Seeding (content complete). Post-resume checks, allocation and moves map
/// to Checking, which reconciliation treats as "no state change".
fn parse_qb_state(state: &str) -> TorrentState {
    match state {
        "downloading" | "forcedDL" => TorrentState::Downloading,
        "uploading" | "forcedUP" | "stalledUP" => TorrentState::Seeding,
        "pausedDL" | "pausedUP" | "stoppedDL" | "stoppedUP" => TorrentState::Paused,
        "queuedDL" | "queuedUP" | "stalledDL" | "metaDL" | "checkingDL" | "checkingUP" => {
            TorrentState::Queued
        }
        "checkingResumeData" | "allocating" | "moving" => TorrentState::Checking,
        "error" | "missingFiles" => TorrentState::Error,
        _ => TorrentState::Unknown,
    }
}

#[async_trait]
impl TorrentClient for QbittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn list_torrents(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        let endpoint = match category {
            Some(cat) => format!(
                "/api/v2/torrents/info?category={}",
                urlencoding::encode(cat)
            ),
            None => "/api/v2/torrents/info".to_string(),
        };

        let response = self.get(&endpoint).await?;
        let torrents: Vec<QbTorrentInfo> = serde_json::from_str(&response)
            .map_err(|e| TorrentClientError::Rejected(format!("unparseable response: {}", e)))?;

        Ok(torrents.into_iter().map(|t| t.into_torrent_info()).collect())
    }

    async fn add_torrent(&self, request: AddTorrentRequest) -> Result<(), TorrentClientError> {
        let body = self
            .post_form(
                "/api/v2/torrents/add",
                &[
                    ("urls", request.locator.as_str()),
                    ("savepath", request.save_path.as_str()),
                    ("category", request.category.as_str()),
                ],
            )
            .await?;

        if body.contains("Fails.") {
            return Err(TorrentClientError::Rejected(
                "client refused the torrent".to_string(),
            ));
        }
        Ok(())
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        let hash = hash.to_lowercase();
        self.post_form("/api/v2/torrents/pause", &[("hashes", hash.as_str())])
            .await?;
        Ok(())
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        let hash = hash.to_lowercase();
        self.post_form("/api/v2/torrents/resume", &[("hashes", hash.as_str())])
            .await?;
        Ok(())
    }

    async fn delete_torrent(
        &self,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        let hash = hash.to_lowercase();
        let delete = if delete_files { "true" } else { "false" };
        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", hash.as_str()), ("deleteFiles", delete)],
        )
        .await?;
        Ok(())
    }

    async fn ensure_category(
        &self,
        name: &str,
        save_path: &str,
    ) -> Result<(), TorrentClientError> {
        let result = self
            .post_form(
                "/api/v2/torrents/createCategory",
                &[("category", name), ("savePath", save_path)],
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            // 409 means the category already exists
            Err(TorrentClientError::Rejected(msg)) if msg.contains("409") => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn probe(&self) -> Result<(), TorrentClientError> {
        self.get("/api/v2/app/version").await.map(|_| ())
    }
}
