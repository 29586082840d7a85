//! Progress reconciliation: folds the torrent client's live view into the
//! persisted download records.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::client::{TorrentClient, TorrentInfo, TorrentState};
use crate::download::{DownloadRecord, DownloadState, DownloadStore};
use crate::events::{ProgressSink, ProgressUpdate};

/// Outcome of reconciling one record against its live torrent.
pub struct Reconciled {
    pub record: DownloadRecord,
    /// Whether the change is worth announcing: a state transition or a
    /// progress move of more than half a point.
    pub significant: bool,
}

/// Fold one live torrent snapshot into a record. Pure; the caller persists.
///
/// Progress fields are copied verbatim. The state transition honors two
/// guards: Importing/Imported are terminal for reconciliation purposes and
/// are never regressed, and a Checking or Unknown client state leaves the
/// current state alone.
pub fn reconcile(record: &DownloadRecord, live: &TorrentInfo) -> Reconciled {
    let mut updated = record.clone();

    updated.progress = (live.progress * 100.0).clamp(0.0, 100.0);
    updated.size_bytes = live.size_bytes;
    updated.downloaded_bytes = live.downloaded_bytes;
    updated.download_rate = live.download_rate;
    updated.upload_rate = live.upload_rate;
    updated.seeders = live.seeders;
    updated.leechers = live.leechers;
    updated.eta_secs = live.eta_secs;
    if live.content_path.is_some() {
        updated.content_path = live.content_path.clone();
    }
    if let Some(save_path) = &live.save_path {
        updated.save_path = save_path.clone();
    }

    if !record.state.is_import_locked() {
        let mapped = match live.state {
            TorrentState::Downloading => Some(DownloadState::Downloading),
            TorrentState::Seeding => Some(DownloadState::Seeding),
            TorrentState::Paused => Some(DownloadState::Paused),
            TorrentState::Queued => Some(DownloadState::Queued),
            TorrentState::Error => Some(DownloadState::Error),
            TorrentState::Checking | TorrentState::Unknown => None,
        };
        if let Some(next) = mapped {
            updated.state = next;
        }

        // A fully downloaded torrent is Completed unless it is seeding.
        if updated.progress >= 100.0 && updated.state != DownloadState::Seeding {
            updated.state = DownloadState::Completed;
        }

        match updated.state {
            DownloadState::Error => {
                if record.state != DownloadState::Error {
                    updated.error_message =
                        Some("torrent client reported an error".to_string());
                }
            }
            _ => updated.error_message = None,
        }
    }

    if matches!(
        updated.state,
        DownloadState::Completed | DownloadState::Seeding
    ) && updated.completed_at.is_none()
    {
        updated.completed_at = Some(Utc::now());
    }

    let significant =
        updated.state != record.state || (updated.progress - record.progress).abs() > 0.5;

    Reconciled {
        record: updated,
        significant,
    }
}

/// Polls the torrent client and reconciles every active record.
pub struct ProgressWorker {
    store: Arc<dyn DownloadStore>,
    client: Arc<dyn TorrentClient>,
    sink: Arc<dyn ProgressSink>,
    category: String,
}

impl ProgressWorker {
    pub fn new(
        store: Arc<dyn DownloadStore>,
        client: Arc<dyn TorrentClient>,
        sink: Arc<dyn ProgressSink>,
        category: String,
    ) -> Self {
        Self {
            store,
            client,
            sink,
            category,
        }
    }

    /// One poll cycle. Every failure is contained to the record (or cycle)
    /// it happened in; the next cycle re-converges.
    pub async fn poll_once(&self) {
        let active = match self.store.list_active().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to list active downloads");
                return;
            }
        };
        if active.is_empty() {
            return;
        }

        let live = match self.client.list_torrents(Some(&self.category)).await {
            Ok(torrents) => torrents,
            Err(e) => {
                warn!(error = %e, "Failed to fetch torrents from client, skipping cycle");
                return;
            }
        };
        let by_hash: HashMap<&str, &TorrentInfo> =
            live.iter().map(|t| (t.hash.as_str(), t)).collect();

        for record in active {
            let Some(torrent) = by_hash.get(record.hash.as_str()) else {
                warn!(
                    id = %record.id,
                    hash = %record.hash,
                    "Active download not present in torrent client"
                );
                continue;
            };

            let reconciled = reconcile(&record, torrent);
            let significant = reconciled.significant;

            match self.store.update(reconciled.record).await {
                Ok(updated) => {
                    if significant {
                        self.sink.publish(ProgressUpdate::from_record(&updated)).await;
                    }
                }
                Err(e) => {
                    warn!(id = %record.id, error = %e, "Failed to persist reconciled download");
                }
            }
        }

        debug!("Progress poll cycle complete");
    }
}
