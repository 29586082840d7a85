//! Progress event publishing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::download::DownloadRecord;

/// Snapshot of one download's progress, emitted after reconciliation writes
/// a meaningful change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub download_id: String,
    pub hash: String,
    pub state: String,
    pub media_kind: String,
    pub media_name: String,
    pub progress: f64,
    pub size_bytes: u64,
    pub downloaded_bytes: u64,
    pub download_rate: u64,
    pub upload_rate: u64,
    pub seeders: u32,
    pub leechers: u32,
    pub eta_secs: Option<u64>,
}

impl ProgressUpdate {
    pub fn from_record(record: &DownloadRecord) -> Self {
        Self {
            download_id: record.id.clone(),
            hash: record.hash.clone(),
            state: record.state.as_str().to_string(),
            media_kind: record.media.kind_str().to_string(),
            media_name: record.media.display_name().to_string(),
            progress: record.progress,
            size_bytes: record.size_bytes,
            downloaded_bytes: record.downloaded_bytes,
            download_rate: record.download_rate,
            upload_rate: record.upload_rate,
            seeders: record.seeders,
            leechers: record.leechers,
            eta_secs: record.eta_secs,
        }
    }
}

/// Fire-and-forget event sink. Publishing must never fail the caller; an
/// implementation that cannot deliver simply drops the update.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn publish(&self, update: ProgressUpdate);
}

/// Sink backed by a tokio broadcast channel, for in-process live listeners.
/// With no subscribers the send fails and the update is dropped, which is
/// the contract.
pub struct BroadcastSink {
    tx: broadcast::Sender<ProgressUpdate>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl ProgressSink for BroadcastSink {
    async fn publish(&self, update: ProgressUpdate) {
        if self.tx.send(update).is_err() {
            debug!("Progress update dropped, no subscribers");
        }
    }
}
