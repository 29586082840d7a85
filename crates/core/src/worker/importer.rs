//! Auto-import: moves finished downloads into the library's view.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::download::{DownloadRecord, DownloadState, DownloadStore};
use crate::library::MediaLibrary;

/// Polls for completed downloads and walks them through
/// Completed -> Importing -> Imported. Records already in Importing are
/// picked up too, so an import interrupted by a restart resumes.
pub struct ImportWorker {
    store: Arc<dyn DownloadStore>,
    library: Arc<dyn MediaLibrary>,
}

impl ImportWorker {
    pub fn new(store: Arc<dyn DownloadStore>, library: Arc<dyn MediaLibrary>) -> Self {
        Self { store, library }
    }

    /// One poll cycle. Failures persist on the record as Error and are not
    /// retried; the record surfaces the problem to the user.
    pub async fn poll_once(&self) {
        let mut candidates = match self.store.list_pending_import().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to list downloads pending import");
                return;
            }
        };

        match self.store.list_by_state(DownloadState::Importing).await {
            Ok(resumable) => {
                let seen: HashSet<String> = candidates.iter().map(|r| r.id.clone()).collect();
                candidates.extend(resumable.into_iter().filter(|r| !seen.contains(&r.id)));
            }
            Err(e) => {
                warn!(error = %e, "Failed to list resumable imports");
            }
        }

        for record in candidates {
            let id = record.id.clone();
            if let Err(message) = self.import_record(record).await {
                warn!(id = %id, error = %message, "Import failed");
                self.mark_failed(&id, message).await;
            }
        }
    }

    async fn import_record(&self, mut record: DownloadRecord) -> Result<(), String> {
        let content_path = record
            .content_path
            .clone()
            .unwrap_or_else(|| record.save_path.clone());

        if !Path::new(&content_path).exists() {
            return Err(format!("content path does not exist: {}", content_path));
        }

        if record.state != DownloadState::Importing {
            record.state = DownloadState::Importing;
            record = self
                .store
                .update(record)
                .await
                .map_err(|e| e.to_string())?;
        }

        let rescan_path = owning_folder(&content_path, &record.save_path);
        self.library
            .rescan(&rescan_path)
            .await
            .map_err(|e| e.to_string())?;

        record.state = DownloadState::Imported;
        if record.imported_at.is_none() {
            record.imported_at = Some(Utc::now());
        }
        let record = self.store.update(record).await.map_err(|e| e.to_string())?;

        info!(
            id = %record.id,
            media = %record.media.display_name(),
            path = %rescan_path,
            "Download imported"
        );
        Ok(())
    }

    async fn mark_failed(&self, id: &str, message: String) {
        match self.store.get(id).await {
            Ok(Some(mut record)) => {
                record.fail(message);
                if let Err(e) = self.store.update(record).await {
                    warn!(id = %id, error = %e, "Failed to persist import failure");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(id = %id, error = %e, "Failed to load record after import failure"),
        }
    }
}

/// Folder the library should rescan: the content folder itself when the
/// content is a directory, otherwise the directory containing the file.
fn owning_folder(content_path: &str, save_path: &str) -> String {
    let path = Path::new(content_path);
    if path.is_dir() {
        content_path.to_string()
    } else {
        path.parent()
            .map(|p| p.display().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| save_path.to_string())
    }
}
