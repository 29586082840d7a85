//! Background workers.
//!
//! Two independent loops share one shutdown signal: the progress worker
//! reconciles active downloads against the torrent client every few seconds,
//! and the import worker sweeps finished downloads into the library on a
//! slower cadence. Cancellation is honored between poll cycles, never in the
//! middle of one.

mod importer;
mod reconciler;

pub use importer::ImportWorker;
pub use reconciler::{reconcile, ProgressWorker, Reconciled};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::WorkerConfig;

pub struct DownloadWorkers {
    config: WorkerConfig,
    progress: Arc<ProgressWorker>,
    import: Arc<ImportWorker>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl DownloadWorkers {
    pub fn new(
        config: WorkerConfig,
        progress: Arc<ProgressWorker>,
        import: Arc<ImportWorker>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            progress,
            import,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Spawn both worker loops. Calling start on a running set is a no-op.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Download workers already running");
            return;
        }

        info!("Starting download workers");
        self.spawn_progress_loop();
        self.spawn_import_loop();
    }

    /// Signal both loops to stop after their current cycle.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Download workers not running");
            return;
        }

        info!("Stopping download workers");
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn spawn_progress_loop(&self) {
        let worker = Arc::clone(&self.progress);
        let running = Arc::clone(&self.running);
        let interval = Duration::from_secs(self.config.progress_interval_secs);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Progress worker started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Progress worker received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        worker.poll_once().await;
                    }
                }
            }
            info!("Progress worker stopped");
        });
    }

    fn spawn_import_loop(&self) {
        let worker = Arc::clone(&self.import);
        let running = Arc::clone(&self.running);
        let interval = Duration::from_secs(self.config.import_interval_secs);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Import worker started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Import worker received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        worker.poll_once().await;
                    }
                }
            }
            info!("Import worker stopped");
        });
    }
}
