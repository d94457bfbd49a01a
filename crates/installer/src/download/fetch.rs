//! Verify-then-transfer for a single artifact inside a task

use std::sync::Arc;

use tracing::{debug, warn};

use super::checksum::verify_file;
use super::error::FileOperation;
use super::metrics::DownloadMetrics;
use super::spec::DownloadSpec;
use super::strategy::DownloadStrategy;
use super::transfer::{Downloader, TransferControl};
use crate::error::{InstallError, Result};
use crate::task::{Task, TaskContext};

/// A downloader and a strategy used together.
///
/// Cloning shares the underlying downloader, strategy and counters.
#[derive(Clone)]
pub struct FileFetcher {
    downloader: Arc<dyn Downloader>,
    strategy: Arc<dyn DownloadStrategy>,
    metrics: Arc<DownloadMetrics>,
}

impl std::fmt::Debug for FileFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFetcher")
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

impl FileFetcher {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        strategy: Arc<dyn DownloadStrategy>,
        metrics: Arc<DownloadMetrics>,
    ) -> Self {
        Self {
            downloader,
            strategy,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<DownloadMetrics> {
        &self.metrics
    }

    /// Fetch `spec` unless the strategy says the local copy is fine.
    ///
    /// After a transfer the file is hashed again when a checksum is known; a
    /// mismatch removes the file and fails with
    /// [`InstallError::ChecksumMismatch`]. Returns whether bytes were moved.
    pub async fn fetch(&self, ctx: &TaskContext, spec: &DownloadSpec) -> Result<bool> {
        if !self.strategy.should_download(spec).await? {
            debug!(path = %spec.destination.display(), "artifact already valid");
            self.metrics.record_skipped();
            return Ok(false);
        }

        self.metrics.record_started();
        let control = TransferControl::for_task(ctx);
        if let Err(e) = self.downloader.download(spec, &control).await {
            if !e.is_cancelled() {
                self.metrics.record_failed();
            }
            return Err(e.into());
        }

        if let Some(checksum) = spec.effective_checksum() {
            let verification = verify_file(&spec.destination, checksum).await?;
            if !verification.matches {
                warn!(
                    path = %spec.destination.display(),
                    expected = %checksum.hash,
                    actual = %verification.actual,
                    "downloaded file does not match its checksum"
                );
                self.metrics.record_checksum_failure();
                self.metrics.record_failed();
                tokio::fs::remove_file(&spec.destination)
                    .await
                    .map_err(|e| InstallError::io(&spec.destination, FileOperation::Delete, e))?;
                return Err(InstallError::ChecksumMismatch {
                    path: spec.destination.clone(),
                    algorithm: checksum.algorithm.clone(),
                    expected: checksum.hash.clone(),
                    actual: verification.actual,
                });
            }
        }

        self.metrics.record_completed();
        Ok(true)
    }

    /// [`fetch`](Self::fetch) as a leaf task
    pub fn fetch_task(&self, name: &str, spec: DownloadSpec) -> Task<bool> {
        let fetcher = self.clone();
        let destination = spec.destination.display().to_string();
        Task::create(name, move |ctx| async move { fetcher.fetch(&ctx, &spec).await })
            .with_param("destination", destination)
    }
}
