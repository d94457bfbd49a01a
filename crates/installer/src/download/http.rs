//! HTTP and local-file transfer engine
//!
//! Streams each candidate into `<destination>.part` and renames it into place
//! once the source is exhausted. `file://` candidates go through the same
//! loop, so cached or offline artifacts get progress and pause for free.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tokio_util::io::ReaderStream;
use tracing::{debug, info_span, warn, Instrument};

use super::config::DownloadConfig;
use super::error::{DownloadError, FileOperation, Result};
use super::metrics::DownloadMetrics;
use super::spec::DownloadSpec;
use super::transfer::{
    part_path, Downloader, PartFileGuard, PauseSwitch, TransferControl, TransferProgress,
};
use crate::error::InstallError;

type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Default [`Downloader`]: reqwest for `http(s)://`, tokio fs for `file://`
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    config: DownloadConfig,
    metrics: Arc<DownloadMetrics>,
}

impl HttpDownloader {
    /// Create a downloader from configuration
    pub fn new(config: DownloadConfig) -> crate::error::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| InstallError::Validation {
                message: "failed to create HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self::with_client(client, config))
    }

    /// Use an existing client (shared connection pool)
    pub fn with_client(client: Client, config: DownloadConfig) -> Self {
        Self {
            client,
            config,
            metrics: Arc::new(DownloadMetrics::default()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<DownloadMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The underlying client, for one-off requests sharing its pool
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<DownloadMetrics> {
        &self.metrics
    }

    fn backoff(&self, retries: usize) -> std::iter::Take<ExponentialBackoff> {
        // from_millis(2) doubles each step; factor scales the first delay to retry_delay
        let factor = (self.config.retry_delay.as_millis() as u64 / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.config.max_retry_delay)
            .take(retries)
    }

    async fn open(&self, url: &str, timeout: Duration) -> Result<(ByteStream, Option<u64>)> {
        let parsed = url::Url::parse(url).map_err(|source| DownloadError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        match parsed.scheme() {
            "http" | "https" => self.open_http(url, timeout).await,
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| DownloadError::UnsupportedUrl {
                        url: url.to_string(),
                        scheme: "file".to_string(),
                    })?;
                self.open_file(&path).await
            }
            scheme => Err(DownloadError::UnsupportedUrl {
                url: url.to_string(),
                scheme: scheme.to_string(),
            }),
        }
    }

    async fn open_http(&self, url: &str, timeout: Duration) -> Result<(ByteStream, Option<u64>)> {
        let response = tokio::time::timeout(timeout, self.client.get(url).send())
            .await
            .map_err(|_| DownloadError::NetworkTimeout {
                url: url.to_string(),
                duration_secs: timeout.as_secs(),
            })?
            .map_err(|source| DownloadError::HttpRequest {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let owned_url = url.to_string();
        let stream = response
            .bytes_stream()
            .map_err(move |source| DownloadError::HttpRequest {
                url: owned_url.clone(),
                source,
            })
            .boxed();
        Ok((stream, total))
    }

    async fn open_file(&self, path: &Path) -> Result<(ByteStream, Option<u64>)> {
        let file = fs::File::open(path)
            .await
            .map_err(|e| DownloadError::fs(path, FileOperation::Read, e))?;
        let total = file
            .metadata()
            .await
            .map_err(|e| DownloadError::fs(path, FileOperation::Metadata, e))?
            .len();
        let owned = path.to_path_buf();
        let stream = ReaderStream::with_capacity(file, self.config.buffer_size)
            .map_err(move |e| DownloadError::fs(&owned, FileOperation::Read, e))
            .boxed();
        Ok((stream, Some(total)))
    }

    /// One attempt against one candidate
    async fn transfer_once(
        &self,
        url: &str,
        destination: &Path,
        timeout: Duration,
        control: &TransferControl,
    ) -> Result<u64> {
        let (mut stream, total) = self.open(url, timeout).await?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::fs(parent, FileOperation::CreateDir, e))?;
        }

        let staged = PartFileGuard::new(part_path(destination));
        let mut file = fs::File::create(staged.path())
            .await
            .map_err(|e| DownloadError::fs(staged.path(), FileOperation::Create, e))?;

        let switch = PauseSwitch::new();
        control.register_pausable(Some(switch.clone()));

        let mut written = 0u64;
        loop {
            switch.wait_resumed().await;
            let next = tokio::time::timeout(timeout, stream.next())
                .await
                .map_err(|_| DownloadError::NetworkTimeout {
                    url: url.to_string(),
                    duration_secs: timeout.as_secs(),
                })?;
            let Some(chunk) = next else { break };
            let chunk = chunk?;

            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::fs(staged.path(), FileOperation::Write, e))?;
            written += chunk.len() as u64;
            self.metrics.record_bytes(chunk.len() as u64);

            control.report(TransferProgress {
                chunk_len: chunk.len() as u64,
                written,
                total,
                url: url.to_string(),
            });
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::fs(staged.path(), FileOperation::Write, e))?;
        file.sync_all()
            .await
            .map_err(|e| DownloadError::fs(staged.path(), FileOperation::Write, e))?;
        drop(file);

        fs::rename(staged.path(), destination)
            .await
            .map_err(|e| DownloadError::fs(destination, FileOperation::Move, e))?;
        staged.disarm();

        debug!(url, bytes = written, "transfer complete");
        Ok(written)
    }

    async fn download_candidates(
        &self,
        spec: &DownloadSpec,
        control: &TransferControl,
    ) -> Result<u64> {
        let retries = spec.retry.unwrap_or(self.config.max_retries);
        let timeout = spec.timeout.unwrap_or(self.config.timeout);
        let mut last_error = None;

        for (index, url) in spec.urls.iter().enumerate() {
            if index > 0 {
                self.metrics.record_fallback();
            }

            let result = RetryIf::start(
                self.backoff(retries),
                || self.transfer_once(url, &spec.destination, timeout, control),
                |e: &DownloadError| {
                    let retry = e.is_recoverable();
                    if retry {
                        debug!(url = %url, error = %e, "retrying candidate");
                        self.metrics.record_retry();
                    }
                    retry
                },
            )
            .await;

            match result {
                Ok(written) => return Ok(written),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(
                        url = %url,
                        category = e.category(),
                        error = %e,
                        remaining = spec.urls.len() - index - 1,
                        "candidate failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DownloadError::NoCandidates {
            destination: spec.destination.clone(),
        }))
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, spec: &DownloadSpec, control: &TransferControl) -> Result<u64> {
        if spec.urls.is_empty() {
            return Err(DownloadError::NoCandidates {
                destination: spec.destination.clone(),
            });
        }

        let span = info_span!("transfer", destination = %spec.destination.display());
        let token = control.cancellation_token().clone();
        let outcome = async {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(DownloadError::Cancelled {
                    url: spec.urls.first().cloned(),
                }),
                result = self.download_candidates(spec, control) => result,
            }
        }
        .instrument(span)
        .await;

        control.register_pausable(None);
        outcome
    }
}
