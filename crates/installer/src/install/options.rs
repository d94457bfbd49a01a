//! Install configuration
//!
//! Everything an install needs beyond the version itself: how to transfer,
//! when to transfer, which hosts to try and how hard to push.

use std::sync::Arc;

use crate::download::{
    CandidateList, ChecksumStrategy, DownloadConfig, DownloadMetrics, DownloadStrategy,
    Downloader, FileFetcher, HttpDownloader, WorkerPool,
};
use crate::error::Result;

use super::layout::hash_prefix;
use super::version::{InstallKind, ResolvedLibrary};

/// Root of the official asset object store
pub const DEFAULT_RESOURCE_ROOT_URL: &str = "https://resources.download.minecraft.net";

/// Always-present library mirror, tried after the library's own URL
pub const MAVEN_CENTRAL_URL: &str = "https://repo1.maven.org/maven2/";

/// Alternative URLs for one library, tried before its own URL
pub type LibraryHost = Arc<dyn Fn(&ResolvedLibrary) -> Vec<String> + Send + Sync>;

/// Options shared by every install entry point.
///
/// Cloning is cheap and shares the downloader, strategy and counters.
#[derive(Clone)]
pub struct InstallOptions {
    downloader: Arc<dyn Downloader>,
    strategy: Arc<dyn DownloadStrategy>,
    metrics: Arc<DownloadMetrics>,
    config: DownloadConfig,
    fail_fast: bool,
    library_host: Option<LibraryHost>,
    assets_hosts: Vec<String>,
    assets_concurrency: Option<usize>,
    libraries_concurrency: Option<usize>,
    client_jar_url: Option<String>,
    server_jar_url: Option<String>,
}

impl std::fmt::Debug for InstallOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallOptions")
            .field("fail_fast", &self.fail_fast)
            .field("has_library_host", &self.library_host.is_some())
            .field("assets_hosts", &self.assets_hosts)
            .field("assets_concurrency", &self.assets_concurrency)
            .field("libraries_concurrency", &self.libraries_concurrency)
            .field("client_jar_url", &self.client_jar_url)
            .field("server_jar_url", &self.server_jar_url)
            .finish_non_exhaustive()
    }
}

impl InstallOptions {
    /// Default HTTP downloader and checksum strategy with default configuration
    pub fn new() -> Result<Self> {
        Self::from_config(DownloadConfig::default())
    }

    pub fn from_config(config: DownloadConfig) -> Result<Self> {
        let metrics = Arc::new(DownloadMetrics::default());
        let downloader = HttpDownloader::new(config.clone())?.with_metrics(metrics.clone());
        Ok(Self {
            downloader: Arc::new(downloader),
            strategy: Arc::new(ChecksumStrategy),
            metrics,
            config,
            fail_fast: false,
            library_host: None,
            assets_hosts: Vec::new(),
            assets_concurrency: None,
            libraries_concurrency: None,
            client_jar_url: None,
            server_jar_url: None,
        })
    }

    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn DownloadStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Abort a batch at its first failing item instead of collecting errors
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_library_host<F>(mut self, host: F) -> Self
    where
        F: Fn(&ResolvedLibrary) -> Vec<String> + Send + Sync + 'static,
    {
        self.library_host = Some(Arc::new(host));
        self
    }

    /// Asset roots tried before the official one, in order
    pub fn with_assets_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_assets_concurrency(mut self, workers: usize) -> Self {
        self.assets_concurrency = Some(workers);
        self
    }

    pub fn with_libraries_concurrency(mut self, workers: usize) -> Self {
        self.libraries_concurrency = Some(workers);
        self
    }

    /// Replace the client archive URL
    pub fn with_client_jar_url(mut self, url: impl Into<String>) -> Self {
        self.client_jar_url = Some(url.into());
        self
    }

    /// Replace the server archive URL
    pub fn with_server_jar_url(mut self, url: impl Into<String>) -> Self {
        self.server_jar_url = Some(url.into());
        self
    }

    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Counters for every artifact this install looked at
    pub fn metrics(&self) -> &Arc<DownloadMetrics> {
        &self.metrics
    }

    pub(crate) fn fetcher(&self) -> FileFetcher {
        FileFetcher::new(
            self.downloader.clone(),
            self.strategy.clone(),
            self.metrics.clone(),
        )
    }

    pub(crate) fn jar_override(&self, kind: InstallKind) -> Option<&str> {
        match kind {
            InstallKind::Client => self.client_jar_url.as_deref(),
            InstallKind::Server => self.server_jar_url.as_deref(),
        }
    }

    pub(crate) fn library_candidates(&self, library: &ResolvedLibrary) -> Vec<String> {
        let overrides = self
            .library_host
            .as_ref()
            .map(|host| host(library))
            .unwrap_or_default();
        CandidateList::new()
            .with_overrides(overrides)
            .with_canonical(library.download.url.clone())
            .with_mirrors(&[MAVEN_CENTRAL_URL], &library.download.path)
            .build()
    }

    pub(crate) fn asset_candidates(&self, hash: &str) -> Vec<String> {
        let relative = format!("{}/{}", hash_prefix(hash), hash);
        CandidateList::new()
            .with_mirrors(self.assets_hosts.as_slice(), &relative)
            .with_mirrors(&[DEFAULT_RESOURCE_ROOT_URL], &relative)
            .build()
    }

    pub(crate) fn assets_pool(&self) -> WorkerPool {
        self.pool(self.assets_concurrency)
    }

    pub(crate) fn libraries_pool(&self) -> WorkerPool {
        self.pool(self.libraries_concurrency)
    }

    fn pool(&self, workers: Option<usize>) -> WorkerPool {
        let workers = workers.unwrap_or_else(|| self.config.default_concurrency());
        WorkerPool::new(workers).with_fail_fast(self.fail_fast)
    }
}
