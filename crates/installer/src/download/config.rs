//! Configuration types for the transfer engine

use std::time::Duration;

use crate::error::{InstallError, Result};

/// Configuration for download operations
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Bound on every network wait of one attempt (headers, each body chunk)
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Retries on the same candidate before falling through to the next one
    pub max_retries: usize,
    /// Initial delay between retries (doubles each retry)
    pub retry_delay: Duration,
    /// Maximum retry delay cap
    pub max_retry_delay: Duration,
    /// Read buffer for local-file candidates
    pub buffer_size: usize,
    /// Worker pool size is this times the available parallelism
    pub concurrency_multiplier: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("mc-installer/{}", env!("CARGO_PKG_VERSION")),
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(10),
            buffer_size: 64 * 1024,
            concurrency_multiplier: 3,
        }
    }
}

impl DownloadConfig {
    pub fn builder() -> DownloadConfigBuilder {
        DownloadConfigBuilder::default()
    }

    /// Defaults overridden by `INSTALLER_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Recognised: `INSTALLER_TIMEOUT_SECS`, `INSTALLER_MAX_RETRIES`,
    /// `INSTALLER_USER_AGENT`, `INSTALLER_CONCURRENCY_MULTIPLIER`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(secs) = parse_var::<u64>(&lookup, "INSTALLER_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<usize>(&lookup, "INSTALLER_MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(agent) = lookup("INSTALLER_USER_AGENT").filter(|a| !a.is_empty()) {
            config.user_agent = agent;
        }
        if let Some(multiplier) = parse_var::<usize>(&lookup, "INSTALLER_CONCURRENCY_MULTIPLIER")? {
            if multiplier == 0 {
                return Err(InstallError::validation(
                    "INSTALLER_CONCURRENCY_MULTIPLIER must be at least 1",
                ));
            }
            config.concurrency_multiplier = multiplier;
        }
        Ok(config)
    }

    /// Default worker count for batch installs
    pub fn default_concurrency(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (cores * self.concurrency_multiplier).max(1)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| InstallError::Validation {
                message: format!("{key} has invalid value '{raw}'"),
                source: Some(Box::new(e)),
            }),
    }
}

/// Builder for [`DownloadConfig`]
#[derive(Debug, Clone, Default)]
pub struct DownloadConfigBuilder {
    config: DownloadConfig,
}

impl DownloadConfigBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn max_retries(mut self, retries: usize) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn max_retry_delay(mut self, delay: Duration) -> Self {
        self.config.max_retry_delay = delay;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size.max(1);
        self
    }

    pub fn concurrency_multiplier(mut self, multiplier: usize) -> Self {
        self.config.concurrency_multiplier = multiplier.max(1);
        self
    }

    pub fn build(self) -> DownloadConfig {
        self.config
    }
}
