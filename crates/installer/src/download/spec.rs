//! Download request descriptions

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Expected digest of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    /// Algorithm name as found in version metadata (`sha1`, `sha256`, `md5`)
    pub algorithm: String,
    /// Hex digest; compared case-insensitively
    pub hash: String,
}

impl Checksum {
    pub fn new(algorithm: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            hash: hash.into(),
        }
    }

    pub fn sha1(hash: impl Into<String>) -> Self {
        Self::new("sha1", hash)
    }

    /// Some mirrors publish artifacts without a hash. An empty digest means
    /// "trust the file once it exists".
    pub fn is_empty(&self) -> bool {
        self.hash.trim().is_empty()
    }
}

/// One logical artifact: where it may come from and where it goes.
#[derive(Debug, Clone)]
pub struct DownloadSpec {
    /// Candidate URLs, tried strictly in order
    pub urls: Vec<String>,
    pub destination: PathBuf,
    pub checksum: Option<Checksum>,
    /// Retries per candidate for recoverable failures; `None` uses the downloader's default
    pub retry: Option<usize>,
    /// Per-attempt timeout; `None` uses the downloader's default
    pub timeout: Option<Duration>,
}

impl DownloadSpec {
    pub fn new<I, S>(urls: I, destination: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            destination: destination.into(),
            checksum: None,
            retry: None,
            timeout: None,
        }
    }

    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = Some(checksum);
        self
    }

    pub fn with_sha1(self, hash: impl Into<String>) -> Self {
        self.with_checksum(Checksum::sha1(hash))
    }

    pub fn with_retry(mut self, retry: usize) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// The checksum to verify against, if any.
    ///
    /// Returns `None` both when no checksum was given and when its digest is
    /// empty.
    pub fn effective_checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref().filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_digest_means_no_checksum() {
        let spec = DownloadSpec::new(["https://a/b"], "/tmp/b").with_sha1("");
        assert!(spec.checksum.is_some());
        assert!(spec.effective_checksum().is_none());

        let spec = spec.with_sha1("abc");
        assert_eq!(spec.effective_checksum().map(|c| c.hash.as_str()), Some("abc"));
    }
}
