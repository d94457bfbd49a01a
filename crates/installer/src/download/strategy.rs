//! Should-transfer decisions

use async_trait::async_trait;
use tracing::debug;

use super::checksum::verify_file;
use super::error::{DownloadError, FileOperation, Result};
use super::spec::DownloadSpec;

/// Decides from local state alone whether an artifact must be fetched.
///
/// Implementations read the disk only; they never touch the network.
#[async_trait]
pub trait DownloadStrategy: Send + Sync {
    async fn should_download(&self, spec: &DownloadSpec) -> Result<bool>;
}

/// The default strategy: fetch when the file is missing or its digest does
/// not match. A file with no (or an empty) checksum is trusted once present.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumStrategy;

#[async_trait]
impl DownloadStrategy for ChecksumStrategy {
    async fn should_download(&self, spec: &DownloadSpec) -> Result<bool> {
        let path = spec.destination();
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "artifact missing");
                return Ok(true);
            }
            Err(e) => return Err(DownloadError::fs(path, FileOperation::Metadata, e)),
        }

        let Some(checksum) = spec.effective_checksum() else {
            debug!(path = %path.display(), "artifact present, no checksum to verify");
            return Ok(false);
        };

        let verification = verify_file(path, checksum).await?;
        if !verification.matches {
            debug!(
                path = %path.display(),
                expected = %checksum.hash,
                actual = %verification.actual,
                "artifact corrupted, will fetch again"
            );
        }
        Ok(!verification.matches)
    }
}

/// Always transfers, for forced reinstalls
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDownload;

#[async_trait]
impl DownloadStrategy for AlwaysDownload {
    async fn should_download(&self, _spec: &DownloadSpec) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::checksum::HashAlgorithm;

    #[tokio::test]
    async fn missing_file_must_be_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let spec = DownloadSpec::new(["https://a/x"], dir.path().join("x"));
        assert!(ChecksumStrategy.should_download(&spec).await.unwrap());
    }

    #[tokio::test]
    async fn present_file_without_checksum_is_trusted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x");
        tokio::fs::write(&path, b"anything").await.unwrap();

        let bare = DownloadSpec::new(["https://a/x"], &path);
        assert!(!ChecksumStrategy.should_download(&bare).await.unwrap());

        let empty = DownloadSpec::new(["https://a/x"], &path).with_sha1("");
        assert!(!ChecksumStrategy.should_download(&empty).await.unwrap());
    }

    #[tokio::test]
    async fn corrupted_file_must_be_fetched_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x");
        tokio::fs::write(&path, b"corrupted").await.unwrap();

        let expected = HashAlgorithm::Sha1.digest_bytes(b"original");
        let spec = DownloadSpec::new(["https://a/x"], &path).with_sha1(expected.clone());
        assert!(ChecksumStrategy.should_download(&spec).await.unwrap());

        tokio::fs::write(&path, b"original").await.unwrap();
        let spec = spec.with_sha1(expected.to_uppercase());
        assert!(!ChecksumStrategy.should_download(&spec).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_algorithm_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x");
        tokio::fs::write(&path, b"data").await.unwrap();

        let spec = DownloadSpec::new(["https://a/x"], &path)
            .with_checksum(crate::download::Checksum::new("crc32", "deadbeef"));
        assert!(matches!(
            ChecksumStrategy.should_download(&spec).await,
            Err(DownloadError::UnsupportedAlgorithm { .. })
        ));
    }
}
