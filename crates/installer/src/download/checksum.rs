//! Content digests
//!
//! Hashing reads the whole file, so it runs on the blocking pool and the
//! calling task simply awaits it like any other I/O.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use sha2::Digest;
use tracing::debug;

use super::error::{DownloadError, FileOperation, Result};
use super::spec::Checksum;

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Digest algorithms found in version metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Md5,
}

impl FromStr for HashAlgorithm {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(HashAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "md5" => Ok(HashAlgorithm::Md5),
            _ => Err(DownloadError::UnsupportedAlgorithm {
                algorithm: s.to_string(),
            }),
        }
    }
}

impl HashAlgorithm {
    /// Hex digest of an in-memory buffer
    pub fn digest_bytes(self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha1 => hex::encode(sha1::Sha1::digest(data)),
            HashAlgorithm::Sha256 => hex::encode(sha2::Sha256::digest(data)),
            HashAlgorithm::Md5 => hex::encode(md5::Md5::digest(data)),
        }
    }

    fn digest_reader(self, reader: impl Read) -> std::io::Result<String> {
        match self {
            HashAlgorithm::Sha1 => hash_reader::<sha1::Sha1>(reader),
            HashAlgorithm::Sha256 => hash_reader::<sha2::Sha256>(reader),
            HashAlgorithm::Md5 => hash_reader::<md5::Md5>(reader),
        }
    }
}

fn hash_reader<D: Digest>(mut reader: impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute the hex digest of a file
pub async fn file_digest(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let owned: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&owned)
            .map_err(|e| DownloadError::fs(&owned, FileOperation::Read, e))?;
        algorithm
            .digest_reader(std::io::BufReader::new(file))
            .map_err(|e| DownloadError::fs(&owned, FileOperation::Read, e))
    })
    .await
    .map_err(|e| DownloadError::HashTask {
        file: path.to_path_buf(),
        reason: e.to_string(),
    })?
}

/// Outcome of checking a file against its expected digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub matches: bool,
    pub actual: String,
}

/// Hash `path` with the checksum's algorithm and compare case-insensitively
pub async fn verify_file(path: &Path, checksum: &Checksum) -> Result<Verification> {
    let algorithm: HashAlgorithm = checksum.algorithm.parse()?;
    let actual = file_digest(path, algorithm).await?;
    let matches = actual.eq_ignore_ascii_case(checksum.hash.trim());
    debug!(
        path = %path.display(),
        expected = %checksum.hash,
        actual = %actual,
        matches,
        "checksum verified"
    );
    Ok(Verification { matches, actual })
}
