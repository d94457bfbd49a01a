//! Artifact download subsystem
//!
//! This module is organized by concern:
//! - `spec`: what to fetch ([`DownloadSpec`], [`Checksum`])
//! - `mirrors`: ordered candidate URLs for one artifact
//! - `strategy`: whether a transfer is needed at all
//! - `transfer` / `http`: moving bytes with progress, pause and cancellation
//! - `pool`: draining large collections with bounded concurrency
//! - `fetch`: verify-then-transfer inside a task

mod checksum;
mod config;
mod error;
mod fetch;
mod http;
mod metrics;
mod mirrors;
mod pool;
mod spec;
mod strategy;
mod transfer;

pub use checksum::{file_digest, verify_file, HashAlgorithm, Verification};
pub use config::{DownloadConfig, DownloadConfigBuilder};
pub use error::{DownloadError, FileOperation, Result};
pub use fetch::FileFetcher;
pub use http::HttpDownloader;
pub use metrics::{DownloadMetrics, DownloadMetricsSnapshot};
pub use mirrors::{join_url, CandidateList};
pub use pool::WorkerPool;
pub use spec::{Checksum, DownloadSpec};
pub use strategy::{AlwaysDownload, ChecksumStrategy, DownloadStrategy};
pub use transfer::{
    part_path, Downloader, PauseRegistrar, PauseSwitch, TransferControl, TransferProgress,
    TransferProgressCallback,
};
