//! Transfer counters
//!
//! Shared by the HTTP downloader and the install bridge so a caller can see
//! how much of an install was served from disk.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for one downloader (or one install)
#[derive(Debug, Default)]
pub struct DownloadMetrics {
    pub transfers_started: AtomicU64,
    pub transfers_completed: AtomicU64,
    pub transfers_failed: AtomicU64,
    /// Times a transfer moved on to its next candidate URL
    pub fallbacks: AtomicU64,
    pub retries: AtomicU64,
    /// Artifacts the strategy found already correct on disk
    pub skipped: AtomicU64,
    pub checksum_failures: AtomicU64,
    pub bytes: AtomicU64,
}

impl DownloadMetrics {
    pub fn record_started(&self) {
        self.transfers_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.transfers_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.transfers_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_checksum_failure(&self) {
        self.checksum_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DownloadMetricsSnapshot {
        DownloadMetricsSnapshot {
            transfers_started: self.transfers_started.load(Ordering::Relaxed),
            transfers_completed: self.transfers_completed.load(Ordering::Relaxed),
            transfers_failed: self.transfers_failed.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DownloadMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadMetricsSnapshot {
    pub transfers_started: u64,
    pub transfers_completed: u64,
    pub transfers_failed: u64,
    pub fallbacks: u64,
    pub retries: u64,
    pub skipped: u64,
    pub checksum_failures: u64,
    pub bytes: u64,
}

impl DownloadMetricsSnapshot {
    /// Artifacts looked at, whether transferred or not
    pub fn artifacts_seen(&self) -> u64 {
        self.transfers_started + self.skipped
    }
}
