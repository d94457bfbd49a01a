//! Transfer engine interface
//!
//! A [`Downloader`] moves the bytes of one [`DownloadSpec`] onto disk. The
//! caller observes and steers it through a [`TransferControl`]: per-chunk
//! progress, a place to register the pause hook, and a cancellation token.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::error::Result;
use super::spec::DownloadSpec;
use crate::task::{Pausable, TaskContext};

/// Progress of the current attempt, reported once per written chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    pub chunk_len: u64,
    /// Bytes written by this attempt so far
    pub written: u64,
    /// Total size when the source announced one
    pub total: Option<u64>,
    /// Candidate currently being read
    pub url: String,
}

pub type TransferProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;
pub type PauseRegistrar = Arc<dyn Fn(Option<Arc<dyn Pausable>>) + Send + Sync>;

/// How the owner of a transfer observes and steers it
#[derive(Clone, Default)]
pub struct TransferControl {
    progress: Option<TransferProgressCallback>,
    pause_registrar: Option<PauseRegistrar>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for TransferControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferControl")
            .field("has_progress", &self.progress.is_some())
            .field("has_pause_registrar", &self.pause_registrar.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl TransferControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire a transfer to the task running it: progress becomes the task's
    /// own progress, the pause hook is registered on the task node, and task
    /// cancellation aborts the transfer.
    pub fn for_task(ctx: &TaskContext) -> Self {
        let progress_ctx = ctx.clone();
        let pause_ctx = ctx.clone();
        Self {
            progress: Some(Arc::new(move |p: TransferProgress| {
                progress_ctx.update(p.written, p.total);
            })),
            pause_registrar: Some(Arc::new(move |hook| pause_ctx.set_pausable(hook))),
            cancel: ctx.cancellation_token(),
        }
    }

    pub fn with_progress(mut self, callback: TransferProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn with_pause_registrar(mut self, registrar: PauseRegistrar) -> Self {
        self.pause_registrar = Some(registrar);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn report(&self, progress: TransferProgress) {
        if let Some(ref callback) = self.progress {
            callback(progress);
        }
    }

    pub fn register_pausable(&self, hook: Option<Arc<dyn Pausable>>) {
        if let Some(ref registrar) = self.pause_registrar {
            registrar(hook);
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Moves one artifact from its candidates onto disk.
///
/// Candidates are tried strictly in order; the first success wins and the
/// last error is returned when all of them fail. Integrity checking is the
/// caller's business.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the number of bytes written
    async fn download(&self, spec: &DownloadSpec, control: &TransferControl) -> Result<u64>;
}

/// Pause hook for a byte-copy loop: the loop awaits
/// [`wait_resumed`](Self::wait_resumed) before every chunk.
#[derive(Debug)]
pub struct PauseSwitch {
    paused: watch::Sender<bool>,
}

impl PauseSwitch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            paused: watch::Sender::new(false),
        })
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Completes immediately unless paused
    pub async fn wait_resumed(&self) {
        let mut rx = self.paused.subscribe();
        let _ = rx.wait_for(|paused| !*paused).await;
    }
}

impl Pausable for PauseSwitch {
    fn pause(&self) {
        self.paused.send_replace(true);
    }

    fn resume(&self) {
        self.paused.send_replace(false);
    }
}

/// Sibling path the bytes are staged in before the final rename
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Removes a staged file unless the transfer committed it.
///
/// Dropping the transfer future (cancellation) runs this too, so an aborted
/// transfer never leaves bytes behind.
#[derive(Debug)]
pub(crate) struct PartFileGuard {
    path: PathBuf,
    armed: bool,
}

impl PartFileGuard {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartFileGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/mc/versions/1.20/1.20.jar")),
            PathBuf::from("/mc/versions/1.20/1.20.jar.part")
        );
        assert_ne!(
            part_path(Path::new("/v/1.20.jar")),
            part_path(Path::new("/v/1.20.json"))
        );
    }

    #[tokio::test]
    async fn pause_switch_blocks_until_resumed() {
        let switch = PauseSwitch::new();
        switch.wait_resumed().await;

        switch.pause();
        assert!(switch.is_paused());
        let waiter = {
            let switch = switch.clone();
            tokio::spawn(async move { switch.wait_resumed().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        switch.resume();
        waiter.await.unwrap();
    }

    #[test]
    fn guard_removes_staged_file_unless_disarmed() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("a.part");
        std::fs::write(&staged, b"partial").unwrap();
        drop(PartFileGuard::new(staged.clone()));
        assert!(!staged.exists());

        std::fs::write(&staged, b"complete").unwrap();
        PartFileGuard::new(staged.clone()).disarm();
        assert!(staged.exists());
    }
}
