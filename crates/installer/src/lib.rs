//! Minecraft Installer Library
//!
//! Installs game versions from an already-resolved description: version
//! descriptor, client or server archive, asset index and objects, and
//! libraries. Every artifact is verified before and after transfer, tried
//! against a prioritized list of mirrors, and written atomically.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mc_installer::{install_task, InstallKind, InstallOptions, LogReporter, ResolvedVersion, TaskRunner};
//!
//! # async fn example(version: ResolvedVersion) -> mc_installer::Result<()> {
//! let options = InstallOptions::new()?
//!     .with_assets_hosts(["https://assets.mirror.example"])
//!     .with_fail_fast(false);
//!
//! let handle = TaskRunner::new()
//!     .with_reporter(LogReporter)
//!     .execute(install_task(InstallKind::Client, version, &options));
//!
//! // The handle can pause, resume or cancel the whole tree meanwhile
//! let installed = handle.wait().await?;
//! println!("installed {}", installed.id);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Task tree**: weighted progress, dotted-path events, pause and cancel
//! - **Mirror fallback**: overrides, canonical URL and mirrors in strict order
//! - **Retry logic**: exponential backoff per candidate for transient failures
//! - **Checksums**: SHA-1, SHA-256 and MD5 before and after each transfer
//! - **Batches**: bounded worker pools, fail-fast or best-effort

pub mod download;
pub mod error;
pub mod install;
pub mod task;

pub use download::{
    Checksum, DownloadConfig, DownloadError, DownloadMetrics, DownloadSpec, Downloader,
    FileFetcher, HttpDownloader, WorkerPool,
};
pub use error::{AggregateError, InstallError, Result};
pub use install::{
    fetch_version_list, install, install_assets, install_dependencies, install_libraries,
    install_resolved_libraries, install_task, install_version, InstallKind, InstallOptions,
    MinecraftFolder, ResolvedLibrary, ResolvedVersion, VersionList,
};
pub use task::{
    LogReporter, Task, TaskContext, TaskEvent, TaskHandle, TaskReporter, TaskRunner, TaskState,
};
