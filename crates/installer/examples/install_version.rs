//! Install a resolved version described by a JSON file
//!
//! Run this example with:
//! ```
//! RUST_LOG=mc_installer=debug cargo run --example install_version -- resolved.json [client|server]
//! ```
//!
//! Ctrl-C cancels the install and leaves no partial files behind.

use std::time::Duration;

use anyhow::{bail, Context};
use mc_installer::{
    install_task, DownloadConfig, InstallKind, InstallOptions, LogReporter, ResolvedVersion,
    TaskRunner,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: install_version <resolved-version.json> [client|server]");
    };
    let kind = match args.next().as_deref() {
        None | Some("client") => InstallKind::Client,
        Some("server") => InstallKind::Server,
        Some(other) => bail!("unknown install kind '{other}'"),
    };

    let raw = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {path}"))?;
    let version: ResolvedVersion =
        serde_json::from_slice(&raw).with_context(|| format!("parsing {path}"))?;

    let options = InstallOptions::from_config(DownloadConfig::from_env()?)?;
    let handle = TaskRunner::new()
        .with_reporter(LogReporter)
        .execute(install_task(kind, version, &options));
    let root = handle.root().clone();

    let ticker = tokio::spawn({
        let root = root.clone();
        async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            while !root.state().is_terminal() {
                interval.tick().await;
                if let Some(percent) = root.progress().percent() {
                    println!("{percent:5.1}%");
                }
            }
        }
    });

    let result = tokio::select! {
        result = handle.wait() => result,
        _ = tokio::signal::ctrl_c() => {
            root.cancel();
            println!("cancelling...");
            Err(mc_installer::InstallError::Cancelled { task: root.path().to_string() })
        }
    };
    ticker.abort();

    let metrics = options.metrics().snapshot();
    println!(
        "transferred {} of {} artifacts ({} bytes, {} fallbacks, {} retries)",
        metrics.transfers_completed,
        metrics.artifacts_seen(),
        metrics.bytes,
        metrics.fallbacks,
        metrics.retries
    );

    let installed = result?;
    println!("installed {} ({kind})", installed.id);
    Ok(())
}
