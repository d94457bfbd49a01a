//! Install pipeline
//!
//! Task tree of a full install, with the weight each child occupies in its
//! parent:
//!
//! ```text
//! install                      (total 100)
//! ├─ installVersion      20    (total 100)
//! │  ├─ json             40
//! │  └─ jar              60
//! └─ installDependencies 80    (total 100)  client installs
//!    ├─ installAssets    50    (total = sum of object sizes)
//!    │  ├─ assetsJson     0
//!    │  └─ asset × n   size
//!    └─ installLibraries 50    (total = 10 × n)
//!       └─ library × n   10
//! ```
//!
//! A server install replaces `installDependencies` with `installLibraries`.
//! Every entry point comes as a `*_task` builder, to run under a caller's
//! [`TaskRunner`], and as an `async fn` that runs it to completion.

use std::collections::HashSet;
use std::path::PathBuf;

use futures::FutureExt;
use tracing::{info, Instrument};

use super::assets::{AssetIndex, AssetObject};
use super::layout::MinecraftFolder;
use super::options::InstallOptions;
use super::version::{InstallKind, ResolvedLibrary, ResolvedVersion};
use crate::download::{Checksum, DownloadSpec, FileFetcher};
use crate::error::{AggregateError, InstallError, Result};
use crate::task::{Task, TaskContext, TaskRunner};

const LIBRARY_WEIGHT: u64 = 10;

/// Install a version and everything it depends on
pub async fn install(
    kind: InstallKind,
    version: ResolvedVersion,
    options: &InstallOptions,
) -> Result<ResolvedVersion> {
    TaskRunner::new().run(install_task(kind, version, options)).await
}

/// Descriptor and archive first, then assets and libraries (client) or
/// libraries only (server)
pub fn install_task(
    kind: InstallKind,
    version: ResolvedVersion,
    options: &InstallOptions,
) -> Task<ResolvedVersion> {
    let options = options.clone();
    let id = version.id.clone();
    Task::create("install", move |ctx| {
        let span = tracing::info_span!("install", version = %version.id, %kind);
        async move {
            ctx.update(0, 100);
            info!("installing version");
            let version = ctx
                .execute(install_version_task(kind, version, &options), 20)
                .await?;
            let version = match kind {
                InstallKind::Client => {
                    ctx.execute(install_dependencies_task(version, &options), 80)
                        .await?
                }
                InstallKind::Server => {
                    ctx.execute(install_libraries_task(version, &options), 80)
                        .await?
                }
            };
            info!("version installed");
            Ok(version)
        }
        .instrument(span)
    })
    .with_param("version", id)
}

/// Install only the version descriptor and the client or server archive
pub async fn install_version(
    kind: InstallKind,
    version: ResolvedVersion,
    options: &InstallOptions,
) -> Result<ResolvedVersion> {
    TaskRunner::new()
        .run(install_version_task(kind, version, options))
        .await
}

pub fn install_version_task(
    kind: InstallKind,
    version: ResolvedVersion,
    options: &InstallOptions,
) -> Task<ResolvedVersion> {
    let fetcher = options.fetcher();
    let jar_override = options.jar_override(kind).map(str::to_string);
    let id = version.id.clone();
    Task::create("installVersion", move |ctx| async move {
        ctx.update(0, 100);
        let folder = MinecraftFolder::new(&version.minecraft_directory);

        let json = DownloadSpec::new([version.url.clone()], folder.version_json(&version.id));
        let json = match version.descriptor_sha1() {
            Some(sha1) => json.with_sha1(sha1),
            None => json,
        };
        ctx.execute(fetcher.fetch_task("json", json), 40).await?;

        let jar = jar_spec(kind, &version, &folder, jar_override.as_deref())?;
        ctx.execute(fetcher.fetch_task("jar", jar), 60).await?;
        Ok(version)
    })
    .with_param("version", id)
    .with_param("kind", kind)
}

fn jar_spec(
    kind: InstallKind,
    version: &ResolvedVersion,
    folder: &MinecraftFolder,
    url_override: Option<&str>,
) -> Result<DownloadSpec> {
    let download = version.download(kind).ok_or_else(|| {
        InstallError::validation(format!(
            "version {} has no {} download",
            version.id, kind
        ))
    })?;
    let urls = url_override
        .into_iter()
        .map(str::to_string)
        .chain(std::iter::once(download.url.clone()));
    Ok(DownloadSpec::new(urls, folder.version_jar(&version.id, kind))
        .with_checksum(Checksum::sha1(download.sha1.clone())))
}

/// Install assets and libraries concurrently
pub async fn install_dependencies(
    version: ResolvedVersion,
    options: &InstallOptions,
) -> Result<ResolvedVersion> {
    TaskRunner::new()
        .run(install_dependencies_task(version, options))
        .await
}

pub fn install_dependencies_task(
    version: ResolvedVersion,
    options: &InstallOptions,
) -> Task<ResolvedVersion> {
    let options = options.clone();
    let id = version.id.clone();
    Task::create("installDependencies", move |ctx| async move {
        ctx.update(0, 100);
        let assets = ctx.execute(install_assets_task(version.clone(), &options), 50);
        let libraries = ctx.execute(install_libraries_task(version, &options), 50);
        if options.fail_fast() {
            let (version, _) = futures::try_join!(assets, libraries)?;
            return Ok(version);
        }

        // Best-effort: a failed batch must not drop its sibling; only
        // cancellation short-circuits.
        let (assets, libraries) = futures::try_join!(
            assets.map(unless_cancelled),
            libraries.map(unless_cancelled)
        )?;
        let (version, _) = merge_batches(assets, libraries)?;
        Ok(version)
    })
    .with_param("version", id)
}

fn unless_cancelled<T>(result: Result<T>) -> Result<Result<T>> {
    match result {
        Err(e) if e.is_cancelled() => Err(e),
        other => Ok(other),
    }
}

/// Join two best-effort batch results. A single failure is returned as is;
/// two failures are flattened into one [`AggregateError`].
fn merge_batches<A, B>(a: Result<A>, b: Result<B>) -> Result<(A, B)> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        (Err(a), Err(b)) => {
            let errors = [a, b]
                .into_iter()
                .flat_map(|e| match e {
                    InstallError::Aggregate(aggregate) => aggregate.errors,
                    other => vec![other],
                })
                .collect();
            Err(AggregateError::new(errors).into())
        }
    }
}

/// Install the asset index and every object it lists
pub async fn install_assets(
    version: ResolvedVersion,
    options: &InstallOptions,
) -> Result<ResolvedVersion> {
    TaskRunner::new()
        .run(install_assets_task(version, options))
        .await
}

pub fn install_assets_task(version: ResolvedVersion, options: &InstallOptions) -> Task<ResolvedVersion> {
    let options = options.clone();
    let id = version.id.clone();
    Task::create("installAssets", move |ctx| async move {
        let folder = MinecraftFolder::new(&version.minecraft_directory);
        let fetcher = options.fetcher();

        let index_path = folder.asset_index(&version.assets);
        let index_spec = DownloadSpec::new([version.asset_index.url.clone()], &index_path)
            .with_sha1(version.asset_index.sha1.clone());
        ctx.execute(fetcher.fetch_task("assetsJson", index_spec), 0)
            .await?;

        let objects = AssetIndex::read(&index_path).await?.unique_objects();
        let total: u64 = objects.iter().map(|o| o.size).sum();
        ctx.update(0, total);
        info!(objects = objects.len(), bytes = total, "installing assets");

        let (ctx, folder, options, fetcher) = (&ctx, &folder, &options, &fetcher);
        options
            .assets_pool()
            .run(objects, move |object| async move {
                let weight = object.size;
                let task = asset_task(object, folder, options, fetcher);
                ctx.execute(task, weight).await.map(|_| ())
            })
            .await?;
        Ok(version)
    })
    .with_param("version", id)
}

fn asset_task(
    object: AssetObject,
    folder: &MinecraftFolder,
    options: &InstallOptions,
    fetcher: &FileFetcher,
) -> Task<bool> {
    let spec = DownloadSpec::new(options.asset_candidates(&object.hash), folder.asset_object(&object.hash))
        .with_sha1(object.hash.clone());
    fetcher.fetch_task("asset", spec).with_param("hash", &object.hash)
}

/// Install every library of a version
pub async fn install_libraries(
    version: ResolvedVersion,
    options: &InstallOptions,
) -> Result<ResolvedVersion> {
    TaskRunner::new()
        .run(install_libraries_task(version, options))
        .await
}

pub fn install_libraries_task(
    version: ResolvedVersion,
    options: &InstallOptions,
) -> Task<ResolvedVersion> {
    let options = options.clone();
    let id = version.id.clone();
    Task::create("installLibraries", move |ctx| async move {
        let folder = MinecraftFolder::new(&version.minecraft_directory);
        install_library_list(&ctx, version.libraries.clone(), &folder, &options).await?;
        Ok(version)
    })
    .with_param("version", id)
}

/// Install libraries that do not belong to a resolved version
pub async fn install_resolved_libraries(
    libraries: Vec<ResolvedLibrary>,
    minecraft_directory: impl Into<PathBuf>,
    options: &InstallOptions,
) -> Result<()> {
    TaskRunner::new()
        .run(install_resolved_libraries_task(
            libraries,
            minecraft_directory,
            options,
        ))
        .await
}

pub fn install_resolved_libraries_task(
    libraries: Vec<ResolvedLibrary>,
    minecraft_directory: impl Into<PathBuf>,
    options: &InstallOptions,
) -> Task<()> {
    let options = options.clone();
    let folder = MinecraftFolder::new(minecraft_directory);
    Task::create("installLibraries", move |ctx| async move {
        install_library_list(&ctx, libraries, &folder, &options).await
    })
}

async fn install_library_list(
    ctx: &TaskContext,
    libraries: Vec<ResolvedLibrary>,
    folder: &MinecraftFolder,
    options: &InstallOptions,
) -> Result<()> {
    let libraries = unique_libraries(libraries);
    ctx.update(0, libraries.len() as u64 * LIBRARY_WEIGHT);
    info!(libraries = libraries.len(), "installing libraries");

    let fetcher = options.fetcher();
    let fetcher = &fetcher;
    options
        .libraries_pool()
        .run(libraries, move |library| async move {
            let task = library_task(library, folder, options, fetcher);
            ctx.execute(task, LIBRARY_WEIGHT).await.map(|_| ())
        })
        .await
}

/// One entry per destination path, so no two workers write the same file
fn unique_libraries(libraries: Vec<ResolvedLibrary>) -> Vec<ResolvedLibrary> {
    let mut seen = HashSet::new();
    libraries
        .into_iter()
        .filter(|library| seen.insert(library.download.path.clone()))
        .collect()
}

fn library_task(
    library: ResolvedLibrary,
    folder: &MinecraftFolder,
    options: &InstallOptions,
    fetcher: &FileFetcher,
) -> Task<bool> {
    let spec = DownloadSpec::new(
        options.library_candidates(&library),
        folder.library(&library.download.path),
    )
    .with_sha1(library.download.sha1.clone());
    fetcher.fetch_task("library", spec).with_param("lib", &library.name)
}
