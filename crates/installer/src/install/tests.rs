//! End-to-end install tests against a local mock mirror

use super::*;
use crate::download::{
    part_path, DownloadConfig, DownloadError, DownloadSpec, Downloader, HashAlgorithm,
    TransferControl,
};
use crate::error::InstallError;
use crate::task::{TaskRunner, TaskSnapshot, TaskState};

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::{tempdir, TempDir};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const DESCRIPTOR: &[u8] = br#"{"id":"1.20.1","type":"release"}"#;
const CLIENT_JAR: &[u8] = b"client archive bytes";
const SERVER_JAR: &[u8] = b"server archive bytes";
const LIBRARY_JAR: &[u8] = b"library archive bytes";
const ASSET_A: &[u8] = b"first asset";
const ASSET_B: &[u8] = b"second asset, a bit longer";
const LIBRARY_PATH: &str = "org/ow2/asm/asm/9.5/asm-9.5.jar";

fn sha1_of(data: &[u8]) -> String {
    HashAlgorithm::Sha1.digest_bytes(data)
}

fn asset_index() -> Vec<u8> {
    // Two names share the first object, which must still be fetched once
    serde_json::json!({
        "objects": {
            "icons/icon_16x16.png": { "hash": sha1_of(ASSET_A), "size": ASSET_A.len() },
            "minecraft/icons/icon_16x16.png": { "hash": sha1_of(ASSET_A), "size": ASSET_A.len() },
            "sounds/ambient/cave1.ogg": { "hash": sha1_of(ASSET_B), "size": ASSET_B.len() }
        }
    })
    .to_string()
    .into_bytes()
}

fn asset_route(data: &[u8]) -> String {
    let hash = sha1_of(data);
    format!("/assets/{}/{}", &hash[..2], hash)
}

fn test_config() -> DownloadConfig {
    DownloadConfig::builder()
        .max_retries(0)
        .retry_delay(Duration::from_millis(1))
        .timeout(Duration::from_secs(5))
        .build()
}

/// A mock mirror plus an empty game directory
struct Fixture {
    server: MockServer,
    dir: TempDir,
}

impl Fixture {
    async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            dir: tempdir().unwrap(),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.server.uri(), route)
    }

    fn folder(&self) -> MinecraftFolder {
        MinecraftFolder::new(self.dir.path())
    }

    fn library(&self) -> ResolvedLibrary {
        ResolvedLibrary {
            name: "org.ow2.asm:asm:9.5".into(),
            download: LibraryDownload {
                path: LIBRARY_PATH.into(),
                url: self.url(&format!("/libraries/{LIBRARY_PATH}")),
                sha1: sha1_of(LIBRARY_JAR),
                size: LIBRARY_JAR.len() as u64,
            },
        }
    }

    fn version(&self) -> ResolvedVersion {
        ResolvedVersion {
            id: "1.20.1".into(),
            minecraft_directory: self.dir.path().to_path_buf(),
            url: self.url("/versions/1.20.1.json"),
            sha1: Some(sha1_of(DESCRIPTOR)),
            assets: "5".into(),
            asset_index: AssetIndexRef {
                url: self.url("/indexes/5.json"),
                sha1: sha1_of(&asset_index()),
                size: asset_index().len() as u64,
            },
            downloads: VersionDownloads {
                client: Some(ArtifactDownload {
                    url: self.url("/client.jar"),
                    sha1: sha1_of(CLIENT_JAR),
                    size: CLIENT_JAR.len() as u64,
                }),
                server: Some(ArtifactDownload {
                    url: self.url("/server.jar"),
                    sha1: sha1_of(SERVER_JAR),
                    size: SERVER_JAR.len() as u64,
                }),
            },
            libraries: vec![self.library()],
        }
    }

    fn options(&self) -> InstallOptions {
        InstallOptions::from_config(test_config())
            .unwrap()
            .with_assets_hosts([self.url("/assets")])
    }

    async fn mount(&self, route: &str, body: &[u8], expected: u64) {
        Mock::given(method("GET"))
            .and(path(route.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    /// Every artifact of a client install, each expected `times` times
    async fn mount_client(&self, times: u64) {
        self.mount("/versions/1.20.1.json", DESCRIPTOR, times).await;
        self.mount("/client.jar", CLIENT_JAR, times).await;
        self.mount("/indexes/5.json", &asset_index(), times).await;
        self.mount(&asset_route(ASSET_A), ASSET_A, times).await;
        self.mount(&asset_route(ASSET_B), ASSET_B, times).await;
        self.mount(&format!("/libraries/{LIBRARY_PATH}"), LIBRARY_JAR, times)
            .await;
    }
}

fn no_leftovers(destination: &Path) -> bool {
    !destination.exists() && !part_path(destination).exists()
}

#[tokio::test]
async fn client_install_fetches_every_artifact_once() {
    let fx = Fixture::start().await;
    fx.mount_client(1).await;
    let options = fx.options();
    let version = fx.version();

    let handle = TaskRunner::new().execute(install_task(InstallKind::Client, version.clone(), &options));
    let root = handle.root().clone();
    let installed = handle.wait().await.unwrap();

    assert_eq!(installed, version);
    assert_eq!(root.state(), TaskState::Succeeded);
    assert_eq!(root.progress().current, 100);
    assert_eq!(root.progress().total, Some(100));

    let folder = fx.folder();
    assert_eq!(tokio::fs::read(folder.version_json("1.20.1")).await.unwrap(), DESCRIPTOR);
    assert_eq!(
        tokio::fs::read(folder.version_jar("1.20.1", InstallKind::Client)).await.unwrap(),
        CLIENT_JAR
    );
    assert_eq!(tokio::fs::read(folder.library(LIBRARY_PATH)).await.unwrap(), LIBRARY_JAR);
    assert_eq!(tokio::fs::read(folder.asset_object(&sha1_of(ASSET_A))).await.unwrap(), ASSET_A);
    assert_eq!(tokio::fs::read(folder.asset_object(&sha1_of(ASSET_B))).await.unwrap(), ASSET_B);

    // descriptor, jar, index, two distinct objects, one library
    let metrics = options.metrics().snapshot();
    assert_eq!(metrics.transfers_completed, 6);
    assert_eq!(metrics.transfers_failed, 0);
}

#[tokio::test]
async fn second_install_makes_no_requests() {
    let fx = Fixture::start().await;
    fx.mount_client(1).await;
    let options = fx.options();

    install(InstallKind::Client, fx.version(), &options).await.unwrap();
    install(InstallKind::Client, fx.version(), &options).await.unwrap();

    let metrics = options.metrics().snapshot();
    assert_eq!(metrics.transfers_started, 6);
    assert_eq!(metrics.skipped, 6);
    fx.server.verify().await;
}

#[tokio::test]
async fn only_the_missing_asset_is_transferred() {
    let fx = Fixture::start().await;
    let folder = fx.folder();
    let on_disk = [
        (folder.version_json("1.20.1"), DESCRIPTOR.to_vec()),
        (folder.version_jar("1.20.1", InstallKind::Client), CLIENT_JAR.to_vec()),
        (folder.asset_index("5"), asset_index()),
        (folder.asset_object(&sha1_of(ASSET_A)), ASSET_A.to_vec()),
        (folder.library(LIBRARY_PATH), LIBRARY_JAR.to_vec()),
    ];
    for (path, data) in &on_disk {
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, data).await.unwrap();
    }
    fx.mount("/versions/1.20.1.json", DESCRIPTOR, 0).await;
    fx.mount("/client.jar", CLIENT_JAR, 0).await;
    fx.mount("/indexes/5.json", &asset_index(), 0).await;
    fx.mount(&asset_route(ASSET_A), ASSET_A, 0).await;
    fx.mount(&asset_route(ASSET_B), ASSET_B, 1).await;
    fx.mount(&format!("/libraries/{LIBRARY_PATH}"), LIBRARY_JAR, 0).await;

    let options = fx.options();
    let version = fx.version();
    let handle = TaskRunner::new().execute(install_task(InstallKind::Client, version.clone(), &options));
    let root = handle.root().clone();
    let installed = handle.wait().await.unwrap();

    assert_eq!(installed, version);
    assert_eq!(root.state(), TaskState::Succeeded);
    assert_eq!(options.metrics().snapshot().transfers_started, 1);
    assert_eq!(tokio::fs::read(folder.asset_object(&sha1_of(ASSET_B))).await.unwrap(), ASSET_B);
}

#[tokio::test]
async fn server_install_skips_assets() {
    let fx = Fixture::start().await;
    fx.mount("/versions/1.20.1.json", DESCRIPTOR, 1).await;
    fx.mount("/server.jar", SERVER_JAR, 1).await;
    fx.mount("/client.jar", CLIENT_JAR, 0).await;
    fx.mount("/indexes/5.json", &asset_index(), 0).await;
    fx.mount(&format!("/libraries/{LIBRARY_PATH}"), LIBRARY_JAR, 1).await;

    install(InstallKind::Server, fx.version(), &fx.options()).await.unwrap();

    let folder = fx.folder();
    assert_eq!(
        tokio::fs::read(folder.version_root("1.20.1").join("1.20.1-server.jar")).await.unwrap(),
        SERVER_JAR
    );
    assert!(folder.library(LIBRARY_PATH).exists());
    assert!(!folder.assets().exists());
}

#[tokio::test]
async fn jar_url_override_replaces_canonical_url() {
    let fx = Fixture::start().await;
    fx.mount("/versions/1.20.1.json", DESCRIPTOR, 1).await;
    fx.mount("/mirror/client.jar", CLIENT_JAR, 1).await;
    fx.mount("/client.jar", CLIENT_JAR, 0).await;

    let options = fx.options().with_client_jar_url(fx.url("/mirror/client.jar"));
    install_version(InstallKind::Client, fx.version(), &options).await.unwrap();

    assert!(fx.folder().version_jar("1.20.1", InstallKind::Client).exists());
}

#[tokio::test]
async fn missing_server_download_is_validation_error() {
    let fx = Fixture::start().await;
    fx.mount("/versions/1.20.1.json", DESCRIPTOR, 1).await;
    let mut version = fx.version();
    version.downloads.server = None;

    let err = install_version(InstallKind::Server, version, &fx.options())
        .await
        .unwrap_err();
    assert!(matches!(err, InstallError::Validation { .. }));
}

#[tokio::test]
async fn library_host_is_tried_before_library_url() {
    let fx = Fixture::start().await;
    fx.mount(&format!("/proxy/{LIBRARY_PATH}"), LIBRARY_JAR, 1).await;
    fx.mount(&format!("/libraries/{LIBRARY_PATH}"), LIBRARY_JAR, 0).await;

    let proxy = fx.url("/proxy");
    let options = fx
        .options()
        .with_library_host(move |lib| vec![format!("{proxy}/{}", lib.download.path)]);
    install_libraries(fx.version(), &options).await.unwrap();

    assert_eq!(
        tokio::fs::read(fx.folder().library(LIBRARY_PATH)).await.unwrap(),
        LIBRARY_JAR
    );
}

#[tokio::test]
async fn unreadable_asset_index_is_validation_error() {
    let fx = Fixture::start().await;
    fx.mount("/indexes/5.json", b"this is not json", 1).await;
    let mut version = fx.version();
    version.asset_index.sha1 = String::new();

    let err = install_assets(version, &fx.options()).await.unwrap_err();
    assert!(matches!(err, InstallError::Validation { .. }));
}

#[tokio::test]
async fn cancelling_mid_batch_leaves_no_partial_objects() {
    let fx = Fixture::start().await;
    fx.mount("/indexes/5.json", &asset_index(), 1).await;
    for data in [ASSET_A, ASSET_B] {
        Mock::given(method("GET"))
            .and(path(asset_route(data)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(data.to_vec())
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&fx.server)
            .await;
    }

    let options = fx.options().with_assets_concurrency(1);
    let handle = TaskRunner::new().execute(install_assets_task(fx.version(), &options));
    let index = fx.folder().asset_index("5");
    for _ in 0..200 {
        if index.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let root = handle.root().clone();
    handle.cancel();
    let err = handle.wait().await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(root.state(), TaskState::Cancelled);
    let folder = fx.folder();
    assert!(no_leftovers(&folder.asset_object(&sha1_of(ASSET_A))));
    assert!(no_leftovers(&folder.asset_object(&sha1_of(ASSET_B))));
}

/// Downloader that fails any spec whose first candidate contains "broken",
/// takes its time when it contains "slow" and writes a fixed body otherwise
#[derive(Default)]
struct ScriptedDownloader {
    attempts: Mutex<Vec<String>>,
}

#[async_trait]
impl Downloader for ScriptedDownloader {
    async fn download(
        &self,
        spec: &DownloadSpec,
        _control: &TransferControl,
    ) -> crate::download::Result<u64> {
        let url = spec.urls[0].clone();
        self.attempts.lock().unwrap().push(url.clone());
        tokio::task::yield_now().await;
        if url.contains("broken") {
            return Err(DownloadError::HttpStatus { url, status: 404 });
        }
        if url.contains("slow") {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        tokio::fs::create_dir_all(spec.destination.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&spec.destination, b"ok").await.unwrap();
        Ok(2)
    }
}

fn unhashed_library(name: &str) -> ResolvedLibrary {
    let path = format!("com/example/{name}/1.0/{name}-1.0.jar");
    ResolvedLibrary {
        name: format!("com.example:{name}:1.0"),
        download: LibraryDownload {
            url: format!("https://libraries.example/{path}"),
            path,
            sha1: String::new(),
            size: 0,
        },
    }
}

fn scripted_options(downloader: Arc<ScriptedDownloader>) -> InstallOptions {
    InstallOptions::from_config(test_config())
        .unwrap()
        .with_downloader(downloader)
        .with_libraries_concurrency(1)
}

#[tokio::test]
async fn best_effort_batch_installs_the_rest_and_aggregates() {
    let dir = tempdir().unwrap();
    let downloader = Arc::new(ScriptedDownloader::default());
    let libraries = vec![
        unhashed_library("first"),
        unhashed_library("broken"),
        unhashed_library("third"),
    ];

    let err = install_resolved_libraries(libraries, dir.path(), &scripted_options(downloader.clone()))
        .await
        .unwrap_err();

    let InstallError::Aggregate(aggregate) = err else {
        panic!("expected an aggregate error, got {err:?}");
    };
    assert_eq!(aggregate.len(), 1);
    assert!(matches!(
        aggregate.errors[0],
        InstallError::Transfer(DownloadError::HttpStatus { status: 404, .. })
    ));
    assert_eq!(downloader.attempts.lock().unwrap().len(), 3);

    let folder = MinecraftFolder::new(dir.path());
    assert!(folder.library("com/example/first/1.0/first-1.0.jar").exists());
    assert!(folder.library("com/example/third/1.0/third-1.0.jar").exists());
}

#[tokio::test]
async fn fail_fast_batch_stops_at_first_failure() {
    let dir = tempdir().unwrap();
    let downloader = Arc::new(ScriptedDownloader::default());
    let libraries = vec![
        unhashed_library("first"),
        unhashed_library("broken"),
        unhashed_library("third"),
    ];
    let options = scripted_options(downloader.clone()).with_fail_fast(true);

    let handle = TaskRunner::new().execute(install_resolved_libraries_task(
        libraries,
        dir.path(),
        &options,
    ));
    let root = handle.root().clone();
    let err = handle.wait().await.unwrap_err();

    assert!(matches!(err, InstallError::Transfer(DownloadError::HttpStatus { .. })));
    assert_eq!(root.state(), TaskState::Failed);
    assert_eq!(downloader.attempts.lock().unwrap().len(), 2);
    assert!(!MinecraftFolder::new(dir.path())
        .library("com/example/third/1.0/third-1.0.jar")
        .exists());
}

#[tokio::test]
async fn library_progress_is_ten_units_per_library() {
    let dir = tempdir().unwrap();
    let downloader = Arc::new(ScriptedDownloader::default());
    let libraries = vec![unhashed_library("first"), unhashed_library("second")];

    let handle = TaskRunner::new().execute(install_resolved_libraries_task(
        libraries,
        dir.path(),
        &scripted_options(downloader),
    ));
    let root = handle.root().clone();
    handle.wait().await.unwrap();

    assert_eq!(root.progress().total, Some(20));
    assert_eq!(root.progress().current, 20);
    let children = root.children();
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|c| c.weight() == 10 && c.name() == "library"));
}

fn all_terminal(snapshot: &TaskSnapshot) -> bool {
    snapshot.state.is_terminal() && snapshot.children.iter().all(all_terminal)
}

#[tokio::test]
async fn fail_fast_abort_settles_every_node() {
    let dir = tempdir().unwrap();
    let downloader = Arc::new(ScriptedDownloader::default());
    let libraries = vec![unhashed_library("broken"), unhashed_library("slow")];
    let options = scripted_options(downloader)
        .with_libraries_concurrency(2)
        .with_fail_fast(true);

    let handle = TaskRunner::new().execute(install_resolved_libraries_task(
        libraries,
        dir.path(),
        &options,
    ));
    let root = handle.root().clone();
    handle.wait().await.unwrap_err();

    let snapshot = root.snapshot();
    assert_eq!(snapshot.state, TaskState::Failed);
    assert!(all_terminal(&snapshot));
    let slow = snapshot
        .children
        .iter()
        .find(|c| c.params.get("lib").is_some_and(|lib| lib.contains("slow")))
        .unwrap();
    assert_eq!(slow.state, TaskState::Cancelled);
    assert!(!MinecraftFolder::new(dir.path())
        .library("com/example/slow/1.0/slow-1.0.jar")
        .exists());
}

#[tokio::test]
async fn failed_assets_do_not_abort_sibling_libraries() {
    let dir = tempdir().unwrap();
    let folder = MinecraftFolder::new(dir.path());
    let index = folder.asset_index("5");
    tokio::fs::create_dir_all(index.parent().unwrap()).await.unwrap();
    tokio::fs::write(&index, asset_index()).await.unwrap();

    let version = ResolvedVersion {
        id: "1.20.1".into(),
        minecraft_directory: dir.path().to_path_buf(),
        url: "https://meta.example/1.20.1.json".into(),
        sha1: None,
        assets: "5".into(),
        asset_index: AssetIndexRef {
            url: "https://meta.example/indexes/5.json".into(),
            sha1: String::new(),
            size: 0,
        },
        downloads: VersionDownloads::default(),
        libraries: vec![unhashed_library("slow")],
    };
    let downloader = Arc::new(ScriptedDownloader::default());
    let options = scripted_options(downloader).with_assets_hosts(["https://broken.example/assets"]);

    let handle = TaskRunner::new().execute(install_dependencies_task(version, &options));
    let root = handle.root().clone();
    let err = handle.wait().await.unwrap_err();

    let InstallError::Aggregate(aggregate) = err else {
        panic!("expected an aggregate error, got {err:?}");
    };
    assert_eq!(aggregate.len(), 2);
    assert!(folder.library("com/example/slow/1.0/slow-1.0.jar").exists());

    let snapshot = root.snapshot();
    assert!(all_terminal(&snapshot));
    let state_of = |name: &str| {
        snapshot
            .children
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.state)
            .unwrap()
    };
    assert_eq!(state_of("installAssets"), TaskState::Failed);
    assert_eq!(state_of("installLibraries"), TaskState::Succeeded);
}

#[tokio::test]
async fn duplicate_library_entries_are_fetched_once() {
    let dir = tempdir().unwrap();
    let downloader = Arc::new(ScriptedDownloader::default());
    let libraries = vec![unhashed_library("twice"), unhashed_library("twice")];

    let handle = TaskRunner::new().execute(install_resolved_libraries_task(
        libraries,
        dir.path(),
        &scripted_options(downloader.clone()).with_libraries_concurrency(2),
    ));
    let root = handle.root().clone();
    handle.wait().await.unwrap();

    assert_eq!(downloader.attempts.lock().unwrap().len(), 1);
    assert_eq!(root.progress().total, Some(10));
    assert_eq!(root.children().len(), 1);
}
