//! Resolved version input shape
//!
//! The installer never parses or merges version descriptors itself. It
//! consumes this already-resolved view: artifact URLs, hashes, sizes and
//! relative paths.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A version ready to be installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVersion {
    pub id: String,
    /// Root of the game directory this version installs into
    pub minecraft_directory: PathBuf,
    /// Where the version descriptor itself is published
    pub url: String,
    /// Descriptor digest; when absent it is read from the descriptor URL
    #[serde(default)]
    pub sha1: Option<String>,
    /// Asset index id (`assets/indexes/<assets>.json`)
    pub assets: String,
    pub asset_index: AssetIndexRef,
    #[serde(default)]
    pub downloads: VersionDownloads,
    #[serde(default)]
    pub libraries: Vec<ResolvedLibrary>,
}

impl ResolvedVersion {
    /// Expected sha1 of the version descriptor.
    ///
    /// Official descriptor URLs embed their hash
    /// (`https://host/v1/packages/<sha1>/<id>.json`); that segment is used
    /// when no explicit digest was given and it looks like a sha1.
    pub fn descriptor_sha1(&self) -> Option<String> {
        if let Some(sha1) = self.sha1.as_ref().filter(|s| !s.is_empty()) {
            return Some(sha1.clone());
        }
        self.url
            .split('/')
            .nth(5)
            .filter(|segment| segment.len() == 40 && segment.chars().all(|c| c.is_ascii_hexdigit()))
            .map(str::to_string)
    }

    pub fn download(&self, kind: InstallKind) -> Option<&ArtifactDownload> {
        match kind {
            InstallKind::Client => self.downloads.client.as_ref(),
            InstallKind::Server => self.downloads.server.as_ref(),
        }
    }
}

/// Which archive of a version to install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallKind {
    Client,
    Server,
}

impl std::fmt::Display for InstallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallKind::Client => write!(f, "client"),
            InstallKind::Server => write!(f, "server"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIndexRef {
    pub url: String,
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<ArtifactDownload>,
    #[serde(default)]
    pub server: Option<ArtifactDownload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDownload {
    pub url: String,
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
}

/// One library with its resolved download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLibrary {
    /// Maven coordinate (`group:artifact:version[:classifier]`)
    pub name: String,
    pub download: LibraryDownload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDownload {
    /// Path relative to the libraries root, `/`-separated
    pub path: String,
    pub url: String,
    /// Empty for libraries published without a hash
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(url: &str, sha1: Option<&str>) -> ResolvedVersion {
        ResolvedVersion {
            id: "1.20.1".into(),
            minecraft_directory: PathBuf::from("/mc"),
            url: url.into(),
            sha1: sha1.map(String::from),
            assets: "5".into(),
            asset_index: AssetIndexRef {
                url: "https://host/indexes/5.json".into(),
                sha1: String::new(),
                size: 0,
            },
            downloads: VersionDownloads::default(),
            libraries: Vec::new(),
        }
    }

    #[test]
    fn descriptor_sha1_comes_from_url_segment() {
        let v = version(
            "https://piston-meta.mojang.com/v1/packages/715ccf3330885e75b205124f09f8712542cbe7e0/1.20.1.json",
            None,
        );
        assert_eq!(
            v.descriptor_sha1().as_deref(),
            Some("715ccf3330885e75b205124f09f8712542cbe7e0")
        );
    }

    #[test]
    fn explicit_sha1_wins_and_odd_urls_yield_none() {
        let v = version("https://host/v1/packages/abc/1.20.1.json", Some("deadbeef"));
        assert_eq!(v.descriptor_sha1().as_deref(), Some("deadbeef"));

        let v = version("https://host/versions/1.20.1.json", None);
        assert_eq!(v.descriptor_sha1(), None);
    }

    #[test]
    fn deserializes_camel_case_shape() {
        let json = r#"{
            "id": "1.20.1",
            "minecraftDirectory": "/games/mc",
            "url": "https://host/1.20.1.json",
            "assets": "5",
            "assetIndex": { "url": "https://host/5.json", "sha1": "aa", "size": 10 },
            "downloads": { "client": { "url": "https://host/client.jar", "sha1": "bb", "size": 3 } },
            "libraries": [
                { "name": "org.lwjgl:lwjgl:3.3.1",
                  "download": { "path": "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar", "url": "https://host/l.jar" } }
            ]
        }"#;
        let v: ResolvedVersion = serde_json::from_str(json).unwrap();
        assert_eq!(v.download(InstallKind::Client).unwrap().sha1, "bb");
        assert!(v.download(InstallKind::Server).is_none());
        assert_eq!(v.libraries[0].download.sha1, "");
    }
}
