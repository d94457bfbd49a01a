//! Version manifest lookup
//!
//! The manifest lists every published version with the URL of its
//! descriptor. A previously fetched list can be revalidated cheaply: its
//! `timestamp` is sent as `If-Modified-Since` and a `304` keeps it as is.

use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::download::DownloadError;
use crate::error::{InstallError, Result};

/// Official version manifest
pub const DEFAULT_VERSION_MANIFEST_URL: &str =
    "https://launchermeta.mojang.com/mc/game/version_manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionList {
    pub latest: LatestVersions,
    pub versions: Vec<VersionEntry>,
    /// `Last-Modified` of the response this list came from
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub time: String,
    pub release_time: String,
    /// Where the version descriptor is published
    pub url: String,
}

/// Fetch the version list from `remote` (the official manifest by default).
///
/// With `original`, the request is conditional on its timestamp and an
/// unmodified manifest returns `original` unchanged.
pub async fn fetch_version_list(
    client: &Client,
    remote: Option<&str>,
    original: Option<VersionList>,
) -> Result<VersionList> {
    let url = remote.unwrap_or(DEFAULT_VERSION_MANIFEST_URL);
    let mut request = client.get(url);
    if let Some(since) = original.as_ref().map(|o| o.timestamp.as_str()).filter(|t| !t.is_empty()) {
        request = request.header(IF_MODIFIED_SINCE, since);
    }

    let response = request.send().await.map_err(|source| {
        InstallError::Transfer(DownloadError::HttpRequest {
            url: url.to_string(),
            source,
        })
    })?;

    let status = response.status();
    if status == StatusCode::NOT_MODIFIED {
        debug!(url, "version list not modified");
        return original.ok_or_else(|| {
            InstallError::validation(format!("{url} answered 304 to an unconditional request"))
        });
    }
    if !status.is_success() {
        return Err(InstallError::Transfer(DownloadError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        }));
    }

    let timestamp = response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.bytes().await.map_err(|source| {
        InstallError::Transfer(DownloadError::HttpRequest {
            url: url.to_string(),
            source,
        })
    })?;

    let mut list: VersionList = serde_json::from_slice(&body).map_err(|e| InstallError::Validation {
        message: format!("version list from {url} is not valid JSON"),
        source: Some(Box::new(e)),
    })?;
    list.timestamp = timestamp;
    debug!(url, versions = list.versions.len(), "version list fetched");
    Ok(list)
}
