//! Asset index parsing

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::download::FileOperation;
use crate::error::{InstallError, Result};

/// Contents of `assets/indexes/<id>.json`
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetIndex {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| InstallError::Validation {
            message: "asset index is not valid JSON".to_string(),
            source: Some(Box::new(e)),
        })
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| InstallError::io(path, FileOperation::Read, e))?;
        Self::parse(&bytes)
    }

    /// One entry per distinct hash.
    ///
    /// Several names may share a hash; they share a file on disk, so they
    /// must only be fetched once.
    pub fn unique_objects(&self) -> Vec<AssetObject> {
        let mut seen = HashSet::new();
        self.objects
            .values()
            .filter(|object| seen.insert(object.hash.to_ascii_lowercase()))
            .cloned()
            .collect()
    }
}
