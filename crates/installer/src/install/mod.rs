//! Version installation
//!
//! Turns a [`ResolvedVersion`] into files on disk: the version descriptor,
//! the client or server archive, the asset index with its objects and every
//! library. Each step is a task in one tree, so a single handle reports
//! progress for, pauses and cancels the whole install.
//!
//! [`fetch_version_list`] looks up which versions exist.

pub mod assets;
pub mod layout;
pub mod manifest;
pub mod options;
pub mod pipeline;
pub mod version;

pub use assets::{AssetIndex, AssetObject};
pub use layout::MinecraftFolder;
pub use manifest::{
    fetch_version_list, LatestVersions, VersionEntry, VersionList, DEFAULT_VERSION_MANIFEST_URL,
};
pub use options::{InstallOptions, LibraryHost, DEFAULT_RESOURCE_ROOT_URL, MAVEN_CENTRAL_URL};
pub use pipeline::{
    install, install_assets, install_assets_task, install_dependencies,
    install_dependencies_task, install_libraries, install_libraries_task,
    install_resolved_libraries, install_resolved_libraries_task, install_task, install_version,
    install_version_task,
};
pub use version::{
    ArtifactDownload, AssetIndexRef, InstallKind, LibraryDownload, ResolvedLibrary,
    ResolvedVersion, VersionDownloads,
};

#[cfg(test)]
mod tests;
