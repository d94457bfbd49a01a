//! On-disk layout of a game directory

use std::path::{Path, PathBuf};

use super::version::InstallKind;

/// Paths inside a game directory.
///
/// ```text
/// <root>/versions/<id>/<id>.json
/// <root>/versions/<id>/<id>.jar | <id>-server.jar
/// <root>/libraries/<library path>
/// <root>/assets/indexes/<assets>.json
/// <root>/assets/objects/<hash[..2]>/<hash>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinecraftFolder {
    root: PathBuf,
}

impl MinecraftFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_root(&self, id: &str) -> PathBuf {
        self.versions().join(id)
    }

    pub fn version_json(&self, id: &str) -> PathBuf {
        self.version_root(id).join(format!("{id}.json"))
    }

    pub fn version_jar(&self, id: &str, kind: InstallKind) -> PathBuf {
        let file = match kind {
            InstallKind::Client => format!("{id}.jar"),
            InstallKind::Server => format!("{id}-server.jar"),
        };
        self.version_root(id).join(file)
    }

    pub fn libraries(&self) -> PathBuf {
        self.root.join("libraries")
    }

    /// `relative` uses `/` separators, as in library metadata
    pub fn library(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.libraries(), |path, part| path.join(part))
    }

    pub fn assets(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn asset_index(&self, assets: &str) -> PathBuf {
        self.assets().join("indexes").join(format!("{assets}.json"))
    }

    pub fn asset_objects(&self) -> PathBuf {
        self.assets().join("objects")
    }

    pub fn asset_object(&self, hash: &str) -> PathBuf {
        self.asset_objects().join(hash_prefix(hash)).join(hash)
    }
}

/// First two characters of an object hash, its bucket directory
pub fn hash_prefix(hash: &str) -> &str {
    hash.get(..2).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_game_layout() {
        let folder = MinecraftFolder::new("/mc");
        assert_eq!(folder.version_json("1.20.1"), PathBuf::from("/mc/versions/1.20.1/1.20.1.json"));
        assert_eq!(
            folder.version_jar("1.20.1", InstallKind::Server),
            PathBuf::from("/mc/versions/1.20.1/1.20.1-server.jar")
        );
        assert_eq!(
            folder.library("org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar"),
            PathBuf::from("/mc/libraries/org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar")
        );
        assert_eq!(folder.asset_index("5"), PathBuf::from("/mc/assets/indexes/5.json"));
        assert_eq!(
            folder.asset_object("bdf48ef6b5d0d23bbb02e17d04865216179f510a"),
            PathBuf::from("/mc/assets/objects/bd/bdf48ef6b5d0d23bbb02e17d04865216179f510a")
        );
    }
}
