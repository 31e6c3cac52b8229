use serde::Serialize;
use std::path::{Path, PathBuf};

/// Prefix of every staged asset directory inside an assembly.
pub const ASSET_DIR_PREFIX: &str = "asset.";

///
/// Asset
///
/// One staged function binary. `dir` is relative to the assembly root and
/// named after the sha256 of the binary, so identical builds share it.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Asset {
    pub function: String,
    pub hash: String,
    pub dir: PathBuf,
}

impl Asset {
    #[must_use]
    pub fn new(function: &str, hash: String) -> Self {
        let dir = PathBuf::from(dir_name(&hash));

        Self {
            function: function.to_string(),
            hash,
            dir,
        }
    }

    /// Absolute location of the asset directory under `root`.
    #[must_use]
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.dir)
    }
}

#[must_use]
pub fn dir_name(hash: &str) -> String {
    format!("{ASSET_DIR_PREFIX}{hash}")
}
