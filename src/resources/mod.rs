//! Loading of external files: raw bytes, textures and glTF models.
//!
//! Relative paths are looked up as given first, then under the crate's
//! `assets/` directory and finally under `./assets`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub mod glb;
pub mod texture;

/// Directory holding the bundled assets, fixed at build time.
pub fn asset_dir() -> PathBuf {
    PathBuf::from(env!("FROST_ASSET_DIR"))
}

/// Existing location of `file_name`, trying the search paths in order.
pub fn resolve(file_name: impl AsRef<Path>) -> Option<PathBuf> {
    let file_name = file_name.as_ref();
    let mut candidates = vec![file_name.to_path_buf()];
    if file_name.is_relative() {
        candidates.push(asset_dir().join(file_name));
        candidates.push(Path::new("./").join("assets").join(file_name));
    }
    candidates.into_iter().find(|p| p.is_file())
}

pub fn load_binary(file_name: impl AsRef<Path>) -> Result<Vec<u8>> {
    let file_name = file_name.as_ref();
    let Some(path) = resolve(file_name) else {
        bail!("{} not found", file_name.display());
    };
    std::fs::read(&path).with_context(|| format!("reading {}", path.display()))
}
