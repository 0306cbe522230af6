//! Small filesystem and path helpers shared across the crate.

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Canonicalizes `path`, falling back to `dunce` so UNC prefixes aren't introduced on
/// Windows.
pub fn canonicalize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    dunce::canonicalize(path).map_err(|err| Error::io(err, path))
}

/// Reads and deserializes a JSON file.
pub fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|err| Error::io(err, path))?;
    serde_json::from_str(&content).map_err(Error::Serde)
}

/// Serializes `value` and writes it to `path`, creating parent directories first.
pub fn write_json_file<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    create_parent_dir_all(path)?;
    let content = serde_json::to_vec_pretty(value)?;
    fs::write(path, content).map_err(|err| Error::io(err, path))
}

/// Ensures the parent directory of `path` exists.
pub fn create_parent_dir_all(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::io(err, parent))?;
    }
    Ok(())
}

/// Returns the modification time of `path`, mapped to a crate [`Error`] on failure.
pub fn mtime(path: impl AsRef<Path>) -> Result<SystemTime> {
    let path = path.as_ref();
    fs::metadata(path).and_then(|m| m.modified()).map_err(|err| Error::io(err, path))
}

/// `true` if `name` should always be ignored by package/script discovery: it begins
/// with `_` or `.`.
pub fn is_always_ignored(name: &str) -> bool {
    name.starts_with('_') || name.starts_with('.')
}

/// Normalizes `path` to use `/` separators regardless of host platform, so prefix
/// comparisons against embedded-filesystem paths (which are always `/`-separated) are
/// meaningful.
pub fn to_slash(path: impl AsRef<Path>) -> String {
    use path_slash::PathExt;
    path.as_ref().to_slash_lossy().into_owned()
}

/// `true` if `path`, once slash-normalized, lies under `base` (also slash-normalized).
pub fn path_has_prefix(path: impl AsRef<Path>, base: impl AsRef<Path>) -> bool {
    let path = to_slash(path);
    let base = to_slash(base);
    let base = base.trim_end_matches('/');
    path == base || path.starts_with(&format!("{base}/"))
}

/// Strips `base` from `path` after slash-normalizing both; returns `path` unchanged
/// (slash-normalized) if it isn't actually prefixed by `base`.
pub fn strip_prefix_slashed(path: impl AsRef<Path>, base: impl AsRef<Path>) -> String {
    let path_s = to_slash(&path);
    let base_s = to_slash(&base);
    let base_s = base_s.trim_end_matches('/');
    path_s.strip_prefix(base_s).map(|s| s.trim_start_matches('/').to_string()).unwrap_or(path_s)
}
