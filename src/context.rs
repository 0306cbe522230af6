//! The per-build configuration value and its filesystem primitives.

use crate::error::{Error, Result};
use crate::paths::{self, PathClass};
use crate::vfs::{NativesAssets, ToolchainAssets};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The path segment, relative to `<library_root>/src`, under which the embedded
/// toolchain-package tree is mounted.
pub const TOOLCHAIN_PATH: &str = "jsbuild";

/// Pseudo-architecture tag identifying the one target this toolchain compiles for.
pub const PSEUDO_ARCH: &str = "js";

/// Build tags that always apply, requesting the non-networked, non-foreign-function-
/// interface variants of standard-library packages.
const IMPLICIT_BUILD_TAGS: &[&str] = &["js", "netgo", "osusergo"];

/// The four filesystem primitives a [`BuildContext`] dispatches between the real
/// filesystem and the embedded virtual one.
pub trait FsOps: fmt::Debug {
    /// `true` if `path` names a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Lists the entries (bare file/directory names) of the directory at `path`.
    fn read_dir(&self, path: &Path) -> Result<Vec<String>>;

    /// Reads the full contents of the file at `path`.
    fn open(&self, path: &Path) -> Result<Vec<u8>>;

    /// Returns the modification time of `path`.
    fn stat(&self, path: &Path) -> Result<SystemTime>;
}

/// Filesystem primitives backed by the host's real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl FsOps for RealFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(path).map_err(|err| Error::io(err, path))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| Error::io(err, path))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn open(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|err| Error::io(err, path))
    }

    fn stat(&self, path: &Path) -> Result<SystemTime> {
        crate::utils::mtime(path)
    }
}

/// Filesystem primitives backed by one of the crate's embedded read-only trees.
///
/// `root` is the path prefix (e.g. `<library_root>/src/jsbuild`) under which this tree
/// is mounted; lookups strip it before consulting the embedded asset table.
#[derive(Debug, Clone)]
pub struct EmbeddedFs {
    root: PathBuf,
    assets: EmbeddedTree,
}

/// Which compiled-in asset table an [`EmbeddedFs`] reads from.
#[derive(Debug, Clone, Copy)]
pub enum EmbeddedTree {
    Toolchain,
    Natives,
}

impl EmbeddedFs {
    pub fn new(root: impl Into<PathBuf>, assets: EmbeddedTree) -> Self {
        Self { root: root.into(), assets }
    }

    fn relative(&self, path: &Path) -> String {
        crate::utils::strip_prefix_slashed(path, &self.root)
    }

    fn get(&self, relative: &str) -> Option<std::borrow::Cow<'static, [u8]>> {
        match self.assets {
            EmbeddedTree::Toolchain => ToolchainAssets::get(relative).map(|f| f.data),
            EmbeddedTree::Natives => NativesAssets::get(relative).map(|f| f.data),
        }
    }

    fn iter_names(&self) -> Box<dyn Iterator<Item = std::borrow::Cow<'static, str>>> {
        match self.assets {
            EmbeddedTree::Toolchain => Box::new(ToolchainAssets::iter()),
            EmbeddedTree::Natives => Box::new(NativesAssets::iter()),
        }
    }
}

impl FsOps for EmbeddedFs {
    fn is_dir(&self, path: &Path) -> bool {
        let relative = self.relative(path);
        let prefix = if relative.is_empty() { String::new() } else { format!("{relative}/") };
        self.iter_names().any(|name| name.starts_with(&prefix) && name != relative)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<String>> {
        let relative = self.relative(path);
        let prefix = if relative.is_empty() { String::new() } else { format!("{relative}/") };
        let mut seen = std::collections::BTreeSet::new();
        for name in self.iter_names() {
            if let Some(rest) = name.strip_prefix(&prefix) {
                let first_segment = rest.split('/').next().unwrap_or(rest);
                if !first_segment.is_empty() {
                    seen.insert(first_segment.to_string());
                }
            }
        }
        Ok(seen.into_iter().collect())
    }

    fn open(&self, path: &Path) -> Result<Vec<u8>> {
        let relative = self.relative(path);
        self.get(&relative)
            .map(|data| data.into_owned())
            .ok_or_else(|| Error::io(std::io::Error::from(std::io::ErrorKind::NotFound), path))
    }

    fn stat(&self, _path: &Path) -> Result<SystemTime> {
        // embedded assets have no real mtime; they never participate in staleness
        // comparisons themselves (only their consumers' object files do), so a fixed
        // epoch is fine here.
        Ok(SystemTime::UNIX_EPOCH)
    }
}

/// Dispatches between [`RealFs`] and one or more [`EmbeddedFs`] trees according to the
/// prefix rule: a path under a mounted virtual root is tried against the embedded
/// filesystem first, then falls back to the real filesystem.
#[derive(Debug, Clone)]
pub struct DispatchFs {
    real: RealFs,
    virtual_trees: Vec<EmbeddedFs>,
}

impl DispatchFs {
    pub fn new(virtual_trees: Vec<EmbeddedFs>) -> Self {
        Self { real: RealFs, virtual_trees }
    }

    fn embedded_for(&self, path: &Path) -> Option<&EmbeddedFs> {
        self.virtual_trees.iter().find(|fs| crate::utils::path_has_prefix(path, &fs.root))
    }
}

impl FsOps for DispatchFs {
    fn is_dir(&self, path: &Path) -> bool {
        if let Some(fs) = self.embedded_for(path) {
            if fs.is_dir(path) {
                return true;
            }
        }
        self.real.is_dir(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<String>> {
        if let Some(fs) = self.embedded_for(path) {
            if let Ok(names) = fs.read_dir(path) {
                if !names.is_empty() || !path.exists() {
                    return Ok(names);
                }
            }
        }
        self.real.read_dir(path)
    }

    fn open(&self, path: &Path) -> Result<Vec<u8>> {
        if let Some(fs) = self.embedded_for(path) {
            if let Ok(data) = fs.open(path) {
                return Ok(data);
            }
        }
        self.real.open(path)
    }

    fn stat(&self, path: &Path) -> Result<SystemTime> {
        if let Some(fs) = self.embedded_for(path) {
            if fs.open(path).is_ok() {
                return fs.stat(path);
            }
        }
        self.real.stat(path)
    }
}

/// A pure configuration value describing how to look up packages and which source
/// files qualify for a build.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub library_root: PathBuf,
    pub workspaces: Vec<PathBuf>,
    pub host_os: String,
    pub arch: String,
    pub install_suffix: String,
    pub build_tags: Vec<String>,
    pub release_tags: Vec<String>,
    /// Left enabled solely so foreign-function-interface imports can be diagnosed
    /// rather than silently accepted; never selects cgo-style source variants.
    pub cgo_detection_enabled: bool,
}

impl BuildContext {
    pub fn new(library_root: impl Into<PathBuf>, workspaces: Vec<PathBuf>) -> Self {
        Self {
            library_root: library_root.into(),
            workspaces,
            host_os: std::env::consts::OS.to_string(),
            arch: PSEUDO_ARCH.to_string(),
            install_suffix: String::new(),
            build_tags: IMPLICIT_BUILD_TAGS.iter().map(|s| s.to_string()).collect(),
            release_tags: default_release_tags(),
            cgo_detection_enabled: true,
        }
    }

    /// Classifies `path` against this context's library root and workspace list.
    pub fn classify(&self, path: impl AsRef<Path>) -> PathClass {
        paths::classify(path, &self.library_root, TOOLCHAIN_PATH, &self.workspaces)
    }

    /// Builds the dispatching filesystem for this context: the toolchain-packages
    /// virtual tree mounted under `<library_root>/src/<TOOLCHAIN_PATH>`.
    pub fn fs(&self) -> DispatchFs {
        let virtual_root = self.library_root.join("src").join(TOOLCHAIN_PATH);
        DispatchFs::new(vec![EmbeddedFs::new(virtual_root, EmbeddedTree::Toolchain)])
    }

    /// Builds the synthetic, root-relative filesystem the Augmentor consults for
    /// native overlay declarations.
    pub fn natives_fs(&self) -> EmbeddedFs {
        EmbeddedFs::new(PathBuf::from("/"), EmbeddedTree::Natives)
    }

    /// Appends `tags`, deduplicating against tags already present.
    pub fn with_build_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        for tag in tags {
            if !self.build_tags.contains(&tag) {
                self.build_tags.push(tag);
            }
        }
        self
    }
}

fn default_release_tags() -> Vec<String> {
    (1..=CURRENT_RELEASE_MINOR).map(|minor| format!("go1.{minor}")).collect()
}

/// Highest minor release tag this toolchain advertises support for.
pub const CURRENT_RELEASE_MINOR: u32 = 21;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_through_the_context() {
        let ctx = BuildContext::new("/usr/local/lib/js", vec![PathBuf::from("/home/user/code")]);
        assert_eq!(
            ctx.classify(ctx.library_root.join("src/jsbuild/nosync/sync.go")),
            PathClass::Virtual
        );
        assert_eq!(ctx.classify(ctx.library_root.join("src/fmt/print.go")), PathClass::Library);
        assert_eq!(
            ctx.classify(Path::new("/home/user/code/src/app/main.go")),
            PathClass::Workspace
        );
    }

    #[test]
    fn implicit_build_tags_are_present() {
        let ctx = BuildContext::new("/usr/local/lib/js", vec![]);
        assert!(ctx.build_tags.iter().any(|t| t == "js"));
        assert!(ctx.build_tags.iter().any(|t| t == "netgo"));
    }
}
