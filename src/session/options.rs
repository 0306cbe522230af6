//! [`BuildOptions`]: configuration recognized by the [`super::Session`].

use std::path::PathBuf;

/// Environment variable overriding the default library root. Takes precedence over the
/// host toolchain's compiled-in default.
pub const LIBRARY_ROOT_ENV: &str = "JSBUILD_ROOT";

/// Environment variable overriding the default workspace path (colon-separated on
/// Unix, semicolon-separated on Windows, matching [`std::env::split_paths`]).
pub const WORKSPACE_PATH_ENV: &str = "JSBUILD_PATH";

/// Per-build options. Read from the environment exactly once, at construction, per
/// spec §9's "Global process state" design note — never re-read afterward, so the same
/// `BuildOptions` value is reproducible in tests regardless of the process environment.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub library_root: PathBuf,
    pub workspace_path: Vec<PathBuf>,
    pub verbose: bool,
    pub quiet: bool,
    pub watch: bool,
    pub emit_source_map: bool,
    pub map_local_disk: bool,
    pub minify: bool,
    pub color: bool,
    pub build_tags: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        let library_root = std::env::var_os(LIBRARY_ROOT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_library_root);
        let workspace_path = std::env::var_os(WORKSPACE_PATH_ENV)
            .map(|v| std::env::split_paths(&v).collect())
            .unwrap_or_else(default_workspace_path);

        Self {
            library_root,
            workspace_path,
            verbose: false,
            quiet: false,
            watch: false,
            emit_source_map: false,
            map_local_disk: false,
            minify: false,
            color: true,
            build_tags: Vec::new(),
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `watch` is set: watch mode implies verbose output (spec §6).
    pub fn effective_verbose(&self) -> bool {
        self.verbose || self.watch
    }

    /// The install suffix this configuration selects: `"min"` when minifying, empty
    /// otherwise.
    pub fn install_suffix(&self) -> &'static str {
        if self.minify {
            "min"
        } else {
            ""
        }
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    #[must_use]
    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    #[must_use]
    pub fn emit_source_map(mut self, emit: bool) -> Self {
        self.emit_source_map = emit;
        self
    }

    #[must_use]
    pub fn map_local_disk(mut self, map_local_disk: bool) -> Self {
        self.map_local_disk = map_local_disk;
        self
    }

    #[must_use]
    pub fn minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    #[must_use]
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn build_tags(mut self, tags: Vec<String>) -> Self {
        self.build_tags = tags;
        self
    }

    #[must_use]
    pub fn library_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.library_root = root.into();
        self
    }

    #[must_use]
    pub fn workspace_path(mut self, workspaces: Vec<PathBuf>) -> Self {
        self.workspace_path = workspaces;
        self
    }
}

fn default_library_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("jsbuild")
        .join("lib")
}

fn default_workspace_path() -> Vec<PathBuf> {
    dirs::home_dir().map(|home| vec![home.join("go")]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minify_selects_min_install_suffix() {
        let opts = BuildOptions::new().minify(true);
        assert_eq!(opts.install_suffix(), "min");
    }

    #[test]
    fn watch_implies_effective_verbose() {
        let opts = BuildOptions::new().watch(true);
        assert!(opts.effective_verbose());
    }
}
