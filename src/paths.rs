//! Path classification and file-name inclusion helpers.
//!
//! These are pure functions over strings and paths; none of them touch the
//! filesystem. [`crate::context::BuildContext`] builds on top of
//! [`classify`] to decide which filesystem primitive (real or embedded)
//! answers a given lookup.

use crate::utils::{path_has_prefix, to_slash};
use std::path::Path;

/// The main source-file suffix (the statically-typed systems language this crate's
/// toolchain compiles).
pub const SOURCE_SUFFIX: &str = ".go";

/// The auxiliary script-file suffix injected verbatim into linked output.
pub const SCRIPT_SUFFIX: &str = ".inc.js";

/// Where a path was classified as living.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Under the toolchain's own embedded source tree, inside the standard library root.
    Virtual,
    /// Under the standard library root, on disk.
    Library,
    /// Under one of the user's workspaces.
    Workspace,
    /// None of the above.
    Other,
}

/// Classifies `path` relative to `library_root` and `workspaces`, applying the
/// toolchain-path prefix rule from the design: a path under
/// `<library_root>/src/<toolchain_path>` is [`PathClass::Virtual`] even though it also
/// happens to be under `library_root`.
pub fn classify(
    path: impl AsRef<Path>,
    library_root: impl AsRef<Path>,
    toolchain_path: &str,
    workspaces: &[impl AsRef<Path>],
) -> PathClass {
    let path = path.as_ref();
    let library_root = library_root.as_ref();

    let virtual_root = library_root.join("src").join(toolchain_path);
    if path_has_prefix(path, &virtual_root) {
        return PathClass::Virtual;
    }
    if path_has_prefix(path, library_root) {
        return PathClass::Library;
    }
    for workspace in workspaces {
        if path_has_prefix(path, workspace) {
            return PathClass::Workspace;
        }
    }
    PathClass::Other
}

/// `true` if `name` (a bare file name, not a path) is always excluded from source and
/// script lists: it begins with `_` or `.`.
pub fn is_ignored_name(name: &str) -> bool {
    crate::utils::is_always_ignored(name)
}

/// `true` if `name` is a primary source file: not ignored and ends in [`SOURCE_SUFFIX`].
pub fn is_source_file(name: &str) -> bool {
    !is_ignored_name(name) && name.ends_with(SOURCE_SUFFIX)
}

/// `true` if `name` is an auxiliary script file: not ignored and ends in
/// [`SCRIPT_SUFFIX`].
pub fn is_script_file(name: &str) -> bool {
    !is_ignored_name(name) && name.ends_with(SCRIPT_SUFFIX)
}

/// Partitions `names` into `(source_files, script_files)`, preserving relative order and
/// dropping anything that is neither, exactly as the resolver's loose-file entry point
/// does when synthesizing a descriptor from a bare file list.
pub fn partition_by_suffix<'a>(names: impl IntoIterator<Item = &'a str>) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut sources = Vec::new();
    let mut scripts = Vec::new();
    for name in names {
        if is_source_file(name) {
            sources.push(name);
        } else if is_script_file(name) {
            scripts.push(name);
        }
    }
    (sources, scripts)
}

/// Strips `library_root` or, failing that, the first matching `workspaces` entry, from
/// `path`, also removing the leading `src` path segment that both trees share. Falls
/// back to the bare file name. Used by the source-map callback (spec §4.4).
pub fn relativize_for_source_map(
    path: impl AsRef<Path>,
    library_root: impl AsRef<Path>,
    workspaces: &[impl AsRef<Path>],
) -> String {
    let path = path.as_ref();

    for workspace in workspaces {
        if path_has_prefix(path, workspace) {
            return strip_source_root_segment(to_slash(path), &to_slash(workspace));
        }
    }
    if path_has_prefix(path, library_root.as_ref()) {
        return strip_source_root_segment(to_slash(path), &to_slash(library_root));
    }
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| to_slash(path))
}

fn strip_source_root_segment(path: String, root: &str) -> String {
    let root = root.trim_end_matches('/');
    let rest = path.strip_prefix(root).unwrap_or(&path).trim_start_matches('/');
    // drop the leading `src/` segment shared by the library root and workspace trees
    rest.strip_prefix("src/").unwrap_or(rest).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_names_are_excluded() {
        assert!(is_ignored_name("_cgo_gotypes.go"));
        assert!(is_ignored_name(".hidden.go"));
        assert!(!is_ignored_name("main.go"));
    }

    #[test]
    fn partitions_loose_files_by_suffix() {
        let names = ["main.go", "helper.inc.js", "_skip.go", "README.md"];
        let (sources, scripts) = partition_by_suffix(names);
        assert_eq!(sources, vec!["main.go"]);
        assert_eq!(scripts, vec!["helper.inc.js"]);
    }

    #[test]
    fn classifies_virtual_before_library() {
        let root = Path::new("/usr/local/lib/js");
        let workspaces: &[&Path] = &[];
        let class = classify(root.join("src/jsbuild/nosync/sync.go"), root, "jsbuild", workspaces);
        assert_eq!(class, PathClass::Virtual);

        let class = classify(root.join("src/fmt/print.go"), root, "jsbuild", workspaces);
        assert_eq!(class, PathClass::Library);
    }

    #[test]
    fn relativizes_under_workspace_stripping_src_segment() {
        let root = Path::new("/usr/local/lib/js");
        let workspaces = [Path::new("/home/user/code")];
        let path = Path::new("/home/user/code/src/foo/bar.go");
        assert_eq!(relativize_for_source_map(path, root, &workspaces), "foo/bar.go");
    }
}
