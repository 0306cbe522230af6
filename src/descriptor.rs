//! [`PackageDescriptor`]: identifies a single compilable unit.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::SystemTime;

/// A source position referencing an import, used to distinguish imports declared in
/// this package's own files from ones pulled in implicitly by toolchain additions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub file: usize,
    pub line: u32,
    pub column: u32,
}

/// Identifies a single compilable unit: the package's import path, its files, its
/// imports, and bookkeeping used for staleness analysis and linking.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    /// Canonical dotted/slashed identifier.
    pub import_path: String,
    /// Absolute path on disk, even for virtual packages (a synthetic path rooted under
    /// the toolchain tree).
    pub directory: PathBuf,
    /// Ordered list of primary source file names, relative to `directory`.
    pub go_files: Vec<String>,
    /// Ordered list of auxiliary injectable scripts.
    pub script_files: Vec<String>,
    /// Internal test sources.
    pub test_files: Vec<String>,
    /// External test sources.
    pub xtest_files: Vec<String>,
    /// Import paths referenced by this package.
    pub imports: BTreeSet<String>,
    /// Import path -> source positions referencing it.
    pub import_positions: BTreeMap<String, Vec<SourcePosition>>,
    /// Absolute path where the compiled archive is (or would be) stored. Empty if not
    /// persistable.
    pub object_path: Option<PathBuf>,
    /// `true` when the unit produces an executable.
    pub is_command: bool,
    /// `true` when sources come from the embedded filesystem (no watchable disk
    /// directory).
    pub is_virtual: bool,
    /// The maximum modification time over this package's own sources and its
    /// transitive dependencies' `source_mod_time`. Populated during build.
    pub source_mod_time: Option<SystemTime>,
    /// `true` when `object_path` existed with a modification time at least as new as
    /// `source_mod_time`.
    pub up_to_date: bool,
}

/// The distinguished package name every command package's package clause must declare.
pub const MAIN_PACKAGE_NAME: &str = "main";

/// Import path suffix marking an external-test variant of a package.
pub const EXTERNAL_TEST_SUFFIX: &str = "_test";

impl PackageDescriptor {
    /// A minimal descriptor for `import_path`, with no files and no known object path.
    /// Callers fill in the rest as resolution proceeds.
    pub fn new(import_path: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            import_path: import_path.into(),
            directory: directory.into(),
            go_files: Vec::new(),
            script_files: Vec::new(),
            test_files: Vec::new(),
            xtest_files: Vec::new(),
            imports: BTreeSet::new(),
            import_positions: BTreeMap::new(),
            object_path: None,
            is_command: false,
            is_virtual: false,
            source_mod_time: None,
            up_to_date: false,
        }
    }

    /// `true` if this descriptor's import path names the base package of an
    /// external-test variant (i.e. it ends in [`EXTERNAL_TEST_SUFFIX`]).
    pub fn is_external_test(&self) -> bool {
        self.import_path.ends_with(EXTERNAL_TEST_SUFFIX)
    }

    /// The import path with any [`EXTERNAL_TEST_SUFFIX`] stripped, used for native
    /// lookup per spec.
    pub fn base_import_path(&self) -> &str {
        self.import_path.strip_suffix(EXTERNAL_TEST_SUFFIX).unwrap_or(&self.import_path)
    }

    /// Every file this descriptor's own source positions may reference, used when
    /// deciding whether an import position lies in a file this package owns.
    pub fn owned_files(&self) -> impl Iterator<Item = &str> {
        self.go_files.iter().map(String::as_str)
    }
}
