//! The Session: coordinates builds, owns the archive and type caches, and
//! optionally a filesystem watcher.

pub mod options;

pub use options::BuildOptions;

use crate::augment;
use crate::cache;
use crate::codegen::{CodeGenerator, ImportContext};
use crate::context::BuildContext;
use crate::descriptor::PackageDescriptor;
use crate::error::{Error, Result};
use crate::parser::SourceParser;
use crate::paths;
use crate::resolver::{self, ResolveMode};
use crate::watcher::Watcher;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The distinguished pseudo-package never recursively built: its only contribution is
/// compiler-intrinsic, not a real dependency.
const UNSAFE_PACKAGE: &str = "unsafe";

/// Highest toolchain release this build carries (mirrors [`crate::context::BuildContext`]'s
/// release tag ceiling); compared against the code generator's expected version at
/// construction.
fn host_toolchain_version() -> String {
    format!("1.{}.0", crate::context::CURRENT_RELEASE_MINOR)
}

/// Parses `raw` as a [`semver::Version`], tolerating a leading `go` prefix used by
/// release tags (`go1.21` rather than `1.21.0`).
fn parse_toolchain_version(raw: &str) -> Result<semver::Version> {
    let normalized = raw.strip_prefix("go").unwrap_or(raw);
    let normalized = if normalized.matches('.').count() == 1 { format!("{normalized}.0") } else { normalized.to_string() };
    semver::Version::parse(&normalized).map_err(|err| Error::msg(format!("malformed toolchain version {raw:?}: {err}")))
}

/// Coordinates builds: holds options, the build context, the in-memory archive and type
/// caches keyed by import path, and optionally a filesystem watcher.
pub struct Session<P, C: CodeGenerator> {
    options: BuildOptions,
    context: BuildContext,
    parser: P,
    codegen: C,
    archives: RefCell<HashMap<String, C::Archive>>,
    types: RefCell<HashMap<String, C::Types>>,
    mod_times: RefCell<HashMap<String, SystemTime>>,
    watcher: RefCell<Option<Watcher>>,
}

enum Frame {
    Enter(PackageDescriptor),
    Exit(PackageDescriptor),
}

impl<P: SourceParser, C: CodeGenerator> Session<P, C> {
    /// Constructs a session, verifying the host toolchain's reported version matches
    /// what `codegen` expects. Mismatch is fatal (spec §7).
    pub fn new(options: BuildOptions, parser: P, codegen: C) -> Result<Self> {
        let found = host_toolchain_version();
        let expected = parse_toolchain_version(codegen.expected_version())?;
        let found_version = parse_toolchain_version(&found)?;
        if expected != found_version {
            return Err(Error::VersionMismatch {
                expected: codegen.expected_version().to_string(),
                found,
            });
        }

        let context = BuildContext::new(options.library_root.clone(), options.workspace_path.clone())
            .with_build_tags(options.build_tags.clone());

        let watcher = if options.watch { Some(Watcher::new()?) } else { None };

        Ok(Self {
            options,
            context,
            parser,
            codegen,
            archives: RefCell::new(HashMap::new()),
            types: RefCell::new(HashMap::new()),
            mod_times: RefCell::new(HashMap::new()),
            watcher: RefCell::new(watcher),
        })
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Resolves the package at `dir`, builds it, and (if it is an executable) writes the
    /// linked output to `output_path` (defaulting to the base name with the output
    /// suffix).
    pub fn build_directory(&self, dir: &Path, output_path: Option<&Path>) -> Result<()> {
        let import_path = self.import_path_for_directory(dir);
        let mut descriptor = resolver::import(&self.context, &import_path, ResolveMode::default(), self.options.install_suffix())?;
        let base_name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "main".to_string());
        resolver::mark_as_command(&self.context, &mut descriptor, &base_name);
        self.register_with_watcher(&descriptor);

        let archive = self.build_package(descriptor)?;
        let default_output = PathBuf::from(format!("{base_name}.js"));
        self.write_command_package(&archive, output_path.unwrap_or(&default_output))
    }

    /// Synthesizes a main-package descriptor from loose files, partitioning by file
    /// suffix into source files and script files, builds it, and writes the linked
    /// output.
    pub fn build_files(
        &self,
        filenames: &[String],
        output_path: Option<&Path>,
        package_dir: &Path,
    ) -> Result<()> {
        let (sources, scripts) = paths::partition_by_suffix(filenames.iter().map(String::as_str));

        let mut descriptor = PackageDescriptor::new("command-line-arguments", package_dir);
        descriptor.go_files = sources.into_iter().map(str::to_string).collect();
        descriptor.script_files = scripts.into_iter().map(str::to_string).collect();
        resolver::mark_as_command(&self.context, &mut descriptor, "main");

        let (asts, _errors) = augment::shadow_sources(&self.parser, &self.context, &descriptor, &Default::default());
        if let Some(first) = asts.first() {
            if first.package_name != crate::descriptor::MAIN_PACKAGE_NAME {
                return Err(Error::msg(format!(
                    "loose-file build requires package \"main\", found \"{}\"",
                    first.package_name
                )));
            }
        }

        let archive = self.build_package(descriptor)?;
        let default_output = PathBuf::from("main.js");
        self.write_command_package(&archive, output_path.unwrap_or(&default_output))
    }

    /// Resolves and builds `import_path`, returning the archive.
    pub fn build_import_path(&self, import_path: &str) -> Result<C::Archive> {
        let descriptor = resolver::import(&self.context, import_path, ResolveMode::default(), self.options.install_suffix())?;
        self.build_package(descriptor)
    }

    /// The heart of the Session. See spec §4.4 for the full contract; summarized in
    /// this module's doc comment. Implemented as an explicit worklist (two-stage
    /// enter/exit frames) rather than native call recursion, so a deep
    /// standard-library-like dependency chain cannot blow the Rust stack — only the
    /// `Vec<Frame>` worklist grows.
    pub fn build_package(&self, descriptor: PackageDescriptor) -> Result<C::Archive> {
        let root_path = descriptor.import_path.clone();
        if let Some(archive) = self.archives.borrow().get(&root_path) {
            return Ok(archive.clone());
        }

        let mut stack = vec![Frame::Enter(descriptor)];
        let mut queued: HashSet<String> = HashSet::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(descriptor) => {
                    let import_path = descriptor.import_path.clone();
                    if self.archives.borrow().contains_key(&import_path) {
                        continue;
                    }
                    if !queued.insert(import_path.clone()) {
                        continue;
                    }

                    let dep_paths = self.owned_dependency_paths(&descriptor);
                    stack.push(Frame::Exit(descriptor));
                    for dep_path in dep_paths.into_iter().rev() {
                        if self.archives.borrow().contains_key(&dep_path) || queued.contains(&dep_path) {
                            continue;
                        }
                        let dep_descriptor = resolver::import(
                            &self.context,
                            &dep_path,
                            ResolveMode::default(),
                            self.options.install_suffix(),
                        )?;
                        self.register_with_watcher(&dep_descriptor);
                        stack.push(Frame::Enter(dep_descriptor));
                    }
                }
                Frame::Exit(descriptor) => {
                    self.finish_build(descriptor)?;
                }
            }
        }

        self.archives
            .borrow()
            .get(&root_path)
            .cloned()
            .ok_or_else(|| Error::msg(format!("build worklist did not produce an archive for {root_path}")))
    }

    /// Import paths this descriptor's own source files reference (excluding the unsafe
    /// pseudo-package), i.e. the dependency set whose `source_mod_time` feeds into this
    /// package's own.
    fn owned_dependency_paths(&self, descriptor: &PackageDescriptor) -> Vec<String> {
        descriptor
            .import_positions
            .iter()
            .filter(|(path, _)| path.as_str() != UNSAFE_PACKAGE)
            .filter(|(_, positions)| {
                positions.iter().any(|p| descriptor.go_files.get(p.file).is_some())
            })
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Performs steps 2–5 of spec §4.4's `build-package` contract for `descriptor`,
    /// assuming every dependency in [`Self::owned_dependency_paths`] is already present
    /// in `self.archives`.
    fn finish_build(&self, descriptor: PackageDescriptor) -> Result<()> {
        if self.archives.borrow().contains_key(&descriptor.import_path) {
            return Ok(());
        }

        if let Some(object_path) = descriptor.object_path.clone() {
            let source_mod_time = self.compute_source_mod_time(&descriptor);
            self.mod_times.borrow_mut().insert(descriptor.import_path.clone(), source_mod_time);

            if cache::is_up_to_date(&self.context, &object_path, source_mod_time) {
                if descriptor.is_command {
                    return Ok(());
                }
                let archive: C::Archive = crate::utils::read_json_file(&object_path)?;
                self.archives.borrow_mut().insert(descriptor.import_path.clone(), archive);
                return Ok(());
            }
        }

        self.compile_and_insert(descriptor)
    }

    /// Initializes `source_mod_time` to the toolchain executable's own modification
    /// time, then folds in every owned dependency's `source_mod_time` and every own
    /// source/script file's modification time, taking the maximum throughout — the
    /// monotonic propagation spec §5 requires.
    fn compute_source_mod_time(&self, descriptor: &PackageDescriptor) -> SystemTime {
        let mut acc = cache::toolchain_mod_time();

        for dep_path in self.owned_dependency_paths(descriptor) {
            if let Some(dep_mod_time) = self.mod_times.borrow().get(&dep_path) {
                acc = acc.max(*dep_mod_time);
            }
        }

        let fs = self.context.fs();
        for file_name in descriptor.go_files.iter().chain(descriptor.script_files.iter()) {
            if let Ok(mtime) = fs.stat(&descriptor.directory.join(file_name)) {
                acc = acc.max(mtime);
            }
        }

        acc
    }

    fn compile_and_insert(&self, descriptor: PackageDescriptor) -> Result<()> {
        let (asts, parse_errors) = augment::augment(&self.parser, &self.context, &descriptor)?;
        if let Some(err) = parse_errors.first() {
            if parse_errors.len() >= crate::error::MAX_PARSE_ERRORS_PER_FILE {
                let file = descriptor.go_files.first().map(|f| descriptor.directory.join(f)).unwrap_or_else(|| descriptor.directory.clone());
                return Err(Error::Parse { file, errors: parse_errors });
            }
            tracing::debug!(message = %err, package = %descriptor.import_path, "non-fatal parse error");
        }

        let import_path = descriptor.import_path.clone();
        let archives = &self.archives;
        let codegen = &self.codegen;
        let mut import_ctx = |path: &str| -> Result<C::Archive> {
            if let Some(existing) = archives.borrow().get(path) {
                return Ok(existing.clone());
            }
            Err(Error::resolution(path))
        };

        let (mut archive, types) =
            self.codegen.compile(&descriptor, &asts, &mut import_ctx as &mut dyn ImportContext<C::Archive>)?;

        for script_file in &descriptor.script_files {
            let fs = self.context.fs();
            let bytes = fs.open(&descriptor.directory.join(script_file))?;
            codegen.append_script(&mut archive, &bytes);
        }

        self.types.borrow_mut().insert(import_path.clone(), types);
        self.archives.borrow_mut().insert(import_path.clone(), archive.clone());

        if let Some(object_path) = &descriptor.object_path {
            if !descriptor.is_command {
                self.write_archive_with_fallback(&archive, object_path)?;
            }
        }

        crate::report::get_default().on_compiled(&import_path);
        Ok(())
    }

    /// Writes `archive` to `object_path`; on failure because the target lies under the
    /// read-only standard library tree, retries under each configured workspace in
    /// order until one accepts the write.
    fn write_archive_with_fallback(&self, archive: &C::Archive, object_path: &Path) -> Result<()> {
        match crate::utils::write_json_file(archive, object_path) {
            Ok(()) => Ok(()),
            Err(err) if matches!(self.context.classify(object_path), crate::paths::PathClass::Library) => {
                let relative = crate::utils::strip_prefix_slashed(object_path, &self.context.library_root);
                let mut last_err = err;
                for workspace in &self.context.workspaces {
                    let fallback = workspace.join(&relative);
                    match crate::utils::write_json_file(archive, &fallback) {
                        Ok(()) => {
                            trace!(workspace = %workspace.display(), path = %fallback.display(), "wrote archive under workspace fallback");
                            return Ok(());
                        }
                        Err(retry_err) => last_err = retry_err,
                    }
                }
                Err(last_err)
            }
            Err(err) => Err(err),
        }
    }

    /// Creates parent directories, opens `output_path`, wraps the writer in a
    /// source-map-aware filter, walks the transitive dependency closure, and emits the
    /// linked program.
    pub fn write_command_package(&self, archive: &C::Archive, output_path: &Path) -> Result<()> {
        crate::link::write_linked_output(self, archive, output_path)
    }

    /// Recursively resolves and builds `import_path` if it is not already cached; used
    /// by the Link Writer when walking the dependency closure and an entry is missing
    /// from the archive cache.
    pub fn archive_for(&self, import_path: &str) -> Result<C::Archive> {
        if let Some(archive) = self.archives.borrow().get(import_path) {
            return Ok(archive.clone());
        }
        self.build_import_path(import_path)
    }

    pub fn codegen(&self) -> &C {
        &self.codegen
    }

    pub fn archives_snapshot(&self) -> HashMap<String, C::Archive> {
        self.archives.borrow().clone()
    }

    fn import_path_for_directory(&self, dir: &Path) -> String {
        for workspace in &self.context.workspaces {
            let src_root = workspace.join("src");
            if crate::utils::path_has_prefix(dir, &src_root) {
                return crate::utils::strip_prefix_slashed(dir, &src_root);
            }
        }
        let src_root = self.context.library_root.join("src");
        if crate::utils::path_has_prefix(dir, &src_root) {
            return crate::utils::strip_prefix_slashed(dir, &src_root);
        }
        dir.to_string_lossy().into_owned()
    }

    fn register_with_watcher(&self, descriptor: &PackageDescriptor) {
        if descriptor.is_virtual {
            return;
        }
        if let Some(watcher) = self.watcher.borrow_mut().as_mut() {
            watcher.watch_directory(&descriptor.directory);
        }
    }

    /// Blocks until a relevant filesystem change is observed, if a watcher is active.
    pub fn wait_for_change(&self) -> Option<Result<PathBuf>> {
        self.watcher.borrow_mut().as_mut().map(|w| w.wait_for_change())
    }

    /// Stops the active watcher, if any, draining its remaining events in the
    /// background rather than leaving them to pile up behind a closed channel.
    /// Called automatically when the session is dropped.
    pub fn stop_watching(&self) {
        if let Some(watcher) = self.watcher.borrow_mut().take() {
            watcher.stop();
        }
    }
}

impl<P: SourceParser, C: CodeGenerator> Drop for Session<P, C> {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::echo::EchoCodeGenerator;
    use crate::parser::StructuralParser;
    use std::fs;

    fn session_with_root(root: &Path) -> Session<StructuralParser, EchoCodeGenerator> {
        let options = BuildOptions::new().library_root(root).workspace_path(vec![]);
        Session::new(options, StructuralParser, EchoCodeGenerator::new(&host_toolchain_version_static())).unwrap()
    }

    fn host_toolchain_version_static() -> &'static str {
        // leak is fine in tests: one-time, bounded by test count
        Box::leak(host_toolchain_version().into_boxed_str())
    }

    #[test]
    fn build_import_path_memoizes_within_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let pkg_dir = dir.path().join("src/fmt");
        fs::create_dir_all(&pkg_dir).unwrap();
        fs::write(pkg_dir.join("print.go"), "package fmt\n\nfunc Println() {}\n").unwrap();

        let session = session_with_root(dir.path());
        let first = session.build_import_path("fmt").unwrap();
        let second = session.build_import_path("fmt").unwrap();
        assert_eq!(session.codegen().import_path(&first), session.codegen().import_path(&second));
    }

    #[test]
    fn dependency_is_inserted_before_dependent() {
        let dir = tempfile::tempdir().unwrap();
        let a_dir = dir.path().join("src/a");
        let b_dir = dir.path().join("src/b");
        fs::create_dir_all(&a_dir).unwrap();
        fs::create_dir_all(&b_dir).unwrap();
        fs::write(a_dir.join("a.go"), "package a\n\nimport \"b\"\n\nfunc F() { b.G() }\n").unwrap();
        fs::write(b_dir.join("b.go"), "package b\n\nfunc G() {}\n").unwrap();

        let session = session_with_root(dir.path());
        session.build_import_path("a").unwrap();
        assert!(session.archives_snapshot().contains_key("b"));
        assert!(session.archives_snapshot().contains_key("a"));
    }
}
