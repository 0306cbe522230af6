//! The Package Resolver: turns an import path into a [`PackageDescriptor`].
//!
//! The override and rewrite tables below are the resolver's key design
//! decision (spec §4.2) and are reproduced exactly: a fixed set of
//! standard-library packages needs special-cased file-list surgery because
//! this toolchain's target lacks an operating system, real threads, or a
//! filesystem watcher of its own.

use crate::context::{BuildContext, FsOps, TOOLCHAIN_PATH};
use crate::descriptor::{PackageDescriptor, SourcePosition, EXTERNAL_TEST_SUFFIX};
use crate::error::{Error, Result};
use crate::parser::StructuralParser;
use std::path::PathBuf;

/// Import path of the host system-call package.
const SYSCALL_PATH: &str = "syscall";
/// Import path of the system-call bridge package (file discovery only).
const SYSCALL_BRIDGE_PATH: &str = "syscall/js";
/// Import path of the big-integer package.
const BIGINT_PATH: &str = "math/big";
/// Import path of the certificate-handling package.
const CERT_PATH: &str = "crypto/x509";
/// Import path of the user-information package.
const USER_INFO_PATH: &str = "os/user";
/// Import path of the OS package.
const OS_PATH: &str = "os";
/// Import path of the runtime package.
const RUNTIME_PATH: &str = "runtime";
/// Import path of the runtime/sys subpackage.
const RUNTIME_SYS_PATH: &str = "runtime/sys";
/// Import path of the runtime profiling subpackage.
const RUNTIME_PPROF_PATH: &str = "runtime/pprof";
/// Import path of the internal file-descriptor poller package.
const INTERNAL_POLL_PATH: &str = "internal/poll";
/// Import path of the concurrency (sync) package.
const SYNC_PATH: &str = "sync";
/// Import path of the cryptographic-randomness package.
const CRYPTO_RAND_PATH: &str = "crypto/rand";

/// Build-time mode flags threaded through resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveMode {
    /// The package contributes only file discovery, not compilable code (set for the
    /// system-call bridge package).
    pub find_only: bool,
    /// `true` when tests are in play for this resolution.
    pub with_tests: bool,
}

/// Resolves `import_path` to a [`PackageDescriptor`], applying the pre-lookup override
/// table, the generic path-to-package lookup, and the post-lookup rewrite table in that
/// order.
pub fn import(
    ctx: &BuildContext,
    import_path: &str,
    mode: ResolveMode,
    install_suffix: &str,
) -> Result<PackageDescriptor> {
    let _cwd = std::env::current_dir().unwrap_or_default();

    debug!(import_path, "resolving package");

    let mut ctx = ctx.clone();
    let mut mode = mode;
    let mut install_suffix = install_suffix.to_string();

    apply_pre_lookup_overrides(import_path, &mut ctx, &mut mode, &mut install_suffix);

    let mut descriptor = generic_lookup(&ctx, import_path)?;
    descriptor.is_command = false;

    apply_post_lookup_rewrites(import_path, &mut descriptor);

    if has_foreign_interface_sources(&ctx, &descriptor.directory)? {
        warn!(import_path, "rejecting import: package uses foreign-function-interface sources");
        return Err(Error::ImportC(import_path.to_string()));
    }

    collect_script_files(&ctx, &descriptor.directory, &mut descriptor)?;
    collect_imports(&ctx, &mut descriptor)?;

    trace!(
        import_path,
        go_files = descriptor.go_files.len(),
        script_files = descriptor.script_files.len(),
        "resolved package"
    );

    Ok(descriptor)
}

/// Pre-lookup overrides keyed on import path (spec §4.2 table 1).
fn apply_pre_lookup_overrides(
    import_path: &str,
    ctx: &mut BuildContext,
    mode: &mut ResolveMode,
    install_suffix: &mut String,
) {
    match import_path {
        SYSCALL_PATH => {
            ctx.arch = std::env::consts::ARCH.to_string();
            *install_suffix = format!("{install_suffix}_{}", ctx.arch);
            trace!(import_path, arch = %ctx.arch, "applied pre-lookup override");
        }
        SYSCALL_BRIDGE_PATH => {
            mode.find_only = true;
            trace!(import_path, "applied pre-lookup override: find_only");
        }
        BIGINT_PATH => {
            ctx.build_tags.push("math_big_pure_go".to_string());
            trace!(import_path, "applied pre-lookup override: pure-go build tag");
        }
        CERT_PATH | USER_INFO_PATH => {
            ctx.cgo_detection_enabled = false;
            trace!(import_path, "applied pre-lookup override: cgo detection disabled");
        }
        path if path.starts_with(&format!("{TOOLCHAIN_PATH}/")) => {
            // toolchain's own runtime-support packages: discovered straight from the
            // embedded tree, never shadowed by an on-disk vendor copy.
        }
        _ => {}
    }
}

/// Post-lookup rewrites applied to `descriptor.go_files` (spec §4.2 table 2).
fn apply_post_lookup_rewrites(import_path: &str, descriptor: &mut PackageDescriptor) {
    let before = descriptor.go_files.len();
    apply_post_lookup_rewrites_inner(import_path, descriptor);
    if descriptor.go_files.len() != before {
        trace!(
            import_path,
            before,
            after = descriptor.go_files.len(),
            "applied post-lookup file-list rewrite"
        );
    }
}

fn apply_post_lookup_rewrites_inner(import_path: &str, descriptor: &mut PackageDescriptor) {
    match import_path {
        OS_PATH => {
            descriptor.go_files.retain(|f| !f.starts_with("executable_"));
            descriptor.go_files.retain(|f| !f.starts_with("dirent_"));
        }
        RUNTIME_PATH => {
            descriptor.go_files.clear();
        }
        RUNTIME_SYS_PATH => {
            descriptor.go_files.retain(|f| f.starts_with("zerrors_") || f == "version.go");
        }
        RUNTIME_PPROF_PATH => {
            descriptor.go_files.clear();
        }
        INTERNAL_POLL_PATH => {
            descriptor.go_files.retain(|f| f != "fd_poll_runtime.go");
        }
        SYNC_PATH => {
            descriptor.go_files.retain(|f| f != "pool.go");
        }
        CRYPTO_RAND_PATH => {
            descriptor.go_files = vec!["rand.go".to_string(), "util.go".to_string()];
        }
        CERT_PATH => {
            descriptor.go_files.retain(|f| !f.starts_with("root_") || f == "root_unix.go");
            for injected in ["root_unix.go", "root_js.go"] {
                if !descriptor.go_files.iter().any(|f| f == injected) {
                    descriptor.go_files.push(injected.to_string());
                }
            }
        }
        SYSCALL_BRIDGE_PATH => {
            descriptor.xtest_files.push("js_test.go".to_string());
        }
        _ => {}
    }
}

/// The generic path-to-package lookup: locates `import_path`'s directory (toolchain
/// virtual tree, standard library root, or first matching workspace) and lists its
/// primary source and test files.
fn generic_lookup(ctx: &BuildContext, import_path: &str) -> Result<PackageDescriptor> {
    let fs = ctx.fs();

    let (directory, is_virtual) = if let Some(rest) = import_path.strip_prefix(&format!("{TOOLCHAIN_PATH}/")) {
        (ctx.library_root.join("src").join(TOOLCHAIN_PATH).join(rest), true)
    } else {
        let library_dir = ctx.library_root.join("src").join(import_path);
        if fs.is_dir(&library_dir) {
            (library_dir, false)
        } else {
            let mut found = None;
            for workspace in &ctx.workspaces {
                let candidate = workspace.join("src").join(import_path);
                if fs.is_dir(&candidate) {
                    found = Some(candidate);
                    break;
                }
            }
            match found {
                Some(dir) => (dir, false),
                None => return Err(Error::resolution(import_path)),
            }
        }
    };

    let mut descriptor = PackageDescriptor::new(import_path, &directory);
    descriptor.is_virtual = is_virtual;

    let mut names = fs.read_dir(&directory)?;
    names.sort();

    for name in names {
        if crate::paths::is_ignored_name(&name) {
            continue;
        }
        if crate::paths::is_source_file(&name) {
            if name.ends_with("_test.go") {
                descriptor.test_files.push(name);
            } else {
                descriptor.go_files.push(name);
            }
        }
    }

    if import_path.ends_with(EXTERNAL_TEST_SUFFIX) {
        // the base package was already resolved to get here; loose-file and
        // import-path entry points both route external tests through this suffix.
    }

    set_object_path(ctx, &mut descriptor);

    Ok(descriptor)
}

/// `true` if the package directory contains any non-ignored foreign-function-interface
/// source (a `.c` or `.h` file), checked against the raw directory listing rather than
/// `go_files` since those never include non-`.go` names.
fn has_foreign_interface_sources(ctx: &BuildContext, directory: &std::path::Path) -> Result<bool> {
    let fs = ctx.fs();
    if !fs.is_dir(directory) {
        return Ok(false);
    }
    for name in fs.read_dir(directory)? {
        if crate::paths::is_ignored_name(&name) {
            continue;
        }
        if name.ends_with(".c") || name.ends_with(".h") {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Resolves Open Question 2: when the library-root object path doesn't already exist,
/// walks every configured workspace in order and uses the first one whose copy of the
/// path exists, falling back to the first workspace if none do.
fn set_object_path(ctx: &BuildContext, descriptor: &mut PackageDescriptor) {
    if !descriptor.is_command {
        let mut rel = PathBuf::from("pkg").join(&ctx.arch).join(&descriptor.import_path);
        rel.set_extension("a");
        let under_library = ctx.library_root.join(&rel);
        if crate::utils::path_has_prefix(&under_library, &ctx.library_root) && !under_library.exists() {
            for workspace in &ctx.workspaces {
                let candidate = workspace.join(&rel);
                if candidate.exists() {
                    trace!(
                        workspace = %workspace.display(),
                        import_path = %descriptor.import_path,
                        "resolved object path via workspace fallback"
                    );
                    descriptor.object_path = Some(candidate);
                    return;
                }
            }
            if let Some(first_workspace) = ctx.workspaces.first() {
                trace!(
                    workspace = %first_workspace.display(),
                    import_path = %descriptor.import_path,
                    "no existing workspace copy found, defaulting object path to first workspace"
                );
                descriptor.object_path = Some(first_workspace.join(&rel));
                return;
            }
        }
        descriptor.object_path = Some(under_library);
    }
}

/// Marks `descriptor` as a command (executable) and sets its object path to
/// `<bin-dir>/<base-name>.js` under the first workspace.
pub fn mark_as_command(ctx: &BuildContext, descriptor: &mut PackageDescriptor, base_name: &str) {
    descriptor.is_command = true;
    let bin_dir =
        ctx.workspaces.first().map(|w| w.join("bin")).unwrap_or_else(|| ctx.library_root.join("bin"));
    descriptor.object_path = Some(bin_dir.join(format!("{base_name}.js")));
}

fn collect_script_files(
    ctx: &BuildContext,
    directory: &std::path::Path,
    descriptor: &mut PackageDescriptor,
) -> Result<()> {
    let fs = ctx.fs();
    if !fs.is_dir(directory) {
        return Ok(());
    }
    let mut names = fs.read_dir(directory)?;
    names.sort();
    for name in names {
        if crate::paths::is_script_file(&name) {
            descriptor.script_files.push(name);
        }
    }
    Ok(())
}

fn collect_imports(ctx: &BuildContext, descriptor: &mut PackageDescriptor) -> Result<()> {
    let fs = ctx.fs();
    for (idx, file_name) in descriptor.go_files.iter().enumerate() {
        let path = descriptor.directory.join(file_name);
        let content = match fs.open(&path) {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        let content = String::from_utf8_lossy(&content);
        let (ast, _errors) = StructuralParser.parse(file_name, &content);
        for import in ast.imports {
            descriptor.imports.insert(import.path.clone());
            descriptor
                .import_positions
                .entry(import.path)
                .or_default()
                .push(SourcePosition { file: idx, line: import.line, column: import.column });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scaffold() -> (TempDir, BuildContext) {
        let root = TempDir::new().unwrap();
        let ctx = BuildContext::new(root.path(), vec![]);
        (root, ctx)
    }

    #[test]
    fn runtime_package_go_files_are_cleared() {
        let (root, ctx) = scaffold();
        let dir = root.path().join("src/runtime");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("proc.go"), "package runtime\n").unwrap();

        let descriptor = import(&ctx, "runtime", ResolveMode::default(), "").unwrap();
        assert!(descriptor.go_files.is_empty());
    }

    #[test]
    fn os_package_drops_exec_and_dirent_variants() {
        let (root, ctx) = scaffold();
        let dir = root.path().join("src/os");
        fs::create_dir_all(&dir).unwrap();
        for f in ["file.go", "executable_linux.go", "dirent_linux.go"] {
            fs::write(dir.join(f), "package os\n").unwrap();
        }

        let descriptor = import(&ctx, "os", ResolveMode::default(), "").unwrap();
        assert_eq!(descriptor.go_files, vec!["file.go".to_string()]);
    }

    #[test]
    fn ignored_names_never_appear_in_file_lists() {
        let (root, ctx) = scaffold();
        let dir = root.path().join("src/fmt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("print.go"), "package fmt\n").unwrap();
        fs::write(dir.join("_hidden.go"), "package fmt\n").unwrap();
        fs::write(dir.join(".swap.go"), "package fmt\n").unwrap();

        let descriptor = import(&ctx, "fmt", ResolveMode::default(), "").unwrap();
        assert_eq!(descriptor.go_files, vec!["print.go".to_string()]);
    }

    #[test]
    fn foreign_interface_sources_are_rejected() {
        let (root, ctx) = scaffold();
        let dir = root.path().join("src/cgopkg");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bridge.c"), "/* c */").unwrap();

        let result = import(&ctx, "cgopkg", ResolveMode::default(), "");
        assert!(matches!(result, Err(Error::ImportC(path)) if path == "cgopkg"));
    }

    #[test]
    fn unresolvable_import_path_fails() {
        let (_root, ctx) = scaffold();
        let result = import(&ctx, "does/not/exist", ResolveMode::default(), "");
        assert!(result.is_err());
    }
}
