//! The Source Augmentor: parses a package's sources and overlays any
//! declarations provided by the natives virtual filesystem.

use crate::context::{BuildContext, FsOps, TOOLCHAIN_PATH};
use crate::descriptor::PackageDescriptor;
use crate::error::ParseError;
use crate::parser::{Ast, SourceParser};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// The real import path of the concurrency package rewritten to the no-op replacement.
const SYNC_IMPORT_PATH: &str = "sync";

/// The no-op replacement's import path, served from the toolchain virtual tree.
fn nosync_import_path() -> String {
    format!("{TOOLCHAIN_PATH}/nosync")
}

/// Standard-library packages whose code imports the concurrency package and must have
/// that import rewritten to the no-op replacement.
const PACKAGES_REWRITING_SYNC: &[&str] = &["io", "os", "time", "context", "net", "log"];

/// Phase A: parses every native source file for `descriptor`'s (base) import path,
/// returning both the set of declaration names it overlays and the parsed native ASTs
/// themselves. `init` is never part of the replacement set: initializers are additive.
/// The native ASTs carry the real bodies the code generator must see for shadowed
/// names — callers must merge them into the final AST list rather than discard them
/// once the names have been collected.
pub fn gather_overlay_names<P: SourceParser>(
    parser: &P,
    natives_fs: &dyn FsOps,
    descriptor: &PackageDescriptor,
) -> crate::error::Result<(BTreeSet<String>, Vec<Ast>)> {
    let mut replacement_set = BTreeSet::new();
    let mut native_asts = Vec::new();
    let native_dir = PathBuf::from("/").join(descriptor.base_import_path());

    if !natives_fs.is_dir(&native_dir) {
        return Ok((replacement_set, native_asts));
    }

    let mut names = natives_fs.read_dir(&native_dir)?;
    names.sort();

    for name in names {
        if !crate::paths::is_source_file(&name) {
            continue;
        }
        if descriptor.is_external_test() && !name.contains("_xtest") {
            continue;
        }
        if !descriptor.is_external_test() && name.contains("_xtest") {
            continue;
        }
        let content = natives_fs.open(&native_dir.join(&name))?;
        let content = String::from_utf8_lossy(&content);
        let (ast, _errors) = parser.parse(&name, &content);
        for decl in &ast.declarations {
            if decl.is_init() {
                continue;
            }
            replacement_set.extend(decl.keys());
        }
        native_asts.push(ast);
    }

    Ok((replacement_set, native_asts))
}

/// Phase B: parses `descriptor`'s own source files, rewriting the concurrency import
/// where applicable and shadowing every declaration named in `replacement_set`. Errors
/// are accumulated per file (capped per [`crate::error::MAX_PARSE_ERRORS_PER_FILE`]) and
/// returned alongside the (possibly partial) ASTs — one failed file never aborts the
/// rest.
pub fn shadow_sources<P: SourceParser>(
    parser: &P,
    ctx: &BuildContext,
    descriptor: &PackageDescriptor,
    replacement_set: &BTreeSet<String>,
) -> (Vec<Ast>, Vec<ParseError>) {
    let fs = ctx.fs();
    let mut asts = Vec::new();
    let mut errors = Vec::new();

    for file_name in &descriptor.go_files {
        let path = descriptor.directory.join(file_name);
        let content = match fs.open(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                errors.push(ParseError::new(err.to_string(), 0, 0));
                continue;
            }
        };
        let content = String::from_utf8_lossy(&content);
        let (ast, parse_errors) = parser.parse(file_name, &content);
        errors.extend(parse_errors);

        let ast = if PACKAGES_REWRITING_SYNC.contains(&descriptor.import_path.as_str()) {
            ast.with_import_rewritten(SYNC_IMPORT_PATH, &nosync_import_path())
        } else {
            ast
        };

        let shadowed = ast.shadowed(replacement_set);
        let referenced = referenced_aliases(&shadowed);
        let pruned = shadowed.with_unused_imports_dropped(&referenced);

        asts.push(pruned);
    }

    (asts, errors)
}

/// Collects the set of import aliases still referenced by any surviving declaration
/// body, by a simple substring scan for `<alias>.` — good enough given this crate's
/// structural (not semantic) parser.
fn referenced_aliases(ast: &Ast) -> BTreeSet<String> {
    let mut referenced = BTreeSet::new();
    for import in &ast.imports {
        let needle = format!("{}.", import.alias);
        let used = ast.declarations.iter().any(|decl| match decl {
            crate::parser::Declaration::Function { body, .. } => body.contains(&needle),
            crate::parser::Declaration::Type { body, .. } => body.contains(&needle),
            crate::parser::Declaration::Value { body, .. } => body.contains(&needle),
        });
        if used {
            referenced.insert(import.alias.clone());
        }
    }
    referenced
}

/// Runs both phases for `descriptor`, returning the augmented ASTs and any accumulated
/// parse errors. The native declarations' own ASTs are merged ahead of the package's
/// shadowed sources, so the code generator sees exactly one definition per
/// overlaid name: the natives' real body, never the placeholder the original
/// declaration was shadowed down to.
pub fn augment<P: SourceParser>(
    parser: &P,
    ctx: &BuildContext,
    descriptor: &PackageDescriptor,
) -> crate::error::Result<(Vec<Ast>, Vec<ParseError>)> {
    let natives_fs = ctx.natives_fs();
    let (replacement_set, native_asts) = gather_overlay_names(parser, &natives_fs, descriptor)?;
    let (shadowed_asts, errors) = shadow_sources(parser, ctx, descriptor, &replacement_set);

    let mut asts = native_asts;
    asts.extend(shadowed_asts);
    Ok((asts, errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StructuralParser;

    #[test]
    fn overlay_names_exclude_init() {
        let ctx = BuildContext::new("/usr/local/lib/js", vec![]);
        let descriptor = PackageDescriptor::new("runtime", "/usr/local/lib/js/src/runtime");
        let natives_fs = ctx.natives_fs();
        let (replacement_set, native_asts) =
            gather_overlay_names(&StructuralParser, &natives_fs, &descriptor).unwrap();
        assert!(replacement_set.contains("gopanic"));
        assert!(replacement_set.contains("deferreturn"));
        assert!(!replacement_set.contains("init"));
        assert!(!native_asts.is_empty());
    }

    #[test]
    fn augment_merges_native_bodies_ahead_of_shadowed_originals() {
        let ctx = BuildContext::new("/usr/local/lib/js", vec![]);
        let descriptor = PackageDescriptor::new("runtime", "/usr/local/lib/js/src/runtime");
        let (asts, _errors) = augment(&StructuralParser, &ctx, &descriptor).unwrap();

        let gopanic_bodies: Vec<&str> = asts
            .iter()
            .flat_map(|ast| &ast.declarations)
            .filter_map(|decl| match decl {
                crate::parser::Declaration::Function { name, body, .. } if name == "gopanic" => {
                    Some(body.as_str())
                }
                _ => None,
            })
            .collect();
        assert!(!gopanic_bodies.is_empty());
        assert!(gopanic_bodies.iter().any(|body| !body.is_empty()));
    }

    #[test]
    fn rewrites_sync_import_for_listed_packages() {
        let ctx = BuildContext::new("/usr/local/lib/js", vec![]);
        let mut descriptor = PackageDescriptor::new("time", "/tmp/does-not-exist");
        descriptor.go_files.push("tick.go".to_string());

        // source read will fail (directory does not exist); this still exercises the
        // per-file error accumulation path without aborting the whole package.
        let replacement_set = BTreeSet::new();
        let (asts, errors) = shadow_sources(&StructuralParser, &ctx, &descriptor, &replacement_set);
        assert!(asts.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn rewrites_sync_import_for_log_package() {
        assert!(PACKAGES_REWRITING_SYNC.contains(&"log"));
    }
}
