//! The code-generation seam: turns augmented ASTs into an [`Archive`][CodeGenerator::Archive].
//!
//! Deliberately out of scope per spec §1 (the real code generator and its
//! archive format are external collaborators). This module defines the
//! trait the [`crate::session::Session`] is generic over, plus
//! [`echo::EchoCodeGenerator`], a fully-functional stand-in used by tests
//! and by consumers that don't yet have a real backend wired up.

pub mod echo;

use crate::descriptor::PackageDescriptor;
use crate::error::Result;
use crate::parser::Ast;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// Callback the [`crate::session::Session`] passes to [`CodeGenerator::compile`] so the
/// generator can resolve an import on demand, re-entering the Session's build path.
pub trait ImportContext<A> {
    fn resolve(&mut self, import_path: &str) -> Result<A>;
}

impl<A, F: FnMut(&str) -> Result<A>> ImportContext<A> for F {
    fn resolve(&mut self, import_path: &str) -> Result<A> {
        self(import_path)
    }
}

/// The pluggable backend that turns a package's augmented ASTs into an archive.
///
/// `Archive` is opaque to the rest of the crate except for the observable attributes
/// spec §3 names: import path, included scripts, and a dependency list retrievable via
/// [`CodeGenerator::dependencies`] (the "external dependency-closure operation").
pub trait CodeGenerator {
    /// The compiled artifact of one package. Must round-trip through `serde_json` so
    /// the Session can persist it to `object_path` and reload it for staleness hits.
    type Archive: Clone + fmt::Debug + Serialize + DeserializeOwned;

    /// Type information produced alongside an archive, cached by the Session under the
    /// same uniqueness/immutability rules as `archives`.
    type Types: Clone + fmt::Debug;

    /// The toolchain version this generator expects; checked against the host
    /// toolchain's reported version at `Session` construction.
    fn expected_version(&self) -> &str;

    /// Compiles `asts` (the Augmentor's output for `descriptor`) into an archive and its
    /// type information. `import_ctx` resolves imports that are not yet in the
    /// Session's cache by recursively building them.
    fn compile(
        &self,
        descriptor: &PackageDescriptor,
        asts: &[Ast],
        import_ctx: &mut dyn ImportContext<Self::Archive>,
    ) -> Result<(Self::Archive, Self::Types)>;

    /// The import path an archive was compiled for.
    fn import_path<'a>(&self, archive: &'a Self::Archive) -> &'a str;

    /// Injected auxiliary script bytes carried by an archive, to be emitted verbatim
    /// with the linked output.
    fn included_scripts<'a>(&self, archive: &'a Self::Archive) -> &'a [u8];

    /// The archive's direct dependency import paths (the "dependency-closure
    /// operation" spec §3 describes; the Link Writer walks this transitively).
    fn dependencies(&self, archive: &Self::Archive) -> Vec<String>;

    /// Appends `script` to `archive`'s included-scripts buffer, wrapped in the
    /// scoped-invocation prologue/epilogue (spec §4.4 point 4).
    fn append_script(&self, archive: &mut Self::Archive, script: &[u8]);

    /// Renders `archive`'s own generated code (not its dependencies') to `out`, used by
    /// the Link Writer while walking the dependency closure.
    fn emit(&self, archive: &Self::Archive, out: &mut dyn std::io::Write) -> Result<()>;
}
