//! [`EchoCodeGenerator`]: a fully-functional but intentionally simple
//! [`super::CodeGenerator`] implementation. It "compiles" a package by
//! rendering its surviving declarations as commented text, resolving every
//! import through the supplied [`super::ImportContext`] so dependency
//! discovery and the Session's recursion are genuinely exercised.

use super::{CodeGenerator, ImportContext};
use crate::descriptor::PackageDescriptor;
use crate::error::Result;
use crate::parser::Ast;
use serde::{Deserialize, Serialize};
use std::io::Write as _;

/// The archive produced by [`EchoCodeGenerator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoArchive {
    import_path: String,
    body: String,
    included_scripts: Vec<u8>,
    dependencies: Vec<String>,
}

/// Type information produced by [`EchoCodeGenerator`]; empty, since this generator
/// performs no type checking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EchoTypes;

/// A code generator that renders declarations as comments instead of invoking a real
/// compiler backend. Good enough to drive and test the resolver, augmentor, session and
/// link writer end to end without a language implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoCodeGenerator {
    version: &'static str,
}

impl EchoCodeGenerator {
    pub fn new(version: &'static str) -> Self {
        Self { version }
    }
}

impl CodeGenerator for EchoCodeGenerator {
    type Archive = EchoArchive;
    type Types = EchoTypes;

    fn expected_version(&self) -> &str {
        self.version
    }

    fn compile(
        &self,
        descriptor: &PackageDescriptor,
        asts: &[Ast],
        import_ctx: &mut dyn ImportContext<Self::Archive>,
    ) -> Result<(Self::Archive, Self::Types)> {
        let mut body = String::new();
        let mut dependencies = Vec::new();

        for ast in asts {
            for import in &ast.imports {
                let dep = import_ctx.resolve(&import.path)?;
                dependencies.push(self.import_path(&dep).to_string());
            }
            for decl in &ast.declarations {
                for key in decl.keys() {
                    body.push_str(&format!("// {} :: {}\n", descriptor.import_path, key));
                }
            }
        }
        dependencies.sort();
        dependencies.dedup();

        let archive = EchoArchive {
            import_path: descriptor.import_path.clone(),
            body,
            included_scripts: Vec::new(),
            dependencies,
        };
        Ok((archive, EchoTypes))
    }

    fn import_path<'a>(&self, archive: &'a Self::Archive) -> &'a str {
        &archive.import_path
    }

    fn included_scripts<'a>(&self, archive: &'a Self::Archive) -> &'a [u8] {
        &archive.included_scripts
    }

    fn dependencies(&self, archive: &Self::Archive) -> Vec<String> {
        archive.dependencies.clone()
    }

    fn append_script(&self, archive: &mut Self::Archive, script: &[u8]) {
        archive.included_scripts.extend_from_slice(b"(function() {\n");
        archive.included_scripts.extend_from_slice(script);
        archive.included_scripts.extend_from_slice(b"\n}).call(this);\n");
    }

    fn emit(&self, archive: &Self::Archive, out: &mut dyn std::io::Write) -> Result<()> {
        writeln!(out, "// package {}", archive.import_path).map_err(|e| crate::error::Error::io(e, ""))?;
        out.write_all(archive.body.as_bytes()).map_err(|e| crate::error::Error::io(e, ""))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Declaration, ImportSpec};

    #[test]
    fn resolves_imports_and_records_dependencies() {
        let gen = EchoCodeGenerator::new("1.0");
        let descriptor = PackageDescriptor::new("app", "/tmp/app");
        let ast = Ast {
            file_name: "main.go".into(),
            package_name: "main".into(),
            imports: vec![ImportSpec { path: "fmt".into(), alias: "fmt".into(), line: 1, column: 1 }],
            declarations: vec![Declaration::Function {
                receiver: None,
                name: "main".into(),
                body: String::new(),
            }],
        };
        let mut resolve = |path: &str| -> Result<EchoArchive> {
            Ok(EchoArchive {
                import_path: path.to_string(),
                body: String::new(),
                included_scripts: Vec::new(),
                dependencies: Vec::new(),
            })
        };
        let (archive, _types) = gen.compile(&descriptor, &[ast], &mut resolve).unwrap();
        assert_eq!(archive.dependencies, vec!["fmt".to_string()]);
        assert!(archive.body.contains("app :: main"));
    }
}
