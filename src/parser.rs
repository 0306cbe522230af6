//! The source-parsing seam and a structural parser good enough to discover
//! declarations, imports and positions without a full language implementation.
//!
//! Real lexing/type-checking is explicitly out of scope (spec §1); this
//! module's [`StructuralParser`] recognizes just enough surface syntax —
//! the `package` clause, `import` blocks, and top-level `func`/`type`/`var`/
//! `const` declarations — to drive resolution, augmentation and linking.
//! Consumers that have a real front-end implement [`SourceParser`] instead.

use crate::error::ParseError;
use std::collections::BTreeSet;

/// A top-level declaration as seen by the Source Augmentor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// A function or method. `receiver` holds the receiver type name for methods (the
    /// name is prefixed by it per spec §4.3), `None` for free functions.
    Function { receiver: Option<String>, name: String, body: String },
    /// A type specification.
    Type { name: String, body: String },
    /// A `var` or `const` binding; one declaration may introduce several names.
    Value { names: Vec<String>, body: String },
}

impl Declaration {
    /// The replacement-set key for this declaration: the method-qualified name for
    /// methods, the bare name otherwise. `Value` expands to one key per bound name.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Declaration::Function { receiver: Some(r), name, .. } => vec![format!("{r}.{name}")],
            Declaration::Function { receiver: None, name, .. } => vec![name.clone()],
            Declaration::Type { name, .. } => vec![name.clone()],
            Declaration::Value { names, .. } => names.clone(),
        }
    }

    /// `true` for the package initializer, which is additive and never shadowed.
    pub fn is_init(&self) -> bool {
        matches!(self, Declaration::Function { receiver: None, name, .. } if name == "init")
    }
}

/// A single `import` clause: the imported path and the local alias it is bound to (the
/// last path segment when no explicit alias is written).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub path: String,
    pub alias: String,
    pub line: u32,
    pub column: u32,
}

/// A parsed source file: its package clause, imports and top-level declarations.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub file_name: String,
    pub package_name: String,
    pub imports: Vec<ImportSpec>,
    pub declarations: Vec<Declaration>,
}

impl Ast {
    /// Replaces identifiers for any declaration whose key is in `replacement_set`: the
    /// declaration's name becomes the anonymous placeholder and, for functions, its
    /// body is discarded. Returns a new `Ast`; the receiver is left untouched
    /// (immutable clone-and-rewrite shadowing per the design notes).
    pub fn shadowed(&self, replacement_set: &BTreeSet<String>) -> Ast {
        let declarations = self
            .declarations
            .iter()
            .map(|decl| {
                let shadowed = decl.keys().iter().any(|k| replacement_set.contains(k));
                if !shadowed {
                    return decl.clone();
                }
                match decl {
                    Declaration::Function { receiver, name, .. } => Declaration::Function {
                        receiver: receiver.clone(),
                        name: anonymous_placeholder(name),
                        body: String::new(),
                    },
                    Declaration::Type { name, body } => {
                        Declaration::Type { name: anonymous_placeholder(name), body: body.clone() }
                    }
                    Declaration::Value { names, body } => Declaration::Value {
                        names: names.iter().map(|n| anonymous_placeholder(n)).collect(),
                        body: body.clone(),
                    },
                }
            })
            .collect();
        Ast { declarations, ..self.clone() }
    }

    /// Returns a new `Ast` with any import not referenced by `referenced` removed.
    pub fn with_unused_imports_dropped(&self, referenced: &BTreeSet<String>) -> Ast {
        let imports = self.imports.iter().filter(|i| referenced.contains(&i.alias)).cloned().collect();
        Ast { imports, ..self.clone() }
    }

    /// Returns a new `Ast` with any import of `target_path` rewritten to `replacement_path`,
    /// keeping the local alias so unqualified references still resolve.
    pub fn with_import_rewritten(&self, target_path: &str, replacement_path: &str) -> Ast {
        let imports = self
            .imports
            .iter()
            .map(|i| {
                if i.path == target_path {
                    ImportSpec { path: replacement_path.to_string(), ..i.clone() }
                } else {
                    i.clone()
                }
            })
            .collect();
        Ast { imports, ..self.clone() }
    }
}

fn anonymous_placeholder(original: &str) -> String {
    let _ = original;
    "_".to_string()
}

/// The pluggable lexer/parser-plus-type-checker seam. Deliberately out of scope per
/// spec §1; the crate ships [`StructuralParser`] so the pipeline is runnable without a
/// real front-end, but never assumes it is the one in use.
pub trait SourceParser {
    /// Parses `content` (the file named `file_name`, for diagnostics), returning the
    /// resulting [`Ast`] alongside any accumulated parse errors (capped at
    /// [`crate::error::MAX_PARSE_ERRORS_PER_FILE`] with a trailing sentinel). A
    /// completely unparseable file still yields a best-effort `Ast`.
    fn parse(&self, file_name: &str, content: &str) -> (Ast, Vec<ParseError>);
}

/// A structural parser: recognizes the `package` clause, `import` blocks and top-level
/// `func`/`type`/`var`/`const` declarations by line-oriented scanning. It does not
/// understand expressions or type syntax; declaration bodies are captured verbatim as
/// opaque text for the code generator to (re)parse if it needs more than structure.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralParser;

impl SourceParser for StructuralParser {
    fn parse(&self, file_name: &str, content: &str) -> (Ast, Vec<ParseError>) {
        let mut ast = Ast { file_name: file_name.to_string(), ..Ast::default() };
        let mut errors = Vec::new();
        let mut in_import_block = false;

        for (idx, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            let line_no = (idx + 1) as u32;

            if errors.len() >= crate::error::MAX_PARSE_ERRORS_PER_FILE {
                errors.push(ParseError::too_many_errors());
                break;
            }

            if let Some(rest) = line.strip_prefix("package ") {
                ast.package_name = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("import ") {
                if rest.trim_start().starts_with('(') {
                    in_import_block = true;
                } else {
                    match parse_import_clause(rest.trim()) {
                        Ok(spec) => ast.imports.push(ImportSpec { line: line_no, column: 1, ..spec }),
                        Err(message) => errors.push(ParseError::new(message, line_no, 1)),
                    }
                }
            } else if in_import_block {
                if line == ")" {
                    in_import_block = false;
                } else if !line.is_empty() {
                    match parse_import_clause(line) {
                        Ok(spec) => ast.imports.push(ImportSpec { line: line_no, column: 1, ..spec }),
                        Err(message) => errors.push(ParseError::new(message, line_no, 1)),
                    }
                }
            } else if let Some(decl) = parse_func_header(line) {
                ast.declarations.push(decl);
            } else if let Some(rest) = line.strip_prefix("type ") {
                if let Some(name) = rest.split_whitespace().next() {
                    ast.declarations.push(Declaration::Type {
                        name: name.trim_end_matches('{').to_string(),
                        body: line.to_string(),
                    });
                }
            } else if let Some(rest) = line.strip_prefix("var ").or_else(|| line.strip_prefix("const ")) {
                let names = parse_binding_names(rest);
                if !names.is_empty() {
                    ast.declarations.push(Declaration::Value { names, body: line.to_string() });
                }
            }
        }

        (ast, errors)
    }
}

fn parse_import_clause(clause: &str) -> std::result::Result<ImportSpec, String> {
    let clause = clause.trim_end_matches(';');
    let mut parts = clause.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or_default();
    let (alias_hint, path_literal) = match parts.next() {
        Some(rest) => (Some(first), rest.trim()),
        None => (None, first),
    };
    let path = path_literal.trim_matches('"').to_string();
    if path.is_empty() {
        return Err(format!("malformed import clause: {clause:?}"));
    }
    let alias = alias_hint
        .map(str::to_string)
        .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(&path).to_string());
    Ok(ImportSpec { path, alias, line: 0, column: 0 })
}

fn parse_func_header(line: &str) -> Option<Declaration> {
    let rest = line.strip_prefix("func ")?;
    let rest = rest.trim_start();
    if let Some(after_paren) = rest.strip_prefix('(') {
        // method: `func (r *T) Name(...)`
        let (receiver_clause, after) = after_paren.split_once(')')?;
        let receiver = receiver_clause.split_whitespace().last()?.trim_start_matches('*').to_string();
        let name = after.trim_start().split(|c: char| c == '(' || c.is_whitespace()).next()?;
        return Some(Declaration::Function {
            receiver: Some(receiver),
            name: name.to_string(),
            body: line.to_string(),
        });
    }
    let name = rest.split(|c: char| c == '(' || c.is_whitespace()).next()?;
    Some(Declaration::Function { receiver: None, name: name.to_string(), body: line.to_string() })
}

fn parse_binding_names(rest: &str) -> Vec<String> {
    let rest = rest.trim_start_matches('(').trim_end_matches(')');
    rest.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "=")
        .take_while(|s| !s.contains('='))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_package_and_import_and_func() {
        let source = "package fmt\n\nimport \"io\"\n\nfunc Println(a ...interface{}) {}\n";
        let parser = StructuralParser;
        let (ast, errors) = parser.parse("print.go", source);
        assert!(errors.is_empty());
        assert_eq!(ast.package_name, "fmt");
        assert_eq!(ast.imports.len(), 1);
        assert_eq!(ast.imports[0].path, "io");
        assert_eq!(ast.imports[0].alias, "io");
        assert_eq!(ast.declarations.len(), 1);
        assert_eq!(ast.declarations[0].keys(), vec!["Println".to_string()]);
    }

    #[test]
    fn discovers_method_with_qualified_key() {
        let source = "package sync\n\nfunc (m *Mutex) Lock() {}\n";
        let (ast, _) = StructuralParser.parse("sync.go", source);
        assert_eq!(ast.declarations[0].keys(), vec!["Mutex.Lock".to_string()]);
    }

    #[test]
    fn shadowing_clears_function_body_and_renames() {
        let source = "package sync\n\nfunc (m *Mutex) Lock() { real() }\n";
        let (ast, _) = StructuralParser.parse("sync.go", source);
        let mut replacement_set = BTreeSet::new();
        replacement_set.insert("Mutex.Lock".to_string());
        let shadowed = ast.shadowed(&replacement_set);
        match &shadowed.declarations[0] {
            Declaration::Function { name, body, .. } => {
                assert_eq!(name, "_");
                assert!(body.is_empty());
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn init_is_never_in_replacement_set_even_if_present() {
        let source = "package runtime\n\nfunc init() {}\n";
        let (ast, _) = StructuralParser.parse("runtime.go", source);
        assert!(ast.declarations[0].is_init());
    }
}
