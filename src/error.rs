//! Crate-wide error type.

use std::{fmt, path::PathBuf};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An I/O error tagged with the path that caused it.
#[derive(Debug, thiserror::Error)]
#[error("{io}: {path}", path = path.display())]
pub struct IoError {
    io: std::io::Error,
    path: PathBuf,
}

impl IoError {
    pub fn new(io: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self { io, path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Errors surfaced by the resolver, augmentor, session and link writer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    /// A package could not be found, was ambiguous, or is not buildable under the
    /// current [`crate::context::BuildContext`].
    #[error("cannot resolve package \"{0}\"")]
    Resolution(String),

    /// A package's source list contains foreign-function-interface sources, which are
    /// rejected up front.
    #[error("import of \"{0}\" refused: package uses foreign-function-interface sources")]
    ImportC(String),

    /// Accumulated parse errors for one source file, capped at ten with a trailing
    /// sentinel appended once the cap is hit.
    #[error("{} parse error(s) in {}", errors.len(), file.display())]
    Parse { file: PathBuf, errors: Vec<ParseError> },

    /// Surfaced verbatim from the external code generator.
    #[error("code generation failed for \"{import_path}\": {source}")]
    CodeGen { import_path: String, #[source] source: Box<dyn std::error::Error + Send + Sync> },

    /// The host toolchain's reported version does not match what the code generator
    /// expects. Fatal, raised from the `Session` constructor.
    #[error("toolchain version mismatch: session expects {expected}, host reports {found}")]
    VersionMismatch { expected: String, found: String },

    #[error("{0}")]
    Message(String),
}

impl Error {
    pub fn io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Error::Io(IoError::new(err, path))
    }

    pub fn msg(msg: impl fmt::Display) -> Self {
        Error::Message(msg.to_string())
    }

    pub fn resolution(import_path: impl Into<String>) -> Self {
        Error::Resolution(import_path.into())
    }
}

/// A single accumulated parse failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self { message: message.into(), line, column }
    }

    /// The synthetic sentinel appended once a file's error count hits the cap of ten.
    pub fn too_many_errors() -> Self {
        Self { message: "too many errors".to_string(), line: 0, column: 0 }
    }
}

/// Maximum number of parse errors accumulated per source file before the sentinel is
/// appended and parsing of that file stops.
pub const MAX_PARSE_ERRORS_PER_FILE: usize = 10;
