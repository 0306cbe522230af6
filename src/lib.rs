#![doc = include_str!("../README.md")]
#![warn(rustdoc::all)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

pub mod error;
pub use error::{Error, Result};

pub mod utils;

pub mod report;

pub mod paths;
pub use paths::PathClass;

pub mod context;
pub use context::{BuildContext, EmbeddedFs, FsOps, RealFs};

pub mod vfs;

pub mod descriptor;
pub use descriptor::PackageDescriptor;

pub mod parser;
pub use parser::{Ast, SourceParser, StructuralParser};

pub mod augment;

pub mod codegen;
pub use codegen::{CodeGenerator, ImportContext};

pub mod resolver;
pub use resolver::ResolveMode;

pub mod cache;

pub mod sourcemap;

pub mod link;

pub mod watcher;
pub use watcher::Watcher;

pub mod session;
pub use session::{BuildOptions, Session};

/// Utilities for creating and testing throwaway build contexts/sessions.
#[cfg(feature = "project-util")]
pub mod testing;
