//! Throwaway [`crate::context::BuildContext`]/[`crate::session::Session`]
//! construction for tests, gated behind the `project-util` feature — the
//! same role the teacher's `project_util` feature plays for `Project`.

#![cfg(feature = "project-util")]

use crate::codegen::echo::EchoCodeGenerator;
use crate::context::BuildContext;
use crate::error::Result;
use crate::parser::StructuralParser;
use crate::session::{BuildOptions, Session};
use rand::Rng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A library-root directory plus (optionally) one workspace, both backed by a
/// [`TempDir`] that is removed when this value is dropped.
pub struct TestProject {
    _library_root_dir: TempDir,
    _workspace_dir: TempDir,
    library_root: PathBuf,
    workspace: PathBuf,
}

impl TestProject {
    /// Creates an empty library root and workspace under fresh temporary directories.
    pub fn new() -> Result<Self> {
        let library_root_dir = tempfile::tempdir().map_err(|err| crate::error::Error::io(err, "."))?;
        let workspace_dir = tempfile::tempdir().map_err(|err| crate::error::Error::io(err, "."))?;
        let library_root = library_root_dir.path().to_path_buf();
        let workspace = workspace_dir.path().to_path_buf();
        Ok(Self { _library_root_dir: library_root_dir, _workspace_dir: workspace_dir, library_root, workspace })
    }

    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Writes `content` to `<library_root>/src/<import_path>/<file_name>`, creating
    /// directories as needed.
    pub fn add_library_file(&self, import_path: &str, file_name: &str, content: &str) -> Result<()> {
        let dir = self.library_root.join("src").join(import_path);
        std::fs::create_dir_all(&dir).map_err(|err| crate::error::Error::io(err, &dir))?;
        std::fs::write(dir.join(file_name), content).map_err(|err| crate::error::Error::io(err, &dir))
    }

    /// Writes `content` to `<workspace>/src/<import_path>/<file_name>`.
    pub fn add_workspace_file(&self, import_path: &str, file_name: &str, content: &str) -> Result<()> {
        let dir = self.workspace.join("src").join(import_path);
        std::fs::create_dir_all(&dir).map_err(|err| crate::error::Error::io(err, &dir))?;
        std::fs::write(dir.join(file_name), content).map_err(|err| crate::error::Error::io(err, &dir))
    }

    /// Copies this project's entire library root and workspace into a new temporary
    /// location, returning the clone — useful for snapshot-and-mutate style tests.
    pub fn clone_into_temp(&self) -> Result<Self> {
        let cloned = Self::new()?;
        let options = fs_extra::dir::CopyOptions::new().content_only(true);
        fs_extra::dir::copy(&self.library_root, cloned.library_root(), &options)
            .map_err(|err| crate::error::Error::msg(err.to_string()))?;
        fs_extra::dir::copy(&self.workspace, cloned.workspace(), &options)
            .map_err(|err| crate::error::Error::msg(err.to_string()))?;
        Ok(cloned)
    }

    /// Builds the [`BuildContext`] for this project.
    pub fn context(&self) -> BuildContext {
        BuildContext::new(&self.library_root, vec![self.workspace.clone()])
    }

    /// Builds a [`Session`] over [`StructuralParser`] and [`EchoCodeGenerator`] for this
    /// project, with a randomly suffixed install tag so parallel test runs never share
    /// an object path.
    pub fn session(&self) -> Result<Session<StructuralParser, EchoCodeGenerator>> {
        let tag: u32 = rand::thread_rng().gen();
        let options = BuildOptions::new()
            .library_root(&self.library_root)
            .workspace_path(vec![self.workspace.clone()])
            .build_tags(vec![format!("test_{tag}")]);
        let version = format!("go1.{}", crate::context::CURRENT_RELEASE_MINOR);
        Session::new(options, StructuralParser, EchoCodeGenerator::new(Box::leak(version.into_boxed_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_files_under_library_root_and_workspace() {
        let project = TestProject::new().unwrap();
        project.add_library_file("fmt", "print.go", "package fmt\n").unwrap();
        project.add_workspace_file("app", "main.go", "package main\n").unwrap();

        assert!(project.library_root().join("src/fmt/print.go").exists());
        assert!(project.workspace().join("src/app/main.go").exists());
    }
}
