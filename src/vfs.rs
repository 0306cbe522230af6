//! Embedded read-only virtual filesystems compiled into the binary.
//!
//! Two trees are embedded: the toolchain-package stand-ins (mounted under
//! `<library_root>/src/<TOOLCHAIN_PATH>`) and the natives the Source
//! Augmentor overlays onto original sources. Both are plain
//! [`rust_embed::RustEmbed`] derives; [`crate::context::EmbeddedFs`] is the
//! [`crate::context::FsOps`] adapter over them.

use rust_embed::RustEmbed;

/// Target-specific stand-in packages substituted for parts of the standard library this
/// toolchain cannot compile as-is (e.g. the no-op concurrency package).
#[derive(RustEmbed)]
#[folder = "assets/toolchain"]
pub struct ToolchainAssets;

/// Declarations overlaid onto original sources by the Source Augmentor.
#[derive(RustEmbed)]
#[folder = "assets/natives"]
pub struct NativesAssets;
