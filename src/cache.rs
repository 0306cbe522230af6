//! Staleness detection used by [`crate::session::Session::build_package`].
//!
//! Staleness here is purely modification-time based (spec §4.4 point 2), not
//! content-hash based like the teacher's original `SolFilesCache` — this
//! toolchain has no notion of a shared multi-project cache, only one
//! session's in-memory archive cache plus whatever is already on disk at
//! `object_path`.

use crate::context::{BuildContext, FsOps};
use std::path::Path;
use std::time::SystemTime;

/// Returns the toolchain executable's own modification time, or [`SystemTime::now`] if
/// it cannot be stat'd. A stat failure forces a rebuild rather than failing the build
/// outright (spec §9's first Open Question, resolved by preserving the documented
/// fallback).
pub fn toolchain_mod_time() -> SystemTime {
    std::env::current_exe()
        .and_then(|path| std::fs::metadata(&path))
        .and_then(|meta| meta.modified())
        .unwrap_or_else(|_| {
            warn!("failed to stat toolchain executable, treating toolchain as freshly changed");
            SystemTime::now()
        })
}

/// Compares `source_mod_time` against `object_path`'s modification time. Returns `true`
/// (up to date) only if `object_path` exists and is at least as new. A missing or
/// unreadable object is never an error here: it simply means the package is not yet
/// built.
pub fn is_up_to_date(ctx: &BuildContext, object_path: &Path, source_mod_time: SystemTime) -> bool {
    let fs = ctx.fs();
    let up_to_date = match fs.stat(object_path) {
        Ok(object_mod_time) => object_mod_time >= source_mod_time,
        Err(_) => false,
    };
    trace!(path = %object_path.display(), up_to_date, "cache staleness check");
    up_to_date
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn up_to_date_requires_object_at_least_as_new() {
        let ctx = BuildContext::new("/usr/local/lib/js", vec![]);
        let dir = tempfile::tempdir().unwrap();
        let object = dir.path().join("pkg.a");
        std::fs::write(&object, b"archive").unwrap();

        let object_mod_time = crate::utils::mtime(&object).unwrap();
        assert!(is_up_to_date(&ctx, &object, object_mod_time));
        assert!(!is_up_to_date(&ctx, &object, object_mod_time + Duration::from_secs(60)));
    }

    #[test]
    fn missing_object_is_never_up_to_date() {
        let ctx = BuildContext::new("/usr/local/lib/js", vec![]);
        assert!(!is_up_to_date(&ctx, Path::new("/nonexistent/pkg.a"), SystemTime::now()));
    }
}
