//! A thin wrapper over [`notify`] implementing spec §4.5's `wait_for_change`
//! semantics: block until a relevant file event arrives, ignore spurious
//! ones, and drain the channel in the background once told to stop so
//! closing the watcher never deadlocks.

use crate::error::{Error, Result};
use crate::paths::{is_ignored_name, is_script_file, is_source_file};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Registers package directories encountered during resolution and blocks on relevant
/// filesystem events.
pub struct Watcher {
    inner: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    stopped: Arc<std::sync::atomic::AtomicBool>,
}

impl Watcher {
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .map_err(|err| Error::msg(format!("failed to start filesystem watcher: {err}")))?;

        Ok(Self { inner: watcher, events: rx, stopped: Arc::new(std::sync::atomic::AtomicBool::new(false)) })
    }

    /// Registers `directory` for change notifications. Errors are logged and treated as
    /// non-fatal: a directory the watcher cannot observe just never triggers a rebuild.
    pub fn watch_directory(&mut self, directory: &Path) {
        if let Err(err) = self.inner.watch(directory, RecursiveMode::NonRecursive) {
            tracing::warn!(path = %directory.display(), error = %err, "failed to watch directory");
        }
    }

    /// Blocks until an event matches creation, write, removal, or rename of a
    /// non-ignored source or script file. Spurious events are discarded; watcher errors
    /// are logged and do not stop the wait.
    pub fn wait_for_change(&mut self) -> Result<PathBuf> {
        loop {
            match self.events.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(event)) => {
                    if let Some(path) = relevant_path(&event) {
                        return Ok(path);
                    }
                }
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "filesystem watcher error");
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.stopped.load(std::sync::atomic::Ordering::Relaxed) {
                        return Err(Error::msg("watcher stopped"));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::msg("watcher event channel closed"));
                }
            }
        }
    }

    /// Signals the watcher to stop and spawns a background thread that drains any
    /// further events, so a caller that drops the watcher mid-event-burst never
    /// deadlocks on a full channel.
    pub fn stop(self) {
        self.stopped.store(true, std::sync::atomic::Ordering::Relaxed);
        let events = self.events;
        std::thread::spawn(move || while events.recv().is_ok() {});
    }
}

fn relevant_path(event: &Event) -> Option<PathBuf> {
    let is_relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    if !is_relevant_kind {
        return None;
    }
    event
        .paths
        .iter()
        .find(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            !is_ignored_name(name) && (is_source_file(name) || is_script_file(name))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};

    #[test]
    fn ignores_hidden_and_unrelated_files() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/tmp/pkg/.hidden.go"))
            .add_path(PathBuf::from("/tmp/pkg/README.md"));
        assert!(relevant_path(&event).is_none());
    }

    #[test]
    fn matches_go_source_modification() {
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/tmp/pkg/main.go"));
        assert_eq!(relevant_path(&event), Some(PathBuf::from("/tmp/pkg/main.go")));
    }
}
