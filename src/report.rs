//! A swappable, thread-local reporter for user-facing build progress.
//!
//! Library code never prints directly; it either emits `tracing` events (for
//! structured logs) or calls into the reporter installed for the current
//! thread (for the kind of one-line progress a CLI front-end wants to show
//! while a build runs). Host applications that don't care just get the
//! no-op default.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Receives progress notifications from a [`crate::session::Session`] build.
pub trait Reporter {
    /// A package's sources were (re)parsed.
    fn on_parsed(&self, _import_path: &str) {}

    /// A package was found up to date and its cached archive was reused.
    fn on_cached(&self, _import_path: &str) {}

    /// A package was recompiled.
    fn on_compiled(&self, _import_path: &str) {}

    /// A non-fatal diagnostic should be shown to the user.
    fn on_message(&self, _message: &dyn fmt::Display) {}
}

/// A reporter that discards everything; the default when no scope is active.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

/// Prints progress to stderr, framing package names in green (compiled), yellow
/// (cached) or red (message/diagnostic) when `color` is set — the ANSI framing
/// `BuildOptions::color` toggles (spec §6), following the same `yansi::Color` mapping
/// `Severity::color` uses for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    pub color: bool,
}

impl ConsoleReporter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, color: yansi::Color) -> String {
        if self.color {
            yansi::Paint::new(text).fg(color).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Reporter for ConsoleReporter {
    fn on_cached(&self, import_path: &str) {
        eprintln!("{}", self.paint(&format!("(cached) {import_path}"), yansi::Color::Yellow));
    }

    fn on_compiled(&self, import_path: &str) {
        eprintln!("{}", self.paint(import_path, yansi::Color::Green));
    }

    fn on_message(&self, message: &dyn fmt::Display) {
        eprintln!("{}", self.paint(&message.to_string(), yansi::Color::Red));
    }
}

thread_local! {
    static CURRENT: RefCell<Rc<dyn Reporter>> = RefCell::new(Rc::new(NoopReporter));
}

/// Returns the reporter currently installed for this thread.
pub fn get_default() -> Rc<dyn Reporter> {
    CURRENT.with(|cell| cell.borrow().clone())
}

/// Installs `reporter` for the current thread for the duration of the returned guard;
/// restores the previous reporter when the guard is dropped.
pub fn set_scoped(reporter: Rc<dyn Reporter>) -> ScopedGuard {
    let previous = CURRENT.with(|cell| cell.replace(reporter));
    ScopedGuard { previous: Some(previous) }
}

/// RAII guard returned by [`set_scoped`].
#[must_use]
pub struct ScopedGuard {
    previous: Option<Rc<dyn Reporter>>,
}

impl Drop for ScopedGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            CURRENT.with(|cell| *cell.borrow_mut() = previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingReporter {
        compiled: Cell<u32>,
    }

    impl Reporter for CountingReporter {
        fn on_compiled(&self, _import_path: &str) {
            self.compiled.set(self.compiled.get() + 1);
        }
    }

    #[test]
    fn scoped_reporter_is_restored_after_guard_drops() {
        let reporter = Rc::new(CountingReporter::default());
        {
            let _guard = set_scoped(reporter.clone());
            get_default().on_compiled("pkg/a");
            get_default().on_compiled("pkg/b");
        }
        assert_eq!(reporter.compiled.get(), 2);

        // default reporter restored; calling it should not panic or affect `reporter`.
        get_default().on_compiled("pkg/c");
        assert_eq!(reporter.compiled.get(), 2);
    }
}
