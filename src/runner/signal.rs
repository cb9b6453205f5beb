//! Cooperative stop requests.
//!
//! The controller never reacts to a signal in the middle of a step; it
//! checks a [`StopSignal`] between steps and between attempts, then
//! persists and returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

/// Set from the SIGINT/SIGTERM handler.
static TERMINATION_REQUESTED: AtomicBool = AtomicBool::new(false);
static INSTALL: Once = Once::new();

/// A cloneable stop flag, optionally tied to process termination signals.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    process: bool,
}

impl StopSignal {
    /// A flag that only [`StopSignal::request`] can raise.
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that is also raised by SIGINT and SIGTERM.
    pub fn with_process_signals() -> Self {
        INSTALL.call_once(install_handlers);
        Self {
            flag: Arc::default(),
            process: true,
        }
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || (self.process && TERMINATION_REQUESTED.load(Ordering::SeqCst))
    }
}

#[cfg(unix)]
extern "C" fn on_termination(_signal: libc::c_int) {
    TERMINATION_REQUESTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_handlers() {
    let handler = on_termination as extern "C" fn(libc::c_int);
    // SAFETY: the handler only performs an atomic store, which is
    // async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_handlers() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_shared_between_clones() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_requested());
        signal.request();
        assert!(clone.is_requested());
    }

    #[test]
    fn independent_signals_do_not_interfere() {
        let a = StopSignal::new();
        let b = StopSignal::new();
        a.request();
        assert!(!b.is_requested());
    }
}
