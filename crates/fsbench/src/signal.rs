//! Interrupt handling using signal-hook.
//!
//! The first SIGINT/SIGTERM only sets a flag. Workload children get the same
//! signal from the terminal and fail, so the resulting error unwinds through
//! the mount guard and the mount is released. A second signal exits at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;

/// Exit status used when a second signal arrives.
const FORCED_EXIT_STATUS: i32 = 130;

static SHUTDOWN_REQUESTED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

fn shutdown_flag() -> &'static Arc<AtomicBool> {
    SHUTDOWN_REQUESTED.get_or_init(|| Arc::new(AtomicBool::new(false)))
}

/// Install handlers for the termination signals.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn install_signal_handler() -> Result<(), std::io::Error> {
    static INSTALLED: AtomicBool = AtomicBool::new(false);
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let shutdown = shutdown_flag();
    for &sig in TERM_SIGNALS {
        // Order matters: the conditional shutdown checks the flag before the
        // plain handler sets it.
        flag::register_conditional_shutdown(sig, FORCED_EXIT_STATUS, Arc::clone(shutdown))?;
        flag::register(sig, Arc::clone(shutdown))?;
    }
    Ok(())
}

/// Whether a termination signal has been received.
pub fn shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::SeqCst)
}
