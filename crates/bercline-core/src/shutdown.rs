//! Graceful shutdown support via atomic flag.
//!
//! The scan coordinator and the sink poll the flag; in-flight probes are
//! allowed to finish before pools wind down and the final flush runs.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global shutdown flag — set by the SIGTERM/SIGINT handler
pub fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

/// Check if shutdown was requested
pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}

/// Request shutdown (for signal handlers and tests)
pub fn request_shutdown() {
    shutdown_flag().store(true, Ordering::Relaxed);
}

/// Register SIGTERM/SIGINT handlers.
///
/// First signal sets the graceful flag; a second one force-exits with the
/// conventional 130.
pub fn install_signal_handlers() {
    // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGTERM, || {
            if shutdown_flag().swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
        })
        .expect("Failed to register SIGTERM handler");
        signal_hook::low_level::register(signal_hook::consts::SIGINT, || {
            if shutdown_flag().swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
        })
        .expect("Failed to register SIGINT handler");
    }
}
