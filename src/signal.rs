//! SIGINT wiring for cooperative cancellation.
//!
//! The handler only flips the shared cancel flag; the engine notices at
//! the next node boundary and still runs any pending `always` cleanup
//! before terminating.

use log::debug;
use reconcile::CancelToken;
use std::sync::OnceLock;

static CANCEL: OnceLock<CancelToken> = OnceLock::new();

extern "C" fn handle_sigint(_signum: libc::c_int) {
    // Async-signal-safe: an atomic store, nothing else
    if let Some(token) = CANCEL.get() {
        token.cancel();
    }
}

/// Install the SIGINT handler for the given token. Effective once per
/// process.
pub fn install(token: &CancelToken) {
    if CANCEL.set(token.clone()).is_err() {
        return;
    }
    debug!("installing SIGINT handler");
    #[allow(unsafe_code)]
    unsafe {
        libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
    }
}
