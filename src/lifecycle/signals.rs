//! OS signal handling.
//!
//! Ctrl-C cancels the running command's context. The in-flight connection
//! attempt or retry pause finishes; the retry loop stops at its next check.

use crate::lifecycle::cancel::CancelToken;

/// Spawn a task that cancels `token` on Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancelToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, cancelling");
                token.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });
}
