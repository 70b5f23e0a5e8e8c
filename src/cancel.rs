//! Cooperative cancellation for the exploration loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

/// Shared stop flag polled by the explorer at step boundaries.
///
/// Clones observe the same underlying flag. Cancellation is cooperative:
/// an in-flight step always completes and persists before the loop exits.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Install a Ctrl-C / SIGTERM handler that trips the token.
pub fn install_ctrlc_handler(token: &CancelToken) -> Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        token.cancel();
    })
    .context("Failed to install Ctrl-C handler")
}
