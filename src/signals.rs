//! The exit flag: single writer (the signal handler), many readers (the
//! event loop and the reconnect backoff loop), never shared across an
//! actual OS thread boundary in spirit even though `Arc<AtomicBool>`
//! technically is `Send`/`Sync` — this crate only ever runs on the single
//! current-thread tokio runtime the two binaries install.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to the process-wide shutdown flag.
#[derive(Clone)]
pub struct ExitFlag(Arc<AtomicBool>);

impl ExitFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Default for ExitFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs SIGINT/SIGTERM handlers that set `flag`. A second signal
/// terminates the process immediately, matching the original's
/// restore-default-disposition behavior.
pub async fn install(flag: ExitFlag) -> Result<(), Box<dyn std::error::Error>> {
    ctrlc2::set_async_handler(async move {
        if flag.is_set() {
            std::process::exit(130);
        }
        flag.set();
    })
    .await;
    Ok(())
}
