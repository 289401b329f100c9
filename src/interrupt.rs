//! Turning SIGINT/SIGTERM into an orderly stop
//!
//! The process must not die while plaintext archives sit in the temp
//! directory. [`InterruptFlag::install`] replaces the default "terminate"
//! action with a handler that only raises a flag. A Ctrl-C from the terminal
//! still reaches the running `tar`/`gpg` child (same process group); it dies,
//! its stage fails, and the runner unwinds through temp release. A signal
//! aimed at this process alone is noticed at the next stage boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{BackupError, BackupResult};

/// Shared "a termination signal arrived" flag
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// A flag nothing will raise unless told to
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGINT, SIGTERM and SIGHUP to a new flag. Once per process.
    pub fn install() -> BackupResult<Self> {
        let flag = Self::new();
        let handle = flag.clone();
        ctrlc::set_handler(move || handle.raise())
            .map_err(|e| BackupError::Io(format!("Failed to install signal handler: {}", e)))?;
        Ok(flag)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once the flag is raised
    pub fn check(&self) -> BackupResult<()> {
        if self.is_raised() {
            Err(BackupError::Interrupted)
        } else {
            Ok(())
        }
    }
}
