//! Ctrl+C handling for graceful shutdown.
//!
//! Ctrl+C sets a shared `AtomicBool`. The walker checks it between entries,
//! so a run stops after the file it is working on. A replacement is a single
//! rename, so stopping never leaves a half-replaced file. The run then
//! reports its summary and exits with code 130.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupelink::dedup::EngineConfig;
//! use dupelink::signal::install_handler;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! let config = EngineConfig::default().with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// `true` once Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) was called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a shutdown without a signal.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The flag to hand to [`crate::dedup::EngineConfig::with_shutdown_flag`].
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag so the handler can be reused by the next run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C handler, or reuse the one installed
/// earlier in this process (with its flag cleared).
///
/// If another component already owns the signal hook, an unhooked handler
/// is returned; it still honours [`ShutdownHandler::request_shutdown`].
///
/// # Errors
///
/// Currently always succeeds; the `Result` leaves room for platforms where
/// installation failure should be fatal.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    let installed = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(
            std::io::stderr(),
            "\nInterrupted. Stopping after the current file..."
        );
        let _ = std::io::stderr().flush();
    });

    let handler = match installed {
        Ok(()) => handler,
        Err(e) => {
            log::debug!("Ctrl+C handler not installed ({}), using unhooked handler", e);
            ShutdownHandler::new()
        }
    };

    Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone())
}
