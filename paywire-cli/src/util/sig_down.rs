//! Turns SIGINT/SIGTERM (Ctrl-C on Windows) into call cancellation.
//!
//! [`SigDown`] spawns one listener task that cancels a [`CancellationToken`]
//! on the first signal. The engine watches the token, so an interrupted call
//! stops at its next await point and still reports whether a payment header
//! had already been sent.

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Exit status for a call interrupted by a signal (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Signal listener owning the cancellation token of the current call.
#[allow(missing_debug_implementations)] // TaskTracker doesn't impl Debug
pub struct SigDown {
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl SigDown {
    /// Installs the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if signal registration fails.
    #[allow(clippy::unnecessary_wraps)] // Result needed on Unix for signal registration
    pub fn try_new() -> Result<Self, std::io::Error> {
        let inner = CancellationToken::new();
        let outer = inner.clone();
        let task_tracker = TaskTracker::new();

        #[cfg(unix)]
        {
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            task_tracker.spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                    () = inner.cancelled() => return,
                }
                #[cfg(feature = "telemetry")]
                tracing::warn!("Interrupted, cancelling the call");
                inner.cancel();
            });
        }

        #[cfg(windows)]
        {
            task_tracker.spawn(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => inner.cancel(),
                    () = inner.cancelled() => {}
                }
            });
        }

        task_tracker.close();
        Ok(Self {
            task_tracker,
            cancellation_token: outer,
        })
    }

    /// A token cancelled when a signal arrives.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Whether a signal has arrived.
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Stops listening and waits for the listener task to exit.
    ///
    /// After this, [`Self::interrupted`] reports `true` even when no signal
    /// arrived, so read it first.
    pub async fn shutdown(self) {
        self.cancellation_token.cancel();
        self.task_tracker.wait().await;
    }
}
