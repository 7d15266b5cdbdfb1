//! ## lwes-engine::shutdown
//! One cancellation signal fed by either an interrupt or an explicit close.

use std::io;
use std::sync::{Arc, OnceLock};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What ended an emitter's liveness task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT or SIGTERM reached the process.
    Interrupt,
    /// The owner called `close`.
    Close,
}

/// Fires at most once; the first trigger decides the reason.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<ShutdownReason>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an earlier trigger already won.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.token.cancel();
        first
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the first trigger and reports its reason.
    pub async fn cancelled(&self) -> ShutdownReason {
        self.token.cancelled().await;
        self.reason().unwrap_or(ShutdownReason::Close)
    }
}

/// Resolves on Ctrl-C, or SIGTERM where the platform has it.
pub async fn wait_for_interrupt() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Spawns a task that triggers `signal` with [`ShutdownReason::Interrupt`].
pub fn watch_interrupt(signal: ShutdownSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_interrupt().await {
            Ok(()) => {
                info!("interrupt received");
                signal.trigger(ShutdownReason::Interrupt);
            }
            Err(e) => warn!(error = %e, "cannot watch for interrupts"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_trigger_wins() {
        let signal = ShutdownSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };

        assert!(signal.trigger(ShutdownReason::Interrupt));
        assert!(!signal.trigger(ShutdownReason::Close));
        assert_eq!(waiter.await.unwrap(), ShutdownReason::Interrupt);
        assert_eq!(signal.reason(), Some(ShutdownReason::Interrupt));
    }

    #[test]
    fn untriggered_signal_has_no_reason() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());
        assert_eq!(signal.reason(), None);
    }
}
