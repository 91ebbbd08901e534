//! Shutdown and cancellation coordination
//!
//! `CancellationSignal` is the cancellation input accepted by publish,
//! batch-publish and the consumer loop. `ShutdownCoordinator` wires process
//! signals (SIGINT, SIGTERM, ...) to one such signal for the binary.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Cloneable, one-shot cancellation flag with async notification
///
/// Once cancelled it stays cancelled. Clones share state.
#[derive(Clone, Debug)]
pub struct CancellationSignal {
    requested: Arc<AtomicBool>,
    tx: broadcast::Sender<()>,
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(8);
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    /// Request cancellation and wake every waiter
    pub fn cancel(&self) {
        // Release pairs with the Acquire in is_cancelled()
        self.requested.store(true, Ordering::Release);
        let _ = self.tx.send(());
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Resolve once cancellation has been requested
    pub async fn cancelled(&self) {
        // Subscribe before checking the flag so a concurrent cancel() is never missed
        let mut rx = self.tx.subscribe();
        if self.is_cancelled() {
            return;
        }
        let _ = rx.recv().await;
    }
}

/// Coordinates graceful shutdown across the application
pub struct ShutdownCoordinator {
    signal: CancellationSignal,
    signal_count: Arc<AtomicUsize>,
}

impl ShutdownCoordinator {
    /// Create a coordinator without installing process signal handlers
    pub fn new() -> Self {
        Self {
            signal: CancellationSignal::new(),
            signal_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a coordinator and route process signals to it
    ///
    /// Must be called from within a tokio runtime.
    pub fn install() -> Self {
        let coordinator = Self::new();
        setup_signal_handlers(
            coordinator.signal.clone(),
            coordinator.signal_count.clone(),
        );
        coordinator
    }

    /// Cancellation signal shared with publishers and consumers
    pub fn signal(&self) -> CancellationSignal {
        self.signal.clone()
    }

    pub fn trigger_shutdown(&self) {
        self.signal.cancel();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.signal.is_cancelled()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Set up signal handlers for graceful shutdown
///
/// A second signal forces an immediate exit.
fn setup_signal_handlers(signal: CancellationSignal, signal_count: Arc<AtomicUsize>) {
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        use tokio::signal::unix::{signal as unix_signal, SignalKind};
        let kinds = [
            SignalKind::interrupt(),
            SignalKind::terminate(),
            SignalKind::hangup(),
            SignalKind::quit(),
        ];

        for kind in kinds {
            let signal = signal.clone();
            let counter = signal_count.clone();

            tokio::spawn(async move {
                if let Ok(mut sig) = unix_signal(kind) {
                    if sig.recv().await.is_some() {
                        let prev = counter.fetch_add(1, Ordering::AcqRel);
                        log::info!("Shutdown signal received, draining in-flight work");
                        signal.cancel();
                        if prev >= 1 {
                            log::warn!("Second shutdown signal received; exiting");
                            std::process::exit(130);
                        }
                    }
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let prev = signal_count.fetch_add(1, Ordering::AcqRel);
                signal.cancel();
                if prev >= 1 {
                    std::process::exit(130);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_signal_starts_uncancelled() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());

        let waited = timeout(Duration::from_millis(30), signal.cancelled()).await;
        assert!(waited.is_err(), "cancelled() should still be pending");
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiters_on_clones() {
        let signal = CancellationSignal::new();
        let waiter = signal.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            true
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.cancel();

        let woke = timeout(Duration::from_millis(200), handle).await;
        assert!(matches!(woke, Ok(Ok(true))));
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_after_cancel() {
        let signal = CancellationSignal::new();
        signal.cancel();

        let waited = timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(waited.is_ok());
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_coordinator_trigger_reaches_shared_signal() {
        let coordinator = ShutdownCoordinator::new();
        let signal = coordinator.signal();

        assert!(!coordinator.is_shutdown_requested());
        coordinator.trigger_shutdown();

        assert!(coordinator.is_shutdown_requested());
        assert!(signal.is_cancelled());
    }
}
