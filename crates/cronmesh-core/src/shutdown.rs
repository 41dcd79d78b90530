//! Graceful shutdown
//!
//! One `ShutdownController` per process. Long-running workers (the scheduler
//! loop, the HTTP server) take a cancellation token and a `WorkerGuard`;
//! `shutdown()` cancels the tokens and waits, bounded by the drain timeout,
//! for every guard to be dropped.
//!
//! ```ignore
//! let shutdown = ShutdownController::new();
//! let guard = shutdown.track();
//! let token = shutdown.token();
//! tokio::spawn(async move {
//!     engine.run(token).await;
//!     drop(guard);
//! });
//! shutdown_signal_with_controller(shutdown).await;
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default time allowed for workers to finish after cancellation
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shutdown phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Normal operation
    Running,
    /// Tokens cancelled, waiting for workers
    Draining,
    /// Shutdown complete
    Terminated,
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Draining => write!(f, "Draining"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Coordinates cancellation and draining of workers
pub struct ShutdownController {
    cancel_token: CancellationToken,
    phase: AtomicU8,
    initiated: AtomicBool,
    active_workers: AtomicUsize,
    drained: Notify,
    timeout: Duration,
}

impl ShutdownController {
    /// Create a controller with the default drain timeout
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_timeout(DEFAULT_DRAIN_TIMEOUT)
    }

    /// Create a controller with a custom drain timeout
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            cancel_token: CancellationToken::new(),
            phase: AtomicU8::new(ShutdownPhase::Running as u8),
            initiated: AtomicBool::new(false),
            active_workers: AtomicUsize::new(0),
            drained: Notify::new(),
            timeout,
        })
    }

    /// Cancellation token for one worker
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> ShutdownPhase {
        match self.phase.load(Ordering::SeqCst) {
            0 => ShutdownPhase::Running,
            1 => ShutdownPhase::Draining,
            _ => ShutdownPhase::Terminated,
        }
    }

    /// Whether shutdown has been initiated
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.initiated.load(Ordering::SeqCst)
    }

    /// Register a worker; shutdown waits until the guard is dropped
    pub fn track(self: &Arc<Self>) -> WorkerGuard {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
        WorkerGuard {
            controller: Arc::clone(self),
        }
    }

    /// Number of registered workers still running
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    fn set_phase(&self, phase: ShutdownPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
        info!(phase = %phase, "Shutdown phase changed");
    }

    /// Cancel all workers and wait for them to finish
    ///
    /// Returns `false` if the drain timeout elapsed with workers still
    /// running. Only the first call does anything.
    pub async fn shutdown(&self) -> bool {
        if self
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Shutdown already initiated");
            return true;
        }

        info!("Initiating graceful shutdown...");
        self.set_phase(ShutdownPhase::Draining);
        self.cancel_token.cancel();

        let drained = tokio::time::timeout(self.timeout, self.wait_drained())
            .await
            .is_ok();

        if drained {
            info!("All workers stopped");
        } else {
            warn!(
                active_workers = self.active_workers(),
                timeout_secs = self.timeout.as_secs(),
                "Drain timeout exceeded, abandoning remaining workers"
            );
        }

        self.set_phase(ShutdownPhase::Terminated);
        drained
    }

    async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.active_workers() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Keeps a worker counted as active until dropped
pub struct WorkerGuard {
    controller: Arc<ShutdownController>,
}

impl WorkerGuard {
    /// Whether shutdown was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.controller.cancel_token.is_cancelled()
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if self.controller.active_workers.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.controller.drained.notify_waiters();
        }
    }
}

/// Wait for Ctrl+C or SIGTERM
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}

/// Wait for a signal, then run the controller's shutdown
pub async fn shutdown_signal_with_controller(controller: Arc<ShutdownController>) {
    wait_for_shutdown_signal().await;
    controller.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_phases() {
        let controller = ShutdownController::new();
        assert_eq!(controller.phase(), ShutdownPhase::Running);
        assert!(!controller.is_shutting_down());

        assert!(controller.shutdown().await);

        assert_eq!(controller.phase(), ShutdownPhase::Terminated);
        assert!(controller.is_shutting_down());
    }

    #[tokio::test]
    async fn test_tokens_are_cancelled() {
        let controller = ShutdownController::new();
        let token = controller.token();
        assert!(!token.is_cancelled());

        controller.shutdown().await;
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_worker_guard_counts() {
        let controller = ShutdownController::new();
        {
            let _a = controller.track();
            let _b = controller.track();
            assert_eq!(controller.active_workers(), 2);
        }
        assert_eq!(controller.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_workers() {
        let controller = ShutdownController::new();
        let guard = controller.track();
        let token = controller.token();

        let worker = tokio::spawn(async move {
            token.cancelled().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(guard.is_cancelled());
            drop(guard);
        });

        assert!(controller.shutdown().await);
        assert_eq!(controller.active_workers(), 0);
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_gives_up_after_timeout() {
        let controller = ShutdownController::with_timeout(Duration::from_secs(5));
        let _stuck = controller.track();

        assert!(!controller.shutdown().await);
        assert_eq!(controller.phase(), ShutdownPhase::Terminated);
        assert_eq!(controller.active_workers(), 1);
    }

    #[tokio::test]
    async fn test_double_shutdown_is_noop() {
        let controller = ShutdownController::new();
        let (first, second) = tokio::join!(controller.shutdown(), controller.shutdown());
        assert!(first && second);
        assert_eq!(controller.phase(), ShutdownPhase::Terminated);
    }
}
