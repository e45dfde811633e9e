//! Shutdown coordination.
//!
//! The coordinator owns the [`ListenerHandle`] once startup hands it over
//! and is the only thing that moves it from `Accepting` to `Stopped`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::lifecycle::state::LifecycleState;
use crate::net::listener::ListenerHandle;
use crate::observability::metrics;

/// Failure while stopping the listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShutdownError {
    #[error("failed to close listener: {0}")]
    Close(String),

    #[error("{remaining} connection(s) still open after {timeout:?} drain timeout")]
    DrainTimeout { remaining: u64, timeout: Duration },
}

/// Summary of a completed drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Connections in flight when the drain began.
    pub in_flight_at_start: u64,
    pub elapsed: Duration,
}

/// Drives a listener through `Accepting → Draining → Stopped` exactly once.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    handle: ListenerHandle,
    drain_timeout: Duration,
    outcome: OnceCell<Result<DrainReport, ShutdownError>>,
    drains: AtomicUsize,
}

impl ShutdownCoordinator {
    /// Take ownership of an accepting listener.
    pub fn new(handle: ListenerHandle, drain_timeout: Duration) -> Self {
        Self {
            handle,
            drain_timeout,
            outcome: OnceCell::new(),
            drains: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.handle.state()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    pub fn active_connections(&self) -> u64 {
        self.handle.active_connections()
    }

    /// Number of drain sequences actually run. Never exceeds one.
    pub fn drains_started(&self) -> usize {
        self.drains.load(Ordering::SeqCst)
    }

    /// Resolves once the listener leaves `Accepting`, whoever moved it.
    pub async fn accepting_ended(&self) {
        let mut state_rx = self.handle.subscribe_state();
        let _ = state_rx
            .wait_for(|s| *s != LifecycleState::Accepting)
            .await;
    }

    /// Request a drain without awaiting it.
    ///
    /// Returns `true` if this call started the drain, `false` if one was
    /// already underway or finished.
    pub fn request_shutdown(&self) -> bool {
        self.handle.begin_drain()
    }

    /// Stop accepting and drain in-flight connections.
    ///
    /// The move to `Draining` happens when this is called, before the
    /// returned future is polled. Every caller awaits the same drain.
    pub fn shutdown(&self) -> impl Future<Output = Result<DrainReport, ShutdownError>> + '_ {
        if !self.request_shutdown() {
            tracing::debug!(state = %self.state(), "Shutdown already in progress");
        }
        async move { self.outcome.get_or_init(|| self.drain()).await.clone() }
    }

    async fn drain(&self) -> Result<DrainReport, ShutdownError> {
        self.drains.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();
        let in_flight_at_start = self.handle.active_connections();

        tracing::info!(
            in_flight = in_flight_at_start,
            timeout = ?self.drain_timeout,
            "Draining connections"
        );

        let closed = self.handle.close().await;
        if let Err(e) = &closed {
            tracing::error!(error = %e, "Listener close failed");
        }

        let drained = tokio::time::timeout(self.drain_timeout, self.handle.tracker().wait_idle()).await;
        let remaining = self.handle.active_connections();

        self.handle.finish();
        let elapsed = started.elapsed();

        let result = match (closed, drained) {
            (Err(e), _) => Err(ShutdownError::Close(e)),
            (Ok(()), Err(_)) => Err(ShutdownError::DrainTimeout {
                remaining,
                timeout: self.drain_timeout,
            }),
            (Ok(()), Ok(())) => Ok(DrainReport {
                in_flight_at_start,
                elapsed,
            }),
        };

        match &result {
            Ok(_) => {
                metrics::record_shutdown("clean", elapsed);
                tracing::info!(elapsed = ?elapsed, "Drain complete");
            }
            Err(e) => {
                metrics::record_shutdown("failed", elapsed);
                tracing::error!(error = %e, elapsed = ?elapsed, "Drain failed");
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::state::StateCell;
    use crate::net::connection::ConnectionTracker;
    use crate::net::listener::ListenerError;

    fn handle_with_task<F>(task: F) -> (ListenerHandle, ConnectionTracker)
    where
        F: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        let state = StateCell::new();
        state.transition(LifecycleState::Starting, LifecycleState::Accepting);
        let tracker = ConnectionTracker::new();
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let handle = ListenerHandle::from_parts(addr, state, tracker.clone(), tokio::spawn(task));
        (handle, tracker)
    }

    #[tokio::test]
    async fn shutdown_marks_draining_before_polling() {
        let (handle, _) = handle_with_task(async { Ok(()) });
        let coordinator = ShutdownCoordinator::new(handle, Duration::from_secs(1));

        let pending = coordinator.shutdown();
        assert_eq!(coordinator.state(), LifecycleState::Draining);

        pending.await.unwrap();
        assert_eq!(coordinator.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn concurrent_shutdowns_share_one_drain() {
        let (handle, _) = handle_with_task(async { Ok(()) });
        let coordinator = ShutdownCoordinator::new(handle, Duration::from_secs(1));

        let (a, b) = tokio::join!(coordinator.shutdown(), coordinator.shutdown());
        assert_eq!(a, b);
        assert_eq!(coordinator.drains_started(), 1);

        // After completion, a late call sees the cached outcome.
        assert_eq!(coordinator.shutdown().await, a);
        assert_eq!(coordinator.drains_started(), 1);
    }

    #[tokio::test]
    async fn close_failure_is_returned_not_panicked() {
        let (handle, _) = handle_with_task(async { Err(ListenerError::LimiterClosed) });
        let coordinator = ShutdownCoordinator::new(handle, Duration::from_secs(1));

        let err = coordinator.shutdown().await.unwrap_err();
        assert!(matches!(err, ShutdownError::Close(ref msg) if msg.contains("limiter closed")));
        assert_eq!(coordinator.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn panicked_accept_loop_is_a_close_failure() {
        let (handle, _) = handle_with_task(async {
            if true {
                panic!("accept loop exploded");
            }
            Ok(())
        });
        let coordinator = ShutdownCoordinator::new(handle, Duration::from_secs(1));

        let err = coordinator.shutdown().await.unwrap_err();
        assert!(matches!(err, ShutdownError::Close(_)));
    }

    #[tokio::test]
    async fn waits_for_in_flight_connections() {
        let (handle, tracker) = handle_with_task(async { Ok(()) });
        let coordinator = ShutdownCoordinator::new(handle, Duration::from_secs(5));

        let guard = tracker.track();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            drop(guard);
        });

        let report = coordinator.shutdown().await.unwrap();
        assert_eq!(report.in_flight_at_start, 1);
        assert!(report.elapsed >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn drain_timeout_forces_stop() {
        let (handle, tracker) = handle_with_task(async { Ok(()) });
        let coordinator = ShutdownCoordinator::new(handle, Duration::from_millis(100));

        let _stuck = tracker.track();
        let err = coordinator.shutdown().await.unwrap_err();
        assert_eq!(
            err,
            ShutdownError::DrainTimeout {
                remaining: 1,
                timeout: Duration::from_millis(100)
            }
        );
        assert_eq!(coordinator.state(), LifecycleState::Stopped);
    }
}
