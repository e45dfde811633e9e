//! Turns termination signals into exactly one drain and one exit status.

use std::process::ExitCode;

use tokio::sync::mpsc;

use crate::lifecycle::shutdown::ShutdownCoordinator;
use crate::lifecycle::signals::TerminationSignal;

/// How the process should terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Success,
    Failure,
}

impl ProcessExit {
    pub fn code(self) -> u8 {
        match self {
            ProcessExit::Success => 0,
            ProcessExit::Failure => 1,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Wait for a termination signal, drain, and report the exit status.
///
/// A listener that stops accepting on its own also triggers the drain.
/// Signals arriving while the drain runs are logged and ignored.
pub async fn supervise(
    coordinator: &ShutdownCoordinator,
    signals: &mut mpsc::UnboundedReceiver<TerminationSignal>,
) -> ProcessExit {
    tokio::select! {
        biased;
        signal = signals.recv() => match signal {
            Some(signal) => tracing::info!(signal = %signal, "Gracefully shutting down..."),
            None => tracing::warn!("Signal channel closed, gracefully shutting down..."),
        },
        _ = coordinator.accepting_ended() => {
            tracing::error!(state = %coordinator.state(), "Listener stopped accepting, shutting down");
        }
    }

    let drain = coordinator.shutdown();
    tokio::pin!(drain);

    let result = loop {
        tokio::select! {
            result = &mut drain => break result,
            Some(signal) = signals.recv() => {
                if !coordinator.request_shutdown() {
                    tracing::debug!(signal = %signal, state = %coordinator.state(), "Already shutting down, ignoring signal");
                }
            }
        }
    };

    match result {
        Ok(report) => {
            tracing::info!(
                in_flight = report.in_flight_at_start,
                elapsed = ?report.elapsed,
                "Shutdown complete"
            );
            ProcessExit::Success
        }
        Err(e) => {
            tracing::error!(error = %e, "Shutdown failed");
            ProcessExit::Failure
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::net::SocketAddr;
    use std::time::Duration;

    use super::*;
    use crate::lifecycle::state::{LifecycleState, StateCell};
    use crate::net::connection::ConnectionTracker;
    use crate::net::listener::{ListenerError, ListenerHandle};

    fn coordinator_with_task<F>(state: StateCell, task: F) -> ShutdownCoordinator
    where
        F: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let handle = ListenerHandle::from_parts(addr, state, ConnectionTracker::new(), tokio::spawn(task));
        ShutdownCoordinator::new(handle, Duration::from_secs(1))
    }

    fn accepting() -> StateCell {
        let state = StateCell::new();
        state.transition(LifecycleState::Starting, LifecycleState::Accepting);
        state
    }

    #[tokio::test]
    async fn close_failure_exits_with_failure() {
        let coordinator = coordinator_with_task(accepting(), async { Err(ListenerError::LimiterClosed) });
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(TerminationSignal::Terminate).unwrap();

        let exit = supervise(&coordinator, &mut rx).await;

        assert_eq!(exit, ProcessExit::Failure);
        assert_eq!(exit.code(), 1);
        assert_eq!(coordinator.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn dead_listener_shuts_down_without_a_signal() {
        let state = accepting();
        let loop_state = state.clone();
        let coordinator = coordinator_with_task(state, async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            loop_state.transition(LifecycleState::Accepting, LifecycleState::Draining);
            Err(ListenerError::LimiterClosed)
        });
        // Sender stays alive: no signal will ever arrive.
        let (_tx, mut rx) = mpsc::unbounded_channel();

        let exit = tokio::time::timeout(Duration::from_secs(2), supervise(&coordinator, &mut rx))
            .await
            .expect("supervisor should notice the dead listener");

        assert_eq!(exit, ProcessExit::Failure);
        assert_eq!(coordinator.drains_started(), 1);
        assert_eq!(coordinator.state(), LifecycleState::Stopped);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Failure.code(), 1);
    }
}
