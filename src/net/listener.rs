//! TCP listener with backpressure and lifecycle-aware accept loop.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections while `Accepting`
//! - Enforce max_connections limit via semaphore
//! - Serve each connection with hyper, reacting to `Draining` / `Stopped`

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tower::Service;

use crate::lifecycle::state::{LifecycleState, StateCell};
use crate::net::connection::{ConnectionGuard, ConnectionTracker};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// The connection limiter was closed under the accept loop.
    #[error("connection limiter closed")]
    LimiterClosed,
}

/// Pause after an accept error that is not about a single peer.
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Result of the accept loop task.
pub(crate) type AcceptTask = JoinHandle<Result<(), ListenerError>>;

/// The bound network listener.
///
/// Holds the lifecycle state, the in-flight connection set and the accept
/// loop. Exactly one owner drives it from `Accepting` to `Stopped`.
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    state: StateCell,
    tracker: ConnectionTracker,
    accept_task: Mutex<Option<AcceptTask>>,
}

impl ListenerHandle {
    /// Bind to `addr` without serving yet. State is `Starting`.
    pub async fn bind(addr: &str) -> Result<(TcpListener, SocketAddr), ListenerError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| ListenerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok((listener, local_addr))
    }

    /// Move to `Accepting` and spawn the accept loop serving `app`.
    pub fn serve(listener: TcpListener, local_addr: SocketAddr, app: Router, max_connections: usize) -> Self {
        let state = StateCell::new();
        let tracker = ConnectionTracker::new();

        // Must precede the spawn: the loop exits on any state other than Accepting.
        state.transition(LifecycleState::Starting, LifecycleState::Accepting);

        let task = tokio::spawn(accept_loop(
            listener,
            app,
            state.clone(),
            tracker.clone(),
            Arc::new(Semaphore::new(max_connections)),
        ));

        tracing::info!(
            address = %local_addr,
            max_connections,
            "Listener accepting"
        );

        Self::from_parts(local_addr, state, tracker, task)
    }

    pub(crate) fn from_parts(
        local_addr: SocketAddr,
        state: StateCell,
        tracker: ConnectionTracker,
        task: AcceptTask,
    ) -> Self {
        Self {
            local_addr,
            state,
            tracker,
            accept_task: Mutex::new(Some(task)),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// `Accepting → Draining`. True only for the call that made the move.
    pub(crate) fn begin_drain(&self) -> bool {
        self.state
            .transition(LifecycleState::Accepting, LifecycleState::Draining)
    }

    /// `Draining → Stopped`. Connections still open are dropped.
    pub(crate) fn finish(&self) -> bool {
        self.state
            .transition(LifecycleState::Draining, LifecycleState::Stopped)
    }

    /// Wait for the accept loop to release the socket.
    ///
    /// Errors when the loop already died, or when the listener was closed
    /// before (the task is taken on first call).
    pub(crate) async fn close(&self) -> Result<(), String> {
        let task = self
            .accept_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        match task {
            Some(task) => match task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(join) => Err(format!("accept loop terminated abnormally: {}", join)),
            },
            None => Err("listener already closed".to_string()),
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    app: Router,
    state: StateCell,
    tracker: ConnectionTracker,
    limit: Arc<Semaphore>,
) -> Result<(), ListenerError> {
    let mut state_rx = state.subscribe();

    loop {
        // Drain check is polled first so a pending connection never wins
        // over a shutdown that already started.
        let accepted = tokio::select! {
            biased;
            _ = state_rx.wait_for(|s| *s != LifecycleState::Accepting) => break,
            res = accept_with_permit(&listener, &limit) => res,
        };

        let (stream, peer, permit) = match accepted {
            Ok(conn) => conn,
            Err(AcceptError::Io(e)) if is_connection_error(&e) => {
                tracing::debug!(error = %e, "Transient accept error");
                continue;
            }
            Err(AcceptError::Io(e)) => {
                // EMFILE/ENFILE and friends: the socket is still good, wait
                // for descriptors to free up.
                tracing::error!(error = %e, backoff = ?ACCEPT_BACKOFF, "Accept failed, backing off");
                if !backoff(&mut state_rx).await {
                    break;
                }
                continue;
            }
            Err(AcceptError::LimiterClosed) => {
                tracing::error!("Connection limiter closed, listener stopping");
                // Leave `Accepting` so the supervisor sees the listener is gone.
                state.transition(LifecycleState::Accepting, LifecycleState::Draining);
                return Err(ListenerError::LimiterClosed);
            }
        };

        if state.get() != LifecycleState::Accepting {
            tracing::debug!(peer_addr = %peer, "Rejecting connection during drain");
            break;
        }

        let guard = tracker.track();
        tracing::debug!(
            peer_addr = %peer,
            connection_id = %guard.id(),
            available_permits = limit.available_permits(),
            "Connection accepted"
        );
        tokio::spawn(serve_connection(stream, app.clone(), guard, permit, state.subscribe()));
    }

    tracing::info!(address = ?listener.local_addr().ok(), "Listener closed");
    Ok(())
}

enum AcceptError {
    Io(std::io::Error),
    LimiterClosed,
}

async fn accept_with_permit(
    listener: &TcpListener,
    limit: &Arc<Semaphore>,
) -> Result<(TcpStream, SocketAddr, OwnedSemaphorePermit), AcceptError> {
    // Acquire permit first (backpressure)
    let permit = limit
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| AcceptError::LimiterClosed)?;
    let (stream, peer) = listener.accept().await.map_err(AcceptError::Io)?;
    Ok((stream, peer, permit))
}

/// Errors tied to a single peer. The next accept is unaffected.
fn is_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted
    )
}

/// Sleep before retrying accept. Returns `false` if the state left
/// `Accepting` meanwhile.
async fn backoff(state_rx: &mut watch::Receiver<LifecycleState>) -> bool {
    tokio::select! {
        _ = state_rx.wait_for(|s| *s != LifecycleState::Accepting) => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}

async fn serve_connection(
    stream: TcpStream,
    app: Router,
    guard: ConnectionGuard,
    _permit: OwnedSemaphorePermit,
    mut state_rx: watch::Receiver<LifecycleState>,
) {
    let id = guard.id();
    let service = hyper::service::service_fn(move |request: Request<Incoming>| app.clone().call(request));
    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let mut draining = false;
    let mut detached = false;

    if *state_rx.borrow_and_update() == LifecycleState::Draining {
        draining = true;
        conn.as_mut().graceful_shutdown();
    }

    loop {
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(e) = res {
                    tracing::debug!(connection_id = %id, error = %e, "Connection error");
                }
                break;
            }
            changed = state_rx.changed(), if !detached => {
                if changed.is_err() {
                    detached = true;
                    continue;
                }
                let current = *state_rx.borrow_and_update();
                match current {
                    LifecycleState::Draining if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                    LifecycleState::Stopped => {
                        tracing::warn!(connection_id = %id, "Drain deadline reached, closing connection");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    drop(guard);
}
