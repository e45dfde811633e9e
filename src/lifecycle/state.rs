//! Listener lifecycle state machine.
//!
//! # States
//! - Starting: bound, accept loop not yet running
//! - Accepting: new connections are served
//! - Draining: no new connections, in-flight ones finish
//! - Stopped: terminal
//!
//! # State Transitions
//! ```text
//! Starting → Accepting: bind succeeded
//! Starting → Stopped: startup aborted
//! Accepting → Draining: termination requested
//! Draining → Stopped: drain finished or deadline hit
//! ```

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle state of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Accepting,
    Draining,
    Stopped,
}

impl LifecycleState {
    /// Whether `self → next` is an edge of the state machine.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Starting, Accepting) | (Starting, Stopped) | (Accepting, Draining) | (Draining, Stopped)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Accepting => "accepting",
            LifecycleState::Draining => "draining",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared, observable lifecycle state.
///
/// Every transition is applied atomically through the watch channel, so
/// the accept loop and connection tasks see the same sequence of states.
#[derive(Debug, Clone)]
pub struct StateCell {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Starting);
        Self { tx: Arc::new(tx) }
    }

    /// Current state.
    pub fn get(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Move from `from` to `to`.
    ///
    /// Returns `true` only for the caller that performed the transition.
    /// Fails when the current state is not `from` or the edge is illegal.
    pub fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        if !from.can_transition_to(to) {
            return false;
        }
        let applied = self.tx.send_if_modified(|current| {
            if *current == from {
                *current = to;
                true
            } else {
                false
            }
        });
        if applied {
            tracing::debug!(from = %from, to = %to, "Lifecycle transition");
        }
        applied
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
