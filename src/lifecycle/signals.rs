//! OS signal handling.
//!
//! One forwarding task per termination signal (SIGTERM, SIGINT), all
//! feeding a single channel so delivery order is preserved. Signals are
//! only turned into events here; what they do is decided by
//! [`supervise`](crate::lifecycle::supervisor::supervise).

use std::fmt;

use tokio::sync::mpsc;

/// A request from outside the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Terminate,
    Interrupt,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
        }
    }
}

/// Install the termination signal handlers.
#[cfg(unix)]
pub fn register() -> std::io::Result<mpsc::UnboundedReceiver<TerminationSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let (tx, rx) = mpsc::unbounded_channel();

    for (kind, event) in [
        (SignalKind::terminate(), TerminationSignal::Terminate),
        (SignalKind::interrupt(), TerminationSignal::Interrupt),
    ] {
        let mut stream = signal(kind)?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                if tx.send(event).is_err() {
                    break;
                }
            }
        });
    }

    tracing::debug!("Termination signal handlers registered");
    Ok(rx)
}

/// Install the termination signal handlers.
#[cfg(not(unix))]
pub fn register() -> std::io::Result<mpsc::UnboundedReceiver<TerminationSignal>> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(TerminationSignal::Interrupt).is_err() {
                break;
            }
        }
    });

    tracing::debug!("Termination signal handlers registered");
    Ok(rx)
}
