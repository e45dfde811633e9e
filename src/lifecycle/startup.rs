//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the application through its loader
//! - Bind the listener and begin accepting traffic
//! - Announce readiness exactly once
//! - Hand the listener to the shutdown coordinator
//!
//! Any startup error is fatal; nothing is retried.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use thiserror::Error;

use crate::app::{ApplicationLoader, LoaderError};
use crate::config::{ListenerConfig, ServerConfig};
use crate::http::build_router;
use crate::lifecycle::shutdown::ShutdownCoordinator;
use crate::net::listener::{ListenerError, ListenerHandle};

/// Failure before the process is ready to serve.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid port {0}: must be a positive integer")]
    InvalidPort(u16),

    #[error(transparent)]
    Bind(#[from] ListenerError),

    #[error("application loader failed: {0}")]
    Loader(#[from] LoaderError),
}

/// Binds listeners and hands them over in `Accepting` state.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    listener: ListenerConfig,
}

impl Bootstrapper {
    pub fn new(listener: ListenerConfig) -> Self {
        Self { listener }
    }

    /// Bind and start serving `app`.
    ///
    /// `on_ready` runs once, after the listener is accepting.
    pub async fn start<F>(&self, app: Router, on_ready: F) -> Result<ListenerHandle, StartupError>
    where
        F: FnOnce(SocketAddr),
    {
        if self.listener.port == 0 {
            return Err(StartupError::InvalidPort(self.listener.port));
        }

        let (listener, local_addr) = ListenerHandle::bind(&self.listener.bind_address()).await?;
        let app = build_router(app, Duration::from_secs(self.listener.request_timeout_secs));
        let handle = ListenerHandle::serve(listener, local_addr, app, self.listener.max_connections);

        tracing::info!(address = %local_addr, "Server is ready on port {}", local_addr.port());
        on_ready(local_addr);

        Ok(handle)
    }
}

/// Start serving `app` on `port` with default listener settings.
pub async fn start(port: u16, app: Router) -> Result<ListenerHandle, StartupError> {
    let listener = ListenerConfig {
        port,
        ..ListenerConfig::default()
    };
    Bootstrapper::new(listener).start(app, |_| {}).await
}

/// Load the application, start the listener and wrap it in a coordinator.
pub async fn boot<L>(config: &ServerConfig, loader: &L) -> Result<ShutdownCoordinator, StartupError>
where
    L: ApplicationLoader,
{
    let container = loader.load(&config.project.directory, Router::new()).await?;
    tracing::info!(
        directory = %container.directory().display(),
        modules = ?container.modules(),
        "Application container ready"
    );

    let handle = Bootstrapper::new(config.listener.clone())
        .start(container.into_router(), |_| {})
        .await?;

    Ok(ShutdownCoordinator::new(
        handle,
        Duration::from_secs(config.shutdown.drain_timeout_secs),
    ))
}
