//! Commerce backend (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   PORT / OUTFIT_CONFIG
//!          │
//!          ▼
//!   ┌─────────────┐    ┌──────────────┐    ┌─────────────────┐
//!   │   config    │───▶│ app loader   │───▶│  bootstrapper   │── "ready"
//!   └─────────────┘    │ (container)  │    │ bind + accept   │
//!                      └──────────────┘    └────────┬────────┘
//!                                                   │ ListenerHandle
//!                                                   ▼
//!   SIGTERM/SIGINT ──▶ signals ──▶ supervisor ──▶ shutdown coordinator
//!                                                   │
//!                                  Accepting → Draining → Stopped
//!                                                   │
//!                                                   ▼
//!                                            exit 0 / exit 1
//! ```

use std::process::ExitCode;

use outfit_backend::app::DirectoryLoader;
use outfit_backend::config;
use outfit_backend::lifecycle::{self, signals, ProcessExit};
use outfit_backend::observability::{logging, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    tracing::info!("outfit-backend v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match config::load_from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ProcessExit::Failure.into();
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        max_connections = config.listener.max_connections,
        drain_timeout_secs = config.shutdown.drain_timeout_secs,
        project = %config.project.directory.display(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated on load.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let coordinator = match lifecycle::boot(&config, &DirectoryLoader).await {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start server");
            return ProcessExit::Failure.into();
        }
    };

    let mut signals = match signals::register() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register signal handlers");
            let _ = coordinator.shutdown().await;
            return ProcessExit::Failure.into();
        }
    };

    lifecycle::supervise(&coordinator, &mut signals).await.into()
}
