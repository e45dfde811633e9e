//! Storefront proxy binary.
//!
//! Serves the storefront's `/api/*` rewrite in front of the commerce
//! backend, with the same startup and graceful shutdown as the main server.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use outfit_backend::config::validation::{validate_config, ValidationError};
use outfit_backend::config::{ListenerConfig, ServerConfig, ShutdownConfig, StorefrontConfig};
use outfit_backend::lifecycle::{self, signals, Bootstrapper, ProcessExit, ShutdownCoordinator};
use outfit_backend::observability::logging;
use outfit_backend::storefront;

#[derive(Parser)]
#[command(name = "storefront-proxy")]
#[command(about = "Forwards storefront /api/* calls to the commerce backend", long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "STOREFRONT_PORT", default_value_t = 8000)]
    port: u16,

    /// Backend base URL API calls are rewritten to
    #[arg(short, long, env = "NEXT_PUBLIC_MEDUSA_BACKEND_URL", default_value = "http://localhost:9000")]
    backend_url: String,

    /// Path prefix that is rewritten
    #[arg(long, default_value = "/api")]
    api_prefix: String,

    /// Allowed image host (repeatable); defaults apply when omitted
    #[arg(long = "image-domain")]
    image_domains: Vec<String>,

    /// Upper bound on connection draining, in seconds
    #[arg(long, default_value_t = 30)]
    drain_timeout_secs: u64,
}

impl Cli {
    /// Build a validated config, checked the same way as the server's.
    fn into_config(self) -> Result<ServerConfig, Vec<ValidationError>> {
        let mut storefront = StorefrontConfig {
            backend_url: self.backend_url,
            api_prefix: self.api_prefix,
            ..StorefrontConfig::default()
        };
        if !self.image_domains.is_empty() {
            storefront.image_domains = self.image_domains;
        }

        let config = ServerConfig {
            listener: ListenerConfig {
                port: self.port,
                ..ListenerConfig::default()
            },
            shutdown: ShutdownConfig {
                drain_timeout_secs: self.drain_timeout_secs,
            },
            storefront,
            ..ServerConfig::default()
        };
        validate_config(&config)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(errors) => {
            for e in &errors {
                tracing::error!(field = e.field, "{}", e.message);
            }
            return ProcessExit::Failure.into();
        }
    };

    let app = match storefront::router(&config.storefront) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Invalid storefront configuration");
            return ProcessExit::Failure.into();
        }
    };

    let handle = match Bootstrapper::new(config.listener.clone()).start(app, |_| {}).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start storefront proxy");
            return ProcessExit::Failure.into();
        }
    };
    let coordinator = ShutdownCoordinator::new(handle, Duration::from_secs(config.shutdown.drain_timeout_secs));

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
