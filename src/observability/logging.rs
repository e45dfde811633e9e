//! Structured logging.
//!
//! Uses `tracing` with an `EnvFilter` read from `RUST_LOG`. Output goes to
//! stderr so startup failures reach the supervisor's error stream.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "outfit_backend=info,tower_http=info";

/// Initialize the global subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
