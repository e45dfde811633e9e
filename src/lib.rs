//! Commerce backend process: application bootstrap, graceful shutdown,
//! the Outfit schema and the storefront API proxy.

pub mod app;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod models;
pub mod net;
pub mod observability;
pub mod storefront;

pub use config::ServerConfig;
pub use lifecycle::{ShutdownCoordinator, StartupError};
