//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! OUTFIT_CONFIG (optional TOML file)
//!     → loader.rs (parse & deserialize)
//!     → env overrides (PORT, SHUTDOWN_TIMEOUT_SECS, NEXT_PUBLIC_MEDUSA_BACKEND_URL)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//! ```

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_env, ConfigError};
pub use schema::{
    ListenerConfig, ObservabilityConfig, ProjectConfig, ServerConfig, ShutdownConfig,
    StorefrontConfig,
};
