//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Env var naming an optional TOML config file.
pub const CONFIG_PATH_VAR: &str = "OUTFIT_CONFIG";
/// Env var overriding `listener.port`.
pub const PORT_VAR: &str = "PORT";
/// Env var overriding `shutdown.drain_timeout_secs`.
pub const DRAIN_TIMEOUT_VAR: &str = "SHUTDOWN_TIMEOUT_SECS";
/// Env var overriding `storefront.backend_url`.
pub const BACKEND_URL_VAR: &str = "NEXT_PUBLIC_MEDUSA_BACKEND_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML config file. Validation happens after env overrides.
fn read_file(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration for the process: optional file, then env overrides,
/// then validation.
pub fn load_from_env() -> Result<ServerConfig, ConfigError> {
    load_with(|var| std::env::var(var).ok())
}

/// Same as [`load_from_env`] with an injectable variable lookup.
pub fn load_with<F>(lookup: F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup(CONFIG_PATH_VAR) {
        Some(path) => read_file(Path::new(&path))?,
        None => ServerConfig::default(),
    };

    apply_env_overrides(&mut config, &lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides on top of a parsed config.
pub fn apply_env_overrides<F>(config: &mut ServerConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(PORT_VAR) {
        config.listener.port = value.trim().parse().map_err(|_| ConfigError::Env {
            var: PORT_VAR,
            value: value.clone(),
        })?;
    }
    if let Some(value) = lookup(DRAIN_TIMEOUT_VAR) {
        config.shutdown.drain_timeout_secs = value.trim().parse().map_err(|_| ConfigError::Env {
            var: DRAIN_TIMEOUT_VAR,
            value: value.clone(),
        })?;
    }
    if let Some(value) = lookup(BACKEND_URL_VAR) {
        config.storefront.backend_url = value;
    }
    Ok(())
}
