//! Application loading.
//!
//! The backend's business behaviour (routing, persistence, admin) comes
//! from an external application framework. This module is the seam: a
//! loader receives the project directory and a route registration target
//! and returns a [`Container`] holding what it registered.

use std::future::Future;
use std::path::{Path, PathBuf};

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;

/// Failure while loading the application.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("project directory {} is not accessible: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("project path {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("application failed to initialize: {0}")]
    Init(String),
}

/// What a loader produced.
#[derive(Debug, Clone)]
pub struct Container {
    directory: PathBuf,
    modules: Vec<String>,
    router: Router,
}

impl Container {
    pub fn new(directory: impl Into<PathBuf>, router: Router) -> Self {
        Self {
            directory: directory.into(),
            modules: Vec::new(),
            router,
        }
    }

    /// Record a module the loader registered.
    pub fn with_module(mut self, name: impl Into<String>) -> Self {
        self.modules.push(name.into());
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Loads the application found at `directory` onto `app`.
pub trait ApplicationLoader {
    fn load(
        &self,
        directory: &Path,
        app: Router,
    ) -> impl Future<Output = Result<Container, LoaderError>> + Send;
}

/// Loader for a project on the local filesystem.
///
/// Requires the directory to exist and registers `GET /health`.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoader;

impl ApplicationLoader for DirectoryLoader {
    async fn load(&self, directory: &Path, app: Router) -> Result<Container, LoaderError> {
        let metadata = tokio::fs::metadata(directory)
            .await
            .map_err(|source| LoaderError::Directory {
                path: directory.to_path_buf(),
                source,
            })?;
        if !metadata.is_dir() {
            return Err(LoaderError::NotADirectory(directory.to_path_buf()));
        }

        let router = app.route("/health", get(health));
        tracing::info!(directory = %directory.display(), "Application loaded");

        Ok(Container::new(directory, router).with_module("health"))
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
