//! Storefront API proxy.
//!
//! Forwards requests matching the rewrite rule to the backend and exposes
//! the proxy's own configuration at `/_storefront/config`.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::StorefrontConfig;
use crate::http::RequestIdExt;
use crate::storefront::images::ImagePolicy;
use crate::storefront::rewrite::RewriteRule;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid backend url: {0}")]
    BackendUrl(#[from] url::ParseError),

    #[error("unsupported backend scheme '{0}', only http is proxied")]
    UnsupportedScheme(String),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct ProxyState {
    pub rule: Arc<RewriteRule>,
    pub images: Arc<ImagePolicy>,
    pub client: Client<HttpConnector, Body>,
}

impl ProxyState {
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, ProxyError> {
        let rule = RewriteRule::new(&config.api_prefix, &config.backend_url)?;
        if rule.destination().scheme() != "http" {
            return Err(ProxyError::UnsupportedScheme(rule.destination().scheme().to_string()));
        }

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            rule: Arc::new(rule),
            images: Arc::new(ImagePolicy::new(&config.image_domains)),
            client,
        })
    }
}

/// Routes for the storefront proxy.
pub fn router(config: &StorefrontConfig) -> Result<Router, ProxyError> {
    let state = ProxyState::from_config(config)?;
    Ok(Router::new()
        .route("/_storefront/config", get(describe))
        .fallback(forward)
        .with_state(state))
}

async fn describe(State(state): State<ProxyState>) -> Json<Value> {
    Json(json!({
        "rewrites": [state.rule.describe()],
        "images": { "domains": state.images.domains().collect::<Vec<_>>() },
    }))
}

async fn forward(State(state): State<ProxyState>, request: Request<Body>) -> Response {
    let request_id = request.request_id().unwrap_or("unknown").to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let Some(target) = state.rule.rewrite(&path_and_query) else {
        tracing::debug!(request_id = %request_id, path = %path_and_query, "No rewrite matched");
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    let uri: Uri = match target.as_str().parse() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, target = %target, error = %e, "Rewritten URI rejected");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream URI").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        from = %path_and_query,
        to = %uri,
        "Proxying request"
    );

    let (mut parts, body) = request.into_parts();
    parts.uri = uri;
    parts.version = Version::HTTP_11;
    // Host is re-derived from the upstream URI by the client.
    parts.headers.remove(header::HOST);

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => response.map(Body::new).into_response(),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
