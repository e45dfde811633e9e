//! HTTP middleware stack.
//!
//! Wraps the application routes in the layers every listener serves with:
//! request ids, tracing and a request timeout.

use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::http::request::{propagate_request_id_layer, set_request_id_layer};

/// Build the served router from application routes.
pub fn build_router(routes: Router, request_timeout: Duration) -> Router {
    routes
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}
