//! Shared utilities for integration tests.

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::time::Duration;

use axum::routing::get;
use axum::Router;

/// Reserve an unused port and release it.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    let listener = StdTcpListener::bind("0.0.0.0:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Routes used by lifecycle tests.
#[allow(dead_code)]
pub fn test_app() -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(400)).await;
                "done"
            }),
        )
        .route(
            "/hang",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(20)).await;
                "too late"
            }),
        )
}

/// HTTP client with a fresh connection pool.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[allow(dead_code)]
pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", addr.port(), path)
}
