//! Startup and graceful shutdown against real sockets.

use std::net::TcpListener as StdTcpListener;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use outfit_backend::app::{ApplicationLoader, Container, LoaderError};
use outfit_backend::config::{ListenerConfig, ServerConfig};
use outfit_backend::lifecycle::{
    self, Bootstrapper, LifecycleState, ProcessExit, ShutdownCoordinator, ShutdownError,
    StartupError, TerminationSignal,
};
use tokio::sync::mpsc;

mod common;

async fn coordinator_with_timeout(drain_timeout: Duration) -> ShutdownCoordinator {
    let handle = lifecycle::start(common::free_port(), common::test_app())
        .await
        .expect("start");
    ShutdownCoordinator::new(handle, drain_timeout)
}

#[tokio::test]
async fn start_announces_ready_exactly_once() {
    let ready = Arc::new(AtomicUsize::new(0));
    let seen = ready.clone();

    let config = ListenerConfig {
        port: common::free_port(),
        ..ListenerConfig::default()
    };
    let handle = Bootstrapper::new(config)
        .start(common::test_app(), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    assert_eq!(ready.load(Ordering::SeqCst), 1);
    assert_eq!(handle.state(), LifecycleState::Accepting);

    let body = common::client()
        .get(common::url(handle.local_addr(), "/ping"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "pong");

    ShutdownCoordinator::new(handle, Duration::from_secs(1))
        .shutdown()
        .await
        .unwrap();
    assert_eq!(ready.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn occupied_port_is_a_startup_error() {
    let port = common::free_port();
    let _occupied = StdTcpListener::bind(("0.0.0.0", port)).unwrap();

    let err = lifecycle::start(port, Router::new()).await.unwrap_err();
    assert!(matches!(err, StartupError::Bind(_)), "got {err:?}");
}

#[tokio::test]
async fn port_zero_is_rejected() {
    let err = lifecycle::start(0, Router::new()).await.unwrap_err();
    assert!(matches!(err, StartupError::InvalidPort(0)));
}

#[tokio::test]
async fn in_flight_request_completes_during_drain() {
    let coordinator = coordinator_with_timeout(Duration::from_secs(5)).await;
    let url = common::url(coordinator.local_addr(), "/slow");

    let request = tokio::spawn(async move { common::client().get(url).send().await?.text().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(coordinator.active_connections(), 1);

    let drain = coordinator.shutdown();
    assert_eq!(coordinator.state(), LifecycleState::Draining);

    let report = drain.await.unwrap();
    assert_eq!(report.in_flight_at_start, 1);
    assert_eq!(coordinator.state(), LifecycleState::Stopped);

    assert_eq!(request.await.unwrap().unwrap(), "done");
}

#[tokio::test]
async fn new_connections_are_refused_once_draining() {
    let coordinator = coordinator_with_timeout(Duration::from_secs(5)).await;
    let addr = coordinator.local_addr();

    let drain = coordinator.shutdown();
    let late = tokio::spawn(async move { common::client().get(common::url(addr, "/ping")).send().await });

    drain.await.unwrap();
    assert!(late.await.unwrap().is_err(), "late request must not be served");
    assert!(common::client().get(common::url(addr, "/ping")).send().await.is_err());
}

#[tokio::test]
async fn repeated_signals_drain_and_exit_once() {
    let coordinator = coordinator_with_timeout(Duration::from_secs(5)).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    tx.send(TerminationSignal::Terminate).unwrap();
    tx.send(TerminationSignal::Interrupt).unwrap();

    let exit = lifecycle::supervise(&coordinator, &mut rx).await;

    assert_eq!(exit, ProcessExit::Success);
    assert_eq!(exit.code(), 0);
    assert_eq!(coordinator.drains_started(), 1);
    assert_eq!(coordinator.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn signals_during_drain_are_ignored() {
    let coordinator = coordinator_with_timeout(Duration::from_secs(5)).await;
    let url = common::url(coordinator.local_addr(), "/slow");
    let request = tokio::spawn(async move { common::client().get(url).send().await?.text().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    tx.send(TerminationSignal::Terminate).unwrap();
    let sender = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(TerminationSignal::Terminate).unwrap();
        tx.send(TerminationSignal::Interrupt).unwrap();
    });

    let exit = lifecycle::supervise(&coordinator, &mut rx).await;
    sender.await.unwrap();

    assert_eq!(exit, ProcessExit::Success);
    assert_eq!(coordinator.drains_started(), 1);
    assert_eq!(request.await.unwrap().unwrap(), "done");
}

#[tokio::test]
async fn stuck_connection_hits_drain_timeout_and_fails() {
    let coordinator = coordinator_with_timeout(Duration::from_millis(200)).await;
    let url = common::url(coordinator.local_addr(), "/hang");
    let request = tokio::spawn(async move { common::client().get(url).send().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = coordinator.shutdown().await.unwrap_err();
    assert!(matches!(err, ShutdownError::DrainTimeout { remaining: 1, .. }));
    assert_eq!(coordinator.state(), LifecycleState::Stopped);

    let (tx, mut rx) = mpsc::unbounded_channel();
    tx.send(TerminationSignal::Terminate).unwrap();
    assert_eq!(lifecycle::supervise(&coordinator, &mut rx).await, ProcessExit::Failure);

    // The forced close reaches the client instead of a response.
    assert!(request.await.unwrap().is_err());
}

struct FailingLoader;

impl ApplicationLoader for FailingLoader {
    async fn load(&self, _directory: &Path, _app: Router) -> Result<Container, LoaderError> {
        Err(LoaderError::Init("database unreachable".to_string()))
    }
}

#[tokio::test]
async fn loader_failure_aborts_boot() {
    let mut config = ServerConfig::default();
    config.listener.port = common::free_port();

    let err = lifecycle::boot(&config, &FailingLoader).await.unwrap_err();
    assert!(matches!(err, StartupError::Loader(LoaderError::Init(_))));

    // Nothing was bound.
    assert!(StdTcpListener::bind(("0.0.0.0", config.listener.port)).is_ok());
}

#[tokio::test]
async fn boot_serves_loader_routes() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServerConfig::default();
    config.listener.port = common::free_port();
    config.project.directory = dir.path().to_path_buf();

    let coordinator = lifecycle::boot(&config, &outfit_backend::app::DirectoryLoader)
        .await
        .unwrap();

    let response = common::client()
        .get(common::url(coordinator.local_addr(), "/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));

    coordinator.shutdown().await.unwrap();
}
