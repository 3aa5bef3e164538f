//! Common test utilities for VidShare integration tests.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{stream, StreamExt};
use tokio::task::JoinHandle;

use vidshare_core::config::Config;
use vidshare_core::device::HostIdentity;
use vidshare_core::hotspot::SimulatedTransport;
use vidshare_core::server::{LocalFileServer, ServerConfig};
use vidshare_core::session::ShareSessionManager;

/// Create a temporary directory for test files.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test file with the given content.
pub fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Generate random bytes for testing.
pub fn random_bytes(size: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Assert that two files have identical content.
pub fn assert_files_equal(path1: &Path, path2: &Path) {
    let content1 = std::fs::read(path1).expect("Failed to read first file");
    let content2 = std::fs::read(path2).expect("Failed to read second file");
    assert_eq!(content1.len(), content2.len(), "File sizes differ");
    assert!(content1 == content2, "File contents differ");
}

/// Configuration bound to loopback on an OS-assigned port, with no settle delay.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.port = 0;
    config.server.bind_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.server.host = Some("127.0.0.1".to_string());
    config.hotspot.settle_delay = Duration::ZERO;
    config.transfer.read_timeout = Duration::from_secs(10);
    config
}

/// Session manager over a simulated radio.
pub fn test_manager() -> (ShareSessionManager, Arc<SimulatedTransport>) {
    let transport = Arc::new(SimulatedTransport::new());
    let manager = ShareSessionManager::new(
        test_config(),
        transport.clone(),
        Arc::new(HostIdentity::detect()),
    );
    (manager, transport)
}

/// Serve `path` on loopback and return the server with its video URL.
pub async fn serve_file(path: &Path) -> (LocalFileServer, String) {
    let server = LocalFileServer::new();
    let url = server
        .start(
            ServerConfig::for_file(path)
                .with_port(0)
                .with_bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
                .with_advertise_host("127.0.0.1"),
        )
        .await
        .expect("Failed to start file server");
    (server, url)
}

/// A sender that answers `/video` with `prefix` and then never sends more,
/// while advertising `total` bytes.
pub async fn stalling_server(prefix: Vec<u8>, total: u64) -> (String, JoinHandle<()>) {
    let app = Router::new().route(
        "/video",
        get(move || {
            let prefix = Bytes::from(prefix.clone());
            async move {
                let body = stream::once(async move { Ok::<_, std::io::Error>(prefix) })
                    .chain(stream::pending());
                Response::builder()
                    .header(header::CONTENT_LENGTH, total)
                    .body(Body::from_stream(body))
                    .expect("valid response")
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .expect("Failed to bind stalling server");
    let addr = listener.local_addr().expect("local addr");
    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/video"), task)
}
