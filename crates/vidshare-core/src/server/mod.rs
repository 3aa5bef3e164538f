//! Single-file HTTP server.
//!
//! [`LocalFileServer`] exposes one file over HTTP with byte-range support so
//! receivers can stream and resume. Routes:
//!
//! - `GET /<route>` - the file (default route `video`), `200` or `206`
//! - `GET /info` - file name, size and request count
//! - `GET /status` - listener health and uptime
//!
//! ## State machine
//!
//! ```text
//! Stopped -> Starting -> Listening -> Stopped
//!               |
//!               +-> Failed -> Stopped
//! ```
//!
//! ## Port selection
//!
//! `start` tries the configured port and then successive ports, each bind
//! bounded by a timeout, and reports the port it actually bound.

mod error;
mod handlers;
mod range;
mod state;

pub use error::{ApiError, ApiResult};
pub use handlers::{InfoResponse, StatusResponse};
pub use range::{resolve as resolve_range, ByteRange, RangeRequest};
pub use state::{ServeProgress, ServedFile};

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::error::{Error, Result};
use crate::{DEFAULT_PORT_ATTEMPTS, DEFAULT_SERVER_PORT, DEFAULT_VIDEO_ROUTE};

use state::{AppState, SharedState};

/// How long `stop` waits for in-flight responses before aborting them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Capacity of the progress broadcast channel.
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle state of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    /// Not listening
    Stopped,
    /// Binding the listener
    Starting,
    /// Accepting requests
    Listening,
    /// The last start failed
    Failed,
}

/// Configuration for one server start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// First port to try (0 lets the OS choose)
    pub port: u16,
    /// Number of successive ports to try
    pub port_attempts: u16,
    /// Upper bound on each bind attempt
    pub bind_timeout: Duration,
    /// Interface to listen on
    pub bind_address: IpAddr,
    /// Host written into the advertised URL; detected when `None`
    pub advertise_host: Option<String>,
    /// File to serve
    pub file_path: PathBuf,
    /// Name reported to clients
    pub file_name: String,
    /// `Content-Type` of the file
    pub mime_type: String,
    /// Path segment the file is served under
    pub route: String,
}

impl ServerConfig {
    /// Configuration for serving `path` with defaults for everything else.
    ///
    /// The file name and MIME type are derived from the path.
    #[must_use]
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        let file_path = path.into();
        let file_name = file_path
            .file_name()
            .map_or_else(|| "video".to_string(), |n| n.to_string_lossy().into_owned());
        let mime_type = crate::file::mime_type_for(&file_path);

        Self {
            port: DEFAULT_SERVER_PORT,
            port_attempts: DEFAULT_PORT_ATTEMPTS,
            bind_timeout: Duration::from_secs(5),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            advertise_host: None,
            file_path,
            file_name,
            mime_type,
            route: DEFAULT_VIDEO_ROUTE.to_string(),
        }
    }

    /// Set the first port to try.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the host written into the advertised URL.
    #[must_use]
    pub fn with_advertise_host(mut self, host: impl Into<String>) -> Self {
        self.advertise_host = Some(host.into());
        self
    }

    /// Set the listen interface.
    #[must_use]
    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }
}

struct RunningServer {
    port: u16,
    url: String,
    started_at: Instant,
    requests: Arc<AtomicU64>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// Serves a single file over HTTP.
pub struct LocalFileServer {
    state: watch::Sender<ServerState>,
    running: Mutex<Option<RunningServer>>,
    progress: broadcast::Sender<ServeProgress>,
}

impl std::fmt::Debug for LocalFileServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileServer")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for LocalFileServer {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalFileServer {
    /// Create a stopped server.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(ServerState::Stopped);
        let (progress, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        Self {
            state,
            running: Mutex::new(None),
            progress,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Subscribe to per-response progress events.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<ServeProgress> {
        self.progress.subscribe()
    }

    /// Port currently bound, if listening.
    pub async fn port(&self) -> Option<u16> {
        self.running.lock().await.as_ref().map(|r| r.port)
    }

    /// Advertised URL of the file, if listening.
    pub async fn url(&self) -> Option<String> {
        self.running.lock().await.as_ref().map(|r| r.url.clone())
    }

    /// Shared counter of video requests for the current listener.
    ///
    /// The counter belongs to one start; a later start gets a fresh one.
    pub async fn request_counter(&self) -> Option<Arc<AtomicU64>> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|r| Arc::clone(&r.requests))
    }

    /// Time since the listener came up, if listening.
    pub async fn uptime(&self) -> Option<Duration> {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|r| r.started_at.elapsed())
    }

    /// Start serving and return the advertised URL of the file.
    ///
    /// A server that is already listening is stopped first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] if the file is missing,
    /// [`Error::PortInUse`] if every candidate port is taken,
    /// [`Error::Bind`] for other bind failures, or [`Error::Timeout`] if a
    /// bind attempt hangs.
    pub async fn start(&self, config: ServerConfig) -> Result<String> {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            tracing::info!(port = previous.port, "Restarting file server");
            shutdown(previous).await;
        }

        self.state.send_replace(ServerState::Starting);

        match self.launch(config).await {
            Ok(server) => {
                let url = server.url.clone();
                tracing::info!(port = server.port, url = %url, "File server listening");
                *running = Some(server);
                self.state.send_replace(ServerState::Listening);
                Ok(url)
            }
            Err(e) => {
                tracing::warn!(error = %e, "File server failed to start");
                self.state.send_replace(ServerState::Failed);
                Err(e)
            }
        }
    }

    /// Stop serving and release the port.
    ///
    /// Safe to call in any state.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if let Some(server) = running.take() {
            let port = server.port;
            shutdown(server).await;
            tracing::info!(port, "File server stopped");
        }
        self.state.send_replace(ServerState::Stopped);
    }

    async fn launch(&self, config: ServerConfig) -> Result<RunningServer> {
        match tokio::fs::metadata(&config.file_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(Error::FileNotFound(config.file_path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(config.file_path))
            }
            Err(e) => return Err(e.into()),
        }

        let listener = bind_with_retry(&config).await?;
        let port = listener.local_addr()?.port();

        let host = config
            .advertise_host
            .clone()
            .or_else(|| local_ip().map(|ip| ip.to_string()))
            .unwrap_or_else(|| Ipv4Addr::LOCALHOST.to_string());
        let route = config.route.trim_matches('/').to_string();
        let url = format!("http://{host}:{port}/{route}");

        let started_at = Instant::now();
        let requests = Arc::new(AtomicU64::new(0));
        let state: SharedState = Arc::new(AppState {
            file: ServedFile {
                path: config.file_path,
                name: config.file_name,
                mime_type: config.mime_type,
            },
            port,
            started_at,
            requests: Arc::clone(&requests),
            progress: self.progress.clone(),
        });

        let app = router(state, &route);
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(signal.cancelled_owned())
                .await;
            if let Err(e) = result {
                tracing::warn!(port, error = %e, "File server exited with error");
            }
        });

        Ok(RunningServer {
            port,
            url,
            started_at,
            requests,
            shutdown,
            task,
        })
    }
}

impl Drop for LocalFileServer {
    fn drop(&mut self) {
        if let Some(server) = self.running.get_mut().take() {
            server.shutdown.cancel();
            server.task.abort();
        }
    }
}

/// Build the router for one server instance.
fn router(state: SharedState, route: &str) -> Router {
    Router::new()
        .route(&format!("/{route}"), get(handlers::serve_video))
        .route("/info", get(handlers::info))
        .route("/status", get(handlers::status))
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown(server: RunningServer) {
    server.shutdown.cancel();
    let mut task = server.task;
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
        tracing::warn!(port = server.port, "In-flight responses did not finish; aborting");
        task.abort();
        let _ = task.await;
    }
}

/// Bind the first free port at or after `config.port`.
async fn bind_with_retry(config: &ServerConfig) -> Result<TcpListener> {
    let attempts = if config.port == 0 {
        1
    } else {
        config.port_attempts.max(1)
    };
    let mut last_port = config.port;

    for offset in 0..attempts {
        let Some(port) = config.port.checked_add(offset) else {
            break;
        };
        last_port = port;
        let addr = SocketAddr::new(config.bind_address, port);

        match tokio::time::timeout(config.bind_timeout, TcpListener::bind(addr)).await {
            Ok(Ok(listener)) => return Ok(listener),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port in use, trying next");
            }
            Ok(Err(e)) => {
                return Err(Error::Bind {
                    port,
                    reason: e.to_string(),
                })
            }
            Err(_) => return Err(Error::Timeout(config.bind_timeout)),
        }
    }

    Err(Error::PortInUse(last_port))
}

/// Best guess at this machine's LAN address.
///
/// Connecting a UDP socket sends nothing; it only asks the OS which local
/// address would route to the target.
pub fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}
