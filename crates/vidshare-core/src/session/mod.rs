//! Outbound share sessions.
//!
//! A [`ShareSessionManager`] owns the device's file server and hotspot and
//! runs at most one share at a time. Starting a share while another is
//! active fully tears the old one down (port released, hotspot stopped)
//! before anything new is acquired.
//!
//! ## Start sequence
//!
//! 1. Stop the previous session, if any
//! 2. Hash the file (when enabled) and start the file server
//! 3. For offline shares, bring up a hotspot; on failure the server is stopped
//! 4. Build the session and its descriptor
//!
//! Any failure is reported as [`Error::SharingStart`] wrapping the cause,
//! with nothing left running.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::checksum::ChecksumVerifier;
use crate::config::Config;
use crate::descriptor::{self, SenderDevice, ShareDescriptor, VideoDescriptor};
use crate::device::DeviceIdentity;
use crate::error::{Error, Result};
use crate::hotspot::{HotspotController, HotspotCredentials, HotspotStatus, NearbyTransport};
use crate::server::{LocalFileServer, ServeProgress, ServerConfig};

/// What to share.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    /// File to serve
    pub file_path: PathBuf,
    /// Title shown to the receiver
    pub title: String,
    /// Expected size; the size on disk is authoritative
    pub size_bytes: Option<u64>,
    /// Host an access point for receivers without a shared network
    pub offline_mode: bool,
    /// Optional thumbnail location
    pub thumbnail_url: Option<String>,
}

impl ShareRequest {
    /// Share `file_path` under `title` over the current network.
    pub fn new(file_path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            title: title.into(),
            size_bytes: None,
            offline_mode: false,
            thumbnail_url: None,
        }
    }

    /// Request (or not) an access point.
    #[must_use]
    pub fn offline(mut self, offline_mode: bool) -> Self {
        self.offline_mode = offline_mode;
        self
    }

    /// Record the size the caller expects.
    #[must_use]
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Attach a thumbnail location.
    #[must_use]
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// Server-side state of one share.
#[derive(Debug, Clone)]
pub struct ShareSession {
    video: VideoDescriptor,
    server_url: String,
    server_port: u16,
    sender: SenderDevice,
    hotspot: Option<HotspotCredentials>,
    started_at_epoch_ms: u64,
    requests: Arc<AtomicU64>,
    active: Arc<AtomicBool>,
}

impl ShareSession {
    /// Assemble a session around a running endpoint.
    ///
    /// The session id is the video's id.
    pub fn new(
        video: VideoDescriptor,
        server_url: impl Into<String>,
        server_port: u16,
        sender: SenderDevice,
        hotspot: Option<HotspotCredentials>,
    ) -> Self {
        Self {
            video,
            server_url: server_url.into(),
            server_port,
            sender,
            hotspot,
            started_at_epoch_ms: epoch_ms(),
            requests: Arc::new(AtomicU64::new(0)),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    fn with_request_counter(mut self, requests: Arc<AtomicU64>) -> Self {
        self.requests = requests;
        self
    }

    /// Session identifier.
    pub fn session_id(&self) -> &str {
        &self.video.id
    }

    /// The shared video.
    pub const fn video(&self) -> &VideoDescriptor {
        &self.video
    }

    /// Advertised URL of the video.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Bound port.
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }

    /// Sending device.
    pub const fn sender(&self) -> &SenderDevice {
        &self.sender
    }

    /// Access point credentials, for offline shares.
    pub const fn hotspot(&self) -> Option<&HotspotCredentials> {
        self.hotspot.as_ref()
    }

    /// Start time in milliseconds since the UNIX epoch.
    pub const fn started_at_epoch_ms(&self) -> u64 {
        self.started_at_epoch_ms
    }

    /// Video requests served so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Whether the session is still the live one.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// A started share: the session and what to show receivers.
#[derive(Debug, Clone)]
pub struct SharedSession {
    /// Server-side state
    pub session: ShareSession,
    /// QR payload
    pub descriptor: ShareDescriptor,
}

/// Read-only snapshot of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Whether a share is active
    pub is_active: bool,
    /// Video requests served by the active share
    pub request_count: u64,
    /// Time since the active share started
    #[serde(rename = "uptimeMs", serialize_with = "as_millis")]
    pub uptime: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Whether offline sharing can work on this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfflineSupport {
    /// Hotspots can be hosted
    pub supported: bool,
    /// Why not, when unsupported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

struct ActiveShare {
    shared: SharedSession,
    started: Instant,
}

/// Runs at most one outbound share.
pub struct ShareSessionManager {
    config: Config,
    server: LocalFileServer,
    hotspot: HotspotController,
    identity: Arc<dyn DeviceIdentity>,
    checksum: ChecksumVerifier,
    active: Mutex<Option<ActiveShare>>,
}

impl std::fmt::Debug for ShareSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareSessionManager")
            .field("server", &self.server)
            .field("hotspot", &self.hotspot)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl ShareSessionManager {
    /// Create a manager with its own server and hotspot controller.
    pub fn new(
        config: Config,
        transport: Arc<dyn NearbyTransport>,
        identity: Arc<dyn DeviceIdentity>,
    ) -> Self {
        let hotspot = HotspotController::new(transport, config.hotspot.create_timeout);
        let checksum = ChecksumVerifier::new(config.transfer.checksum_policy);
        Self {
            config,
            server: LocalFileServer::new(),
            hotspot,
            identity,
            checksum,
            active: Mutex::new(None),
        }
    }

    /// The file server owned by this manager.
    pub const fn server(&self) -> &LocalFileServer {
        &self.server
    }

    /// The hotspot controller owned by this manager.
    pub const fn hotspot(&self) -> &HotspotController {
        &self.hotspot
    }

    /// Whether offline sharing is available.
    pub fn offline_support(&self) -> OfflineSupport {
        if self.hotspot.is_supported() {
            OfflineSupport {
                supported: true,
                reason: None,
            }
        } else {
            OfflineSupport {
                supported: false,
                reason: Some(format!(
                    "the {} transport cannot host an access point on {}",
                    self.hotspot.transport().name(),
                    std::env::consts::OS
                )),
            }
        }
    }

    /// Start sharing a file, replacing any active share.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SharingStart`] wrapping the cause. Nothing is left
    /// running after an error.
    pub async fn start_sharing(&self, request: ShareRequest) -> Result<SharedSession> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            tracing::info!(session = %previous.shared.session.session_id(), "Replacing active share");
            self.teardown(&previous).await;
        }

        match self.open(request).await {
            Ok(shared) => {
                *active = Some(ActiveShare {
                    shared: shared.clone(),
                    started: Instant::now(),
                });
                Ok(shared)
            }
            Err(e) => Err(Error::SharingStart(Box::new(e))),
        }
    }

    /// Stop the active share.
    ///
    /// Safe to call when nothing is shared.
    pub async fn stop_sharing(&self) {
        let mut active = self.active.lock().await;
        match active.take() {
            Some(previous) => self.teardown(&previous).await,
            None => {
                self.server.stop().await;
                self.hotspot.stop().await;
            }
        }
    }

    /// Snapshot of the active share.
    pub async fn status(&self) -> SessionStatus {
        self.active.lock().await.as_ref().map_or(
            SessionStatus {
                is_active: false,
                request_count: 0,
                uptime: Duration::ZERO,
            },
            |a| SessionStatus {
                is_active: true,
                request_count: a.shared.session.request_count(),
                uptime: a.started.elapsed(),
            },
        )
    }

    /// The active session, if any.
    pub async fn session(&self) -> Option<ShareSession> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| a.shared.session.clone())
    }

    /// Descriptor of the active share, if any.
    pub async fn descriptor(&self) -> Option<ShareDescriptor> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| a.shared.descriptor.clone())
    }

    /// Resolve an `app-share://share/<id>` link to the active descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShareNotFound`] for malformed links and for ids that
    /// do not name the active share.
    pub async fn resolve_link(&self, link: &str) -> Result<ShareDescriptor> {
        let Some(id) = descriptor::parse_share_link(link) else {
            return Err(Error::ShareNotFound(link.to_string()));
        };

        self.active
            .lock()
            .await
            .as_ref()
            .filter(|a| a.shared.session.session_id() == id)
            .map(|a| a.shared.descriptor.clone())
            .ok_or_else(|| Error::ShareNotFound(id.to_string()))
    }

    /// Subscribe to serve progress of whatever share is active.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<ServeProgress> {
        self.server.subscribe_progress()
    }

    /// Status of the hotspot.
    pub fn hotspot_status(&self) -> HotspotStatus {
        self.hotspot.status()
    }

    async fn open(&self, request: ShareRequest) -> Result<SharedSession> {
        let metadata = match tokio::fs::metadata(&request.file_path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(Error::FileNotFound(request.file_path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(request.file_path))
            }
            Err(e) => return Err(e.into()),
        };
        let file_size = metadata.len();
        if let Some(expected) = request.size_bytes.filter(|s| *s != file_size) {
            tracing::warn!(expected, actual = file_size, "File size differs from request; using size on disk");
        }

        if request.offline_mode && !self.hotspot.is_supported() {
            return Err(Error::UnsupportedPlatform(
                self.offline_support().reason.unwrap_or_default(),
            ));
        }

        let checksum = if self.config.transfer.compute_checksum {
            self.checksum.digest_for_share(&request.file_path).await?
        } else {
            None
        };

        let advertise_host = if request.offline_mode {
            self.hotspot
                .transport()
                .gateway_address()
                .map(|ip| ip.to_string())
                .or_else(|| self.config.server.host.clone())
        } else {
            self.config.server.host.clone()
        };

        let settings = &self.config.server;
        let mut server_config = ServerConfig::for_file(&request.file_path);
        server_config.port = settings.port;
        server_config.port_attempts = settings.port_attempts;
        server_config.bind_timeout = settings.bind_timeout;
        server_config.bind_address = settings.bind_address;
        server_config.advertise_host = advertise_host;
        server_config.route.clone_from(&settings.video_route);

        let server_url = self.server.start(server_config).await?;

        let hotspot = if request.offline_mode {
            let credentials = HotspotController::generate_credentials(&self.config.hotspot.ssid_prefix);
            if let Err(e) = self.hotspot.create(&credentials).await {
                self.server.stop().await;
                return Err(e);
            }
            Some(credentials)
        } else {
            None
        };

        let (Some(port), Some(requests)) =
            (self.server.port().await, self.server.request_counter().await)
        else {
            self.hotspot.stop().await;
            self.server.stop().await;
            return Err(Error::Internal("server stopped during start".to_string()));
        };

        let video = VideoDescriptor {
            id: Uuid::new_v4().to_string(),
            title: request.title,
            file_path: request.file_path.display().to_string(),
            file_size_bytes: file_size,
            thumbnail_url: request.thumbnail_url,
            checksum,
            created_at_epoch_ms: epoch_ms(),
        };
        let sender = SenderDevice {
            name: self.identity.device_name(),
            platform: self.identity.platform(),
        };

        let session = ShareSession::new(video, server_url, port, sender, hotspot)
            .with_request_counter(requests);
        let descriptor = descriptor::encode(&session);

        tracing::info!(
            session = %session.session_id(),
            url = %session.server_url(),
            offline = session.hotspot().is_some(),
            "Sharing started"
        );

        Ok(SharedSession {
            session,
            descriptor,
        })
    }

    async fn teardown(&self, previous: &ActiveShare) {
        previous.shared.session.active.store(false, Ordering::SeqCst);
        self.server.stop().await;
        self.hotspot.stop().await;
        tracing::info!(
            session = %previous.shared.session.session_id(),
            requests = previous.shared.session.request_count(),
            "Sharing stopped"
        );
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HostIdentity;
    use crate::hotspot::{HotspotState, SimulatedTransport};
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.server.port = 0;
        config.server.bind_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.server.host = Some("127.0.0.1".into());
        config
    }

    fn manager_with(transport: SimulatedTransport) -> (ShareSessionManager, Arc<SimulatedTransport>) {
        let transport = Arc::new(transport);
        let manager = ShareSessionManager::new(
            test_config(),
            transport.clone(),
            Arc::new(HostIdentity::detect()),
        );
        (manager, transport)
    }

    fn video_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![42u8; 4096]).expect("write video");
        path
    }

    #[tokio::test]
    async fn test_start_builds_descriptor() {
        let dir = TempDir::new().expect("create temp dir");
        let (manager, _) = manager_with(SimulatedTransport::new());

        let shared = manager
            .start_sharing(ShareRequest::new(video_file(&dir), "Clip"))
            .await
            .unwrap();

        let d = &shared.descriptor;
        assert_eq!(d.schema_type, "video_share");
        assert_eq!(d.video.id, shared.session.session_id());
        assert_eq!(d.video.file_size, 4096);
        assert_eq!(d.video.server_port, shared.session.server_port());
        assert!(d.video.server_url.ends_with("/video"));
        assert_eq!(d.video.checksum.as_ref().map(String::len), Some(64));
        assert!(d.hotspot.is_none());

        let status = manager.status().await;
        assert!(status.is_active);
        manager.stop_sharing().await;
        assert!(!manager.status().await.is_active);
        assert!(!shared.session.is_active());
    }

    #[tokio::test]
    async fn test_missing_file_is_sharing_start_error() {
        let (manager, _) = manager_with(SimulatedTransport::new());
        let err = manager
            .start_sharing(ShareRequest::new("/nonexistent/clip.mp4", "Clip"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SharingStart(inner) if matches!(*inner, Error::FileNotFound(_))));
        assert!(!manager.status().await.is_active);
    }

    #[tokio::test]
    async fn test_offline_share_uses_gateway_and_credentials() {
        let dir = TempDir::new().expect("create temp dir");
        let (manager, transport) = manager_with(SimulatedTransport::new());

        let shared = manager
            .start_sharing(ShareRequest::new(video_file(&dir), "Clip").offline(true))
            .await
            .unwrap();

        let hotspot = shared.descriptor.hotspot.clone().unwrap();
        assert!(hotspot.ssid.starts_with("VidShare_"));
        assert_eq!(transport.active_ssid(), Some(hotspot.ssid));
        assert!(shared.descriptor.video.server_url.starts_with("http://127.0.0.1:"));

        manager.stop_sharing().await;
        assert_eq!(transport.active_ssid(), None);
        assert_eq!(manager.hotspot().state(), HotspotState::Inactive);
    }

    #[tokio::test]
    async fn test_hotspot_failure_stops_server() {
        let dir = TempDir::new().expect("create temp dir");
        let (manager, _) = manager_with(SimulatedTransport::new().fail_start("radio busy"));

        let err = manager
            .start_sharing(ShareRequest::new(video_file(&dir), "Clip").offline(true))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SharingStart(inner) if matches!(*inner, Error::Hotspot(_))));
        assert_eq!(manager.server().state(), crate::server::ServerState::Stopped);
        assert!(manager.server().port().await.is_none());
    }

    #[tokio::test]
    async fn test_offline_unsupported() {
        let dir = TempDir::new().expect("create temp dir");
        let (manager, _) = manager_with(SimulatedTransport::new().unsupported());

        assert!(!manager.offline_support().supported);
        let err = manager
            .start_sharing(ShareRequest::new(video_file(&dir), "Clip").offline(true))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("E004"));
        assert!(manager.server().port().await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_link() {
        let dir = TempDir::new().expect("create temp dir");
        let (manager, _) = manager_with(SimulatedTransport::new());
        let shared = manager
            .start_sharing(ShareRequest::new(video_file(&dir), "Clip"))
            .await
            .unwrap();

        let resolved = manager.resolve_link(&shared.descriptor.link()).await.unwrap();
        assert_eq!(resolved, shared.descriptor);

        let unknown = manager.resolve_link("app-share://share/other").await;
        assert!(matches!(unknown, Err(Error::ShareNotFound(id)) if id == "other"));

        manager.stop_sharing().await;
        assert!(manager.resolve_link(&shared.descriptor.link()).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_without_session_is_noop() {
        let (manager, _) = manager_with(SimulatedTransport::new());
        manager.stop_sharing().await;
        manager.stop_sharing().await;
        assert_eq!(manager.status().await.request_count, 0);
    }

    #[test]
    fn test_status_serializes_uptime_ms() {
        let status = SessionStatus {
            is_active: true,
            request_count: 2,
            uptime: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["uptimeMs"], 1500);
        assert_eq!(json["isActive"], true);
        assert_eq!(json["requestCount"], 2);
    }
}
