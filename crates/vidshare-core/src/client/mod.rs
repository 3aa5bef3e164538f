//! Receiving side of a share.
//!
//! The [`TransferClient`] takes a scanned descriptor, joins the sender's
//! access point when one is advertised, downloads the video over HTTP and
//! verifies it before handing it to a [`ReceivedFileSink`].
//!
//! ## Status flow
//!
//! ```text
//! Idle -> Connecting -> Downloading -> Verifying -> Completed
//!              \______________\____________\______> Failed
//! ```
//!
//! ## Resuming
//!
//! A partial file at the destination is continued with `Range: bytes=N-`.
//! A sender that ignores the range (200) restarts the file from zero, and a
//! partial file larger than the advertised size is discarded.
//!
//! ## Example
//!
//! ```rust,ignore
//! let client = TransferClient::new(&config, transport)?;
//! let descriptor = client.accept_descriptor(&scanned)?;
//! let result = client.download(&descriptor, Path::new("clip.mp4")).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::{header, StatusCode};
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::checksum::{ChecksumVerifier, Verification};
use crate::config::Config;
use crate::descriptor::{self, ShareDescriptor};
use crate::device::{KeepInPlace, ReceivedFileSink};
use crate::error::{Error, Result};
use crate::file::safe_file_name;
use crate::hotspot::NearbyTransport;

/// Download lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Nothing in progress
    Idle,
    /// Joining the network and waiting for response headers
    Connecting,
    /// Receiving the body
    Downloading,
    /// Checking the checksum
    Verifying,
    /// File stored
    Completed,
    /// Stopped with an error or cancelled
    Failed,
}

impl DownloadStatus {
    /// Whether the download has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Observable receiver-side state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadState {
    /// Descriptor being downloaded
    pub share_descriptor: Option<ShareDescriptor>,
    /// Where bytes are written
    pub local_destination_path: Option<PathBuf>,
    /// Bytes on disk, including any resumed prefix
    pub bytes_written: u64,
    /// Advertised size
    pub total_bytes: u64,
    /// Current status
    pub status: DownloadStatus,
    /// Message of the error that failed the download
    pub last_error: Option<String>,
}

impl Default for DownloadState {
    fn default() -> Self {
        Self {
            share_descriptor: None,
            local_destination_path: None,
            bytes_written: 0,
            total_bytes: 0,
            status: DownloadStatus::Idle,
            last_error: None,
        }
    }
}

impl DownloadState {
    /// Progress in percent (0-100).
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.bytes_written as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }
}

/// Outcome of a completed download.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// Final location, after the sink
    pub path: PathBuf,
    /// Size of the stored file
    pub bytes: u64,
    /// Offset the transfer resumed from (0 for a fresh download)
    pub resumed_from: u64,
    /// Checksum outcome
    pub verification: Verification,
    /// Wall time of the call
    pub elapsed: Duration,
}

/// Downloads shared videos.
pub struct TransferClient {
    http: reqwest::Client,
    transport: Arc<dyn NearbyTransport>,
    sink: Arc<dyn ReceivedFileSink>,
    checksum: ChecksumVerifier,
    chunk_size: u64,
    read_timeout: Duration,
    settle_delay: Duration,
    state: watch::Sender<DownloadState>,
    cancel: Mutex<CancellationToken>,
    delete_partial: AtomicBool,
}

impl std::fmt::Debug for TransferClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferClient")
            .field("transport", &self.transport.name())
            .field("chunk_size", &self.chunk_size)
            .field("status", &self.state.borrow().status)
            .finish_non_exhaustive()
    }
}

impl TransferClient {
    /// Create a client from configuration.
    ///
    /// Verified files stay where they were downloaded unless a sink is
    /// installed with [`with_sink`](Self::with_sink).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config, transport: Arc<dyn NearbyTransport>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.transfer.connect_timeout)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;
        let (state, _) = watch::channel(DownloadState::default());

        Ok(Self {
            http,
            transport,
            sink: Arc::new(KeepInPlace),
            checksum: ChecksumVerifier::new(config.transfer.checksum_policy),
            chunk_size: config.transfer.chunk_size.max(1) as u64,
            read_timeout: config.transfer.read_timeout,
            settle_delay: config.hotspot.settle_delay,
            state,
            cancel: Mutex::new(CancellationToken::new()),
            delete_partial: AtomicBool::new(false),
        })
    }

    /// Hand verified files to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReceivedFileSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Current state.
    pub fn state(&self) -> DownloadState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<DownloadState> {
        self.state.subscribe()
    }

    /// Return to `Idle`, forgetting the last download.
    pub fn reset(&self) {
        self.state.send_replace(DownloadState::default());
    }

    /// Decode a scanned payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DescriptorRejected`]; the state becomes `Failed`
    /// with the rejection reason.
    pub fn accept_descriptor(&self, raw: &str) -> Result<ShareDescriptor> {
        descriptor::decode(raw).map_err(|rejected| {
            tracing::warn!(reason = %rejected.reason, "Rejected scanned descriptor");
            self.state.send_modify(|s| {
                s.status = DownloadStatus::Failed;
                s.last_error = Some(rejected.reason.clone());
            });
            Error::from(rejected)
        })
    }

    /// Stop the running download.
    ///
    /// The connection is released. The partial file is kept for a later
    /// resume unless `delete_partial` is set.
    pub async fn cancel(&self, delete_partial: bool) {
        self.delete_partial.store(delete_partial, Ordering::SeqCst);
        self.cancel.lock().await.cancel();
    }

    /// Download the shared video to `destination`.
    ///
    /// # Errors
    ///
    /// - [`Error::Download`] for a status other than 200/206
    /// - [`Error::Timeout`] when connecting or reading stalls
    /// - [`Error::Network`] for other transport failures
    /// - [`Error::Integrity`] on checksum mismatch (the file is removed)
    /// - [`Error::Cancelled`] after [`cancel`](Self::cancel)
    pub async fn download(
        &self,
        descriptor: &ShareDescriptor,
        destination: &Path,
    ) -> Result<DownloadResult> {
        let token = {
            let mut current = self.cancel.lock().await;
            *current = CancellationToken::new();
            current.clone()
        };
        self.delete_partial.store(false, Ordering::SeqCst);

        self.state.send_replace(DownloadState {
            share_descriptor: Some(descriptor.clone()),
            local_destination_path: Some(destination.to_path_buf()),
            bytes_written: 0,
            total_bytes: descriptor.video.file_size,
            status: DownloadStatus::Connecting,
            last_error: None,
        });

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => Err(Error::Cancelled),
            result = self.run(descriptor, destination) => result,
        };

        match outcome {
            Ok(mut result) => {
                result.elapsed = started.elapsed();
                self.state.send_modify(|s| {
                    s.status = DownloadStatus::Completed;
                    s.local_destination_path = Some(result.path.clone());
                });
                tracing::info!(
                    path = %result.path.display(),
                    bytes = result.bytes,
                    resumed_from = result.resumed_from,
                    elapsed_ms = result.elapsed.as_millis(),
                    "Download completed"
                );
                Ok(result)
            }
            Err(e) => {
                if matches!(e, Error::Cancelled) && self.delete_partial.load(Ordering::SeqCst) {
                    if let Err(remove) = tokio::fs::remove_file(destination).await {
                        tracing::debug!(error = %remove, "No partial file to remove");
                    }
                }
                tracing::warn!(error = %e, "Download failed");
                self.state.send_modify(|s| {
                    s.status = DownloadStatus::Failed;
                    s.last_error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    async fn run(&self, descriptor: &ShareDescriptor, destination: &Path) -> Result<DownloadResult> {
        if let Some(credentials) = &descriptor.hotspot {
            tracing::info!(ssid = %credentials.ssid, "Joining sender's access point");
            self.transport.join_access_point(credentials).await?;
            if !self.settle_delay.is_zero() {
                tokio::time::sleep(self.settle_delay).await;
            }
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let total = descriptor.video.file_size;
        let mut existing = match tokio::fs::metadata(destination).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        if existing > total {
            tracing::info!(existing, total, "Partial file larger than advertised; starting over");
            tokio::fs::File::create(destination).await?;
            existing = 0;
        }

        let url = &descriptor.video.server_url;
        let mut response = self.request(url, existing).await?;
        let mut resumed_from = existing;

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE && existing > 0 && existing == total {
            tracing::info!(bytes = existing, "File already complete");
            drop(response);
            return self.finish(descriptor, destination, existing, existing).await;
        }

        match status {
            StatusCode::PARTIAL_CONTENT if content_range_start(&response) == Some(existing) => {
                tracing::info!(offset = existing, total, "Resuming download");
            }
            StatusCode::OK => resumed_from = 0,
            StatusCode::PARTIAL_CONTENT | StatusCode::RANGE_NOT_SATISFIABLE => {
                tracing::info!(offset = existing, "Sender cannot resume here; starting over");
                drop(response);
                response = self.request(url, 0).await?;
                if response.status() != StatusCode::OK {
                    return Err(Error::Download {
                        status: response.status().as_u16(),
                    });
                }
                resumed_from = 0;
            }
            other => return Err(Error::Download { status: other.as_u16() }),
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(resumed_from > 0)
            .truncate(resumed_from == 0)
            .open(destination)
            .await?;

        self.state.send_modify(|s| {
            s.status = DownloadStatus::Downloading;
            s.bytes_written = resumed_from;
        });

        let streamed = self.receive_body(&mut file, response, resumed_from, total).await;
        file.flush().await?;
        let written = streamed?;
        file.sync_all().await?;
        drop(file);

        if written < total {
            return Err(Error::Network(format!(
                "connection closed after {written} of {total} bytes"
            )));
        }

        self.finish(descriptor, destination, written, resumed_from).await
    }

    /// Append the response body to `file`, returning the new file length.
    ///
    /// Nothing past `total` is written; a longer body is a [`Error::Network`].
    async fn receive_body(
        &self,
        file: &mut tokio::fs::File,
        response: reqwest::Response,
        offset: u64,
        total: u64,
    ) -> Result<u64> {
        let mut written = offset;
        let mut reported = offset;
        let mut body = response.bytes_stream();
        loop {
            let chunk = match tokio::time::timeout(self.read_timeout, body.next()).await {
                Err(_) => return Err(Error::Timeout(self.read_timeout)),
                Ok(None) => return Ok(written),
                Ok(Some(chunk)) => chunk.map_err(|e| self.map_http_error(&e))?,
            };

            let room = usize::try_from(total - written).unwrap_or(usize::MAX);
            if chunk.len() > room {
                file.write_all(&chunk[..room]).await?;
                self.state.send_modify(|s| s.bytes_written = total);
                return Err(Error::Network(format!(
                    "sender sent more than the advertised {total} bytes"
                )));
            }
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if written - reported >= self.chunk_size {
                reported = written;
                tracing::debug!(written, "Download progress");
                self.state.send_modify(|s| s.bytes_written = written);
            }
        }
    }

    async fn finish(
        &self,
        descriptor: &ShareDescriptor,
        destination: &Path,
        bytes: u64,
        resumed_from: u64,
    ) -> Result<DownloadResult> {
        let expected = descriptor.video.checksum.as_deref();
        self.state.send_modify(|s| {
            s.bytes_written = bytes;
            if expected.is_some() {
                s.status = DownloadStatus::Verifying;
            }
        });

        let verification = match self.checksum.verify(destination, expected).await {
            Ok(v) => v,
            Err(e @ Error::Integrity { .. }) => {
                if let Err(remove) = tokio::fs::remove_file(destination).await {
                    tracing::warn!(error = %remove, "Failed to remove corrupt download");
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let suggested = safe_file_name(&descriptor.video.title, &descriptor.video.file_path);
        let path = self.sink.accept(destination, &suggested).await?;

        Ok(DownloadResult {
            path,
            bytes,
            resumed_from,
            verification,
            elapsed: Duration::ZERO,
        })
    }

    async fn request(&self, url: &str, offset: u64) -> Result<reqwest::Response> {
        let mut request = self.http.get(url);
        if offset > 0 {
            request = request.header(header::RANGE, format!("bytes={offset}-"));
        }
        tracing::debug!(url, offset, "Requesting video");

        match tokio::time::timeout(self.read_timeout, request.send()).await {
            Err(_) => Err(Error::Timeout(self.read_timeout)),
            Ok(result) => result.map_err(|e| self.map_http_error(&e)),
        }
    }

    fn map_http_error(&self, e: &reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.read_timeout)
        } else {
            Error::Network(e.to_string())
        }
    }
}

/// First byte of a `Content-Range: bytes a-b/size` header.
fn content_range_start(response: &reqwest::Response) -> Option<u64> {
    let value = response.headers().get(header::CONTENT_RANGE)?.to_str().ok()?;
    parse_content_range_start(value)
}

fn parse_content_range_start(value: &str) -> Option<u64> {
    let (start, _) = value.trim().strip_prefix("bytes ")?.split_once('-')?;
    start.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotspot::SimulatedTransport;
    use crate::server::{LocalFileServer, ServerConfig};
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    fn client_config() -> Config {
        let mut config = Config::default();
        config.hotspot.settle_delay = Duration::ZERO;
        config.transfer.read_timeout = Duration::from_secs(5);
        config.transfer.chunk_size = 1024;
        config
    }

    fn client() -> TransferClient {
        TransferClient::new(&client_config(), Arc::new(SimulatedTransport::new())).unwrap()
    }

    fn descriptor_json(url: &str, size: u64, checksum: Option<&str>) -> String {
        let mut video = serde_json::json!({
            "id": "abc",
            "title": "Clip",
            "filePath": "/videos/clip.mp4",
            "fileSize": size,
            "serverUrl": url,
            "serverPort": 8080,
            "timestamp": 1,
        });
        if let Some(sum) = checksum {
            video["checksum"] = serde_json::Value::from(sum);
        }
        serde_json::json!({
            "schemaType": "video_share",
            "schemaVersion": "1.0",
            "video": video,
            "senderDevice": {"name": "Phone", "platform": "android"},
        })
        .to_string()
    }

    async fn serve(dir: &TempDir, data: &[u8]) -> (LocalFileServer, String) {
        let path = dir.path().join("source.mp4");
        std::fs::write(&path, data).unwrap();
        let server = LocalFileServer::new();
        let url = server
            .start(
                ServerConfig::for_file(&path)
                    .with_port(0)
                    .with_bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
                    .with_advertise_host("127.0.0.1"),
            )
            .await
            .unwrap();
        (server, url)
    }

    #[test]
    fn test_parse_content_range_start() {
        assert_eq!(parse_content_range_start("bytes 100-199/200"), Some(100));
        assert_eq!(parse_content_range_start("bytes */200"), None);
        assert_eq!(parse_content_range_start("items 1-2/3"), None);
    }

    #[test]
    fn test_percentage() {
        let mut state = DownloadState {
            total_bytes: 200,
            bytes_written: 50,
            ..DownloadState::default()
        };
        assert!((state.percentage() - 25.0).abs() < f64::EPSILON);
        state.total_bytes = 0;
        assert!(state.percentage().abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejected_descriptor_fails_state() {
        let client = client();
        let err = client.accept_descriptor("{\"schemaType\":\"other\"}").unwrap_err();
        assert!(matches!(err, Error::DescriptorRejected(_)));

        let state = client.state();
        assert_eq!(state.status, DownloadStatus::Failed);
        assert!(state.last_error.is_some());

        client.reset();
        assert_eq!(client.state(), DownloadState::default());
    }

    #[tokio::test]
    async fn test_download_verifies_checksum() {
        let dir = TempDir::new().expect("create temp dir");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let (server, url) = serve(&dir, &data).await;
        let sum = ChecksumVerifier::default()
            .compute(&dir.path().join("source.mp4"))
            .await
            .unwrap();

        let client = client();
        let descriptor = client
            .accept_descriptor(&descriptor_json(&url, data.len() as u64, Some(&sum)))
            .unwrap();
        let dest = dir.path().join("out").join("clip.mp4");
        let result = client.download(&descriptor, &dest).await.unwrap();

        assert_eq!(result.bytes, data.len() as u64);
        assert_eq!(result.resumed_from, 0);
        assert_eq!(result.verification, Verification::Matched(sum));
        assert_eq!(std::fs::read(&dest).unwrap(), data);
        assert_eq!(client.state().status, DownloadStatus::Completed);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_checksum_mismatch_removes_file() {
        let dir = TempDir::new().expect("create temp dir");
        let (server, url) = serve(&dir, b"genuine bytes").await;

        let client = client();
        let descriptor = client
            .accept_descriptor(&descriptor_json(&url, 13, Some(&"0".repeat(64))))
            .unwrap();
        let dest = dir.path().join("clip.mp4");
        let err = client.download(&descriptor, &dest).await.unwrap_err();

        assert!(matches!(err, Error::Integrity { .. }));
        assert!(!dest.exists());
        assert_eq!(client.state().status, DownloadStatus::Failed);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_resume_appends_from_partial() {
        let dir = TempDir::new().expect("create temp dir");
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 97) as u8).collect();
        let (server, url) = serve(&dir, &data).await;

        let dest = dir.path().join("clip.mp4");
        std::fs::write(&dest, &data[..1234]).unwrap();

        let client = client();
        let descriptor = client
            .accept_descriptor(&descriptor_json(&url, data.len() as u64, None))
            .unwrap();
        let result = client.download(&descriptor, &dest).await.unwrap();

        assert_eq!(result.resumed_from, 1234);
        assert_eq!(result.verification, Verification::NotRequested);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_complete_partial_goes_to_verification() {
        let dir = TempDir::new().expect("create temp dir");
        let (server, url) = serve(&dir, b"0123456789").await;

        let dest = dir.path().join("clip.mp4");
        std::fs::write(&dest, b"0123456789").unwrap();

        let client = client();
        let descriptor = client.accept_descriptor(&descriptor_json(&url, 10, None)).unwrap();
        let result = client.download(&descriptor, &dest).await.unwrap();

        assert_eq!(result.bytes, 10);
        assert_eq!(result.resumed_from, 10);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_oversized_partial_restarts() {
        let dir = TempDir::new().expect("create temp dir");
        let (server, url) = serve(&dir, b"short").await;

        let dest = dir.path().join("clip.mp4");
        std::fs::write(&dest, b"much longer stale content").unwrap();

        let client = client();
        let descriptor = client.accept_descriptor(&descriptor_json(&url, 5, None)).unwrap();
        let result = client.download(&descriptor, &dest).await.unwrap();

        assert_eq!(result.resumed_from, 0);
        assert_eq!(std::fs::read(&dest).unwrap(), b"short");
        server.stop().await;
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let dir = TempDir::new().expect("create temp dir");
        let (server, url) = serve(&dir, b"0123456789abcdef").await;

        let client = client();
        let descriptor = client.accept_descriptor(&descriptor_json(&url, 10, None)).unwrap();
        let dest = dir.path().join("clip.mp4");
        let err = client.download(&descriptor, &dest).await.unwrap_err();

        assert!(matches!(err, Error::Network(_)));
        assert_eq!(std::fs::read(&dest).unwrap(), b"0123456789");
        assert_eq!(client.state().status, DownloadStatus::Failed);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let dir = TempDir::new().expect("create temp dir");
        let (server, url) = serve(&dir, b"abc").await;
        let missing = url.replace("/video", "/nothing");

        let client = client();
        let descriptor = client.accept_descriptor(&descriptor_json(&missing, 3, None)).unwrap();
        let err = client
            .download(&descriptor, &dir.path().join("clip.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Download { status: 404 }));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_unreachable_sender_is_network_error() {
        let dir = TempDir::new().expect("create temp dir");
        let (server, url) = serve(&dir, b"abc").await;
        server.stop().await;

        let client = client();
        let descriptor = client.accept_descriptor(&descriptor_json(&url, 3, None)).unwrap();
        let err = client
            .download(&descriptor, &dir.path().join("clip.mp4"))
            .await
            .unwrap_err();

        assert!(err.is_recoverable());
        assert!(matches!(err, Error::Network(_) | Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_offline_descriptor_joins_access_point() {
        let dir = TempDir::new().expect("create temp dir");
        let (server, url) = serve(&dir, b"abc").await;

        let transport = Arc::new(SimulatedTransport::new());
        let client = TransferClient::new(&client_config(), transport.clone()).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&descriptor_json(&url, 3, None)).unwrap();
        raw["hotspot"] = serde_json::json!({
            "ssid": "VidShare_123456",
            "password": "abcdefghijkl",
            "isSecured": true,
        });
        let descriptor = client.accept_descriptor(&raw.to_string()).unwrap();
        client
            .download(&descriptor, &dir.path().join("clip.mp4"))
            .await
            .unwrap();

        assert_eq!(transport.joined_networks(), vec!["VidShare_123456".to_string()]);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_failed_join_fails_download() {
        let client =
            TransferClient::new(&client_config(), Arc::new(SimulatedTransport::new().fail_join()))
                .unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&descriptor_json("http://127.0.0.1:9/video", 3, None)).unwrap();
        raw["hotspot"] = serde_json::json!({
            "ssid": "VidShare_1",
            "password": "abcdefghijkl",
            "isSecured": true,
        });
        let descriptor = client.accept_descriptor(&raw.to_string()).unwrap();
        let dir = TempDir::new().expect("create temp dir");

        assert!(client
            .download(&descriptor, &dir.path().join("clip.mp4"))
            .await
            .is_err());
        assert_eq!(client.state().status, DownloadStatus::Failed);
    }
}
