//! Shared state for the file server's handlers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::broadcast;

/// Progress of one response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeProgress {
    /// Sequence number of the request this progress belongs to
    pub request: u64,
    /// Bytes written to the response so far
    pub bytes_transferred: u64,
    /// Bytes this response will carry in total
    pub total_bytes: u64,
    /// Throughput since the previous event, in bytes per second
    pub instantaneous_speed: f64,
}

impl ServeProgress {
    /// Completion percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_transferred as f64 / self.total_bytes as f64) * 100.0
    }

    /// Whether the response has been fully written.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.bytes_transferred >= self.total_bytes
    }
}

/// The single file a server instance exposes.
#[derive(Debug, Clone)]
pub struct ServedFile {
    /// Location on disk
    pub path: PathBuf,
    /// Name reported to clients
    pub name: String,
    /// `Content-Type` value
    pub mime_type: String,
}

/// State shared by every handler of one server instance.
#[derive(Debug)]
pub struct AppState {
    /// The file being served
    pub file: ServedFile,
    /// Port the listener is bound to
    pub port: u16,
    /// When the listener came up
    pub started_at: Instant,
    /// Requests for the video so far
    pub requests: Arc<AtomicU64>,
    /// Progress fan-out
    pub progress: broadcast::Sender<ServeProgress>,
}

impl AppState {
    /// Record a request and return its sequence number (1-based).
    pub fn next_request(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Requests served so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Shared application state handle.
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_progress_percentage() {
        let progress = ServeProgress {
            request: 1,
            bytes_transferred: 250,
            total_bytes: 1000,
            instantaneous_speed: 0.0,
        };
        assert!((progress.percentage() - 25.0).abs() < f64::EPSILON);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_serve_progress_serializes_camel_case() {
        let progress = ServeProgress {
            request: 3,
            bytes_transferred: 10,
            total_bytes: 10,
            instantaneous_speed: 1.5,
        };
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["bytesTransferred"], 10);
        assert_eq!(json["instantaneousSpeed"], 1.5);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_request_counter() {
        let (progress, _) = broadcast::channel(4);
        let state = AppState {
            file: ServedFile {
                path: PathBuf::from("a.mp4"),
                name: "a.mp4".into(),
                mime_type: "video/mp4".into(),
            },
            port: 8080,
            started_at: Instant::now(),
            requests: Arc::new(AtomicU64::new(0)),
            progress,
        };
        assert_eq!(state.next_request(), 1);
        assert_eq!(state.next_request(), 2);
        assert_eq!(state.request_count(), 2);
    }
}
