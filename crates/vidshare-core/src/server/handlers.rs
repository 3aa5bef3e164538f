//! HTTP endpoint handlers for the file server.

use std::io::{self, SeekFrom};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::Response,
    Json,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio::sync::broadcast;
use tokio_util::io::ReaderStream;

use super::error::{ApiError, ApiResult};
use super::range::{self, RangeRequest};
use super::state::{ServeProgress, SharedState};
use crate::file::size_in_mb;

/// Read size for response bodies.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Number of progress events per response, at minimum.
const PROGRESS_STEPS: u64 = 10;

/// `GET /info` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    /// Name of the served file
    pub file_name: String,
    /// Size in bytes
    pub file_size: u64,
    /// Size in megabytes, two decimals
    #[serde(rename = "fileSizeMB")]
    pub file_size_mb: f64,
    /// Server clock, RFC 3339
    pub server_time: String,
    /// Video requests served so far
    pub request_count: u64,
}

/// `GET /status` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Always true while the listener answers
    pub is_running: bool,
    /// Bound port
    pub port: u16,
    /// Video requests served so far
    pub request_count: u64,
    /// Time since the listener came up
    pub uptime_ms: u64,
    /// Server clock, milliseconds since the UNIX epoch
    pub timestamp: u64,
}

/// GET /<video> - Serve the file, whole or by range.
///
/// Failures before the body starts produce a JSON error. A read failure
/// after streaming has begun ends that response's body early; other
/// requests are unaffected.
pub async fn serve_video(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let request = state.next_request();

    let mut file = File::open(&state.file.path).await.map_err(|e| {
        tracing::warn!(request, error = %e, "Cannot open served file");
        if e.kind() == io::ErrorKind::NotFound {
            ApiError::not_found("the shared file is no longer available")
        } else {
            ApiError::from(e)
        }
    })?;
    let size = file.metadata().await?.len();

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let (status, range) = match range::resolve(range_header, size) {
        RangeRequest::Full => (StatusCode::OK, None),
        RangeRequest::Partial(range) => (StatusCode::PARTIAL_CONTENT, Some(range)),
        RangeRequest::Unsatisfiable => {
            tracing::debug!(request, ?range_header, size, "Unsatisfiable range");
            return Err(ApiError::range_not_satisfiable(size));
        }
    };

    let (start, len) = range.map_or((0, size), |r| (r.start, r.len()));
    if start > 0 {
        file.seek(SeekFrom::Start(start)).await?;
    }
    tracing::info!(request, start, len, size, "Serving video");

    let body = Body::from_stream(progress_stream(
        file.take(len),
        request,
        len,
        state.progress.clone(),
    ));

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, &state.file.mime_type)
        .header(header::CONTENT_LENGTH, len)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&state.file.name),
        );
    if let Some(range) = range {
        builder = builder.header(header::CONTENT_RANGE, range.content_range(size));
    }

    builder
        .body(body)
        .map_err(|e| ApiError::internal(format!("failed to build response: {e}")))
}

/// GET /info - Describe the served file.
pub async fn info(State(state): State<SharedState>) -> ApiResult<Json<InfoResponse>> {
    let size = tokio::fs::metadata(&state.file.path).await?.len();

    Ok(Json(InfoResponse {
        file_name: state.file.name.clone(),
        file_size: size,
        file_size_mb: size_in_mb(size),
        server_time: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        request_count: state.request_count(),
    }))
}

/// GET /status - Report listener health.
pub async fn status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let uptime_ms = u64::try_from(state.started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default();

    Json(StatusResponse {
        is_running: true,
        port: state.port,
        request_count: state.request_count(),
        uptime_ms,
        timestamp,
    })
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found("no such resource").with_details(uri.path().to_string())
}

/// Stream `reader` while publishing progress at least every tenth of `total`.
fn progress_stream<R>(
    reader: R,
    request: u64,
    total: u64,
    progress: broadcast::Sender<ServeProgress>,
) -> impl Stream<Item = io::Result<Bytes>>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    async_stream::stream! {
        let mut chunks = ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE);
        let step = (total / PROGRESS_STEPS).max(1);
        let mut sent = 0u64;
        let mut next_report = step;
        let mut last_at = Instant::now();
        let mut last_sent = 0u64;

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    sent += bytes.len() as u64;
                    if sent >= next_report || sent >= total {
                        let elapsed = last_at.elapsed().as_secs_f64();
                        let instantaneous_speed = if elapsed > 0.0 {
                            (sent - last_sent) as f64 / elapsed
                        } else {
                            0.0
                        };
                        let _ = progress.send(ServeProgress {
                            request,
                            bytes_transferred: sent,
                            total_bytes: total,
                            instantaneous_speed,
                        });
                        last_at = Instant::now();
                        last_sent = sent;
                        next_report = (sent / step + 1) * step;
                    }
                    yield Ok(bytes);
                }
                Err(e) => {
                    tracing::warn!(request, sent, error = %e, "Aborting response after read error");
                    yield Err(e);
                    return;
                }
            }
        }

        if sent < total {
            tracing::warn!(request, sent, total, "File shrank while serving");
            yield Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "file truncated while serving",
            ));
        }
    }
}

/// `Content-Disposition` value with a header-safe file name.
fn content_disposition(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_escapes() {
        assert_eq!(
            content_disposition("holiday clip.mp4"),
            "attachment; filename=\"holiday clip.mp4\""
        );
        assert_eq!(
            content_disposition("a\"b\\c\u{e9}.mp4"),
            "attachment; filename=\"a_b_c_.mp4\""
        );
    }

    #[tokio::test]
    async fn test_progress_stream_reports_every_tenth() {
        let data = vec![1u8; 1000];
        let (tx, mut rx) = broadcast::channel(64);

        let reader = std::io::Cursor::new(data.clone());
        let collected: Vec<u8> = progress_stream(reader, 1, 1000, tx)
            .map(|chunk| chunk.unwrap().to_vec())
            .concat()
            .await;
        assert_eq!(collected, data);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        let last = events.last().unwrap();
        assert_eq!(last.bytes_transferred, 1000);
        assert!(last.is_complete());
    }

    #[tokio::test]
    async fn test_progress_stream_flags_truncation() {
        let (tx, _rx) = broadcast::channel(4);
        let reader = std::io::Cursor::new(vec![0u8; 10]);

        let results: Vec<io::Result<Bytes>> = progress_stream(reader, 1, 20, tx).collect().await;
        assert!(results.first().unwrap().is_ok());
        assert_eq!(
            results.last().unwrap().as_ref().unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }
}
