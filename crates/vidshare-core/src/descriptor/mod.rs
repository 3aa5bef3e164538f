//! Share descriptor wire format.
//!
//! A share descriptor is the JSON payload carried by the QR code. It tells a
//! receiver what is being shared, where to fetch it and how to verify it:
//!
//! ```json
//! {
//!   "schemaType": "video_share",
//!   "schemaVersion": "1.0",
//!   "video": {
//!     "id": "...", "title": "...", "filePath": "...",
//!     "fileSize": 1000, "thumbnailUrl": "...",
//!     "serverUrl": "http://192.168.1.20:8080/video", "serverPort": 8080,
//!     "timestamp": 1700000000000, "checksum": "..."
//!   },
//!   "senderDevice": { "name": "...", "platform": "..." }
//! }
//! ```
//!
//! Offline shares add a top-level `hotspot` object with the access point
//! credentials. Optional fields are omitted rather than written as `null`.
//!
//! Decoding never trusts a payload partially: any schema or field violation
//! produces a [`RejectedDescriptor`] with a readable reason.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::hotspot::HotspotCredentials;
use crate::session::ShareSession;
use crate::{DESCRIPTOR_SCHEMA_TYPE, DESCRIPTOR_SCHEMA_VERSION, SHARE_LINK_SCHEME};

/// Immutable facts about the video being shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDescriptor {
    /// Opaque unique share identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Path of the file on the sender
    pub file_path: String,
    /// Size in bytes
    pub file_size_bytes: u64,
    /// Optional thumbnail location
    pub thumbnail_url: Option<String>,
    /// SHA-256 hex digest, if one was computed
    pub checksum: Option<String>,
    /// Creation time in milliseconds since the UNIX epoch
    pub created_at_epoch_ms: u64,
}

/// The `video` object of a descriptor: the video plus its live endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedVideo {
    /// Share identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Path of the file on the sender
    pub file_path: String,
    /// Size in bytes
    pub file_size: u64,
    /// Optional thumbnail location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Full URL of the video resource
    pub server_url: String,
    /// Port the server is listening on
    pub server_port: u16,
    /// Creation time in milliseconds since the UNIX epoch
    pub timestamp: u64,
    /// SHA-256 hex digest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl SharedVideo {
    /// Extract the endpoint-independent video facts.
    #[must_use]
    pub fn descriptor(&self) -> VideoDescriptor {
        VideoDescriptor {
            id: self.id.clone(),
            title: self.title.clone(),
            file_path: self.file_path.clone(),
            file_size_bytes: self.file_size,
            thumbnail_url: self.thumbnail_url.clone(),
            checksum: self.checksum.clone(),
            created_at_epoch_ms: self.timestamp,
        }
    }
}

/// Identity of the sending device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderDevice {
    /// Human-readable device name
    pub name: String,
    /// Platform identifier (e.g. "linux", "android")
    pub platform: String,
}

/// The versioned envelope carried by a QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareDescriptor {
    /// Always `"video_share"`
    pub schema_type: String,
    /// Always `"1.0"`
    pub schema_version: String,
    /// The shared video and where to fetch it
    pub video: SharedVideo,
    /// Who is sharing
    pub sender_device: SenderDevice,
    /// Access point to join first, for offline shares
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotspot: Option<HotspotCredentials>,
}

impl ShareDescriptor {
    /// Serialize to compact JSON, the form embedded in QR codes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON for display.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The intra-app link for this share.
    #[must_use]
    pub fn link(&self) -> String {
        share_link(&self.video.id)
    }

    /// Whether the receiver must join an access point before downloading.
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        self.hotspot.is_some()
    }
}

/// Why a payload was not accepted as a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDescriptor {
    /// Human-readable reason
    pub reason: String,
}

impl RejectedDescriptor {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RejectedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for RejectedDescriptor {}

impl From<RejectedDescriptor> for Error {
    fn from(rejected: RejectedDescriptor) -> Self {
        Self::DescriptorRejected(rejected.reason)
    }
}

/// Build the descriptor for a live session.
///
/// The session already carries the bound port and resolved URL, so the
/// result always points at the listener that is actually running.
#[must_use]
pub fn encode(session: &ShareSession) -> ShareDescriptor {
    let video = session.video();
    ShareDescriptor {
        schema_type: DESCRIPTOR_SCHEMA_TYPE.to_string(),
        schema_version: DESCRIPTOR_SCHEMA_VERSION.to_string(),
        video: SharedVideo {
            id: video.id.clone(),
            title: video.title.clone(),
            file_path: video.file_path.clone(),
            file_size: video.file_size_bytes,
            thumbnail_url: video.thumbnail_url.clone(),
            server_url: session.server_url().to_string(),
            server_port: session.server_port(),
            timestamp: video.created_at_epoch_ms,
            checksum: video.checksum.clone(),
        },
        sender_device: session.sender().clone(),
        hotspot: session.hotspot().cloned(),
    }
}

/// Parse and validate a scanned payload.
///
/// # Errors
///
/// Returns a [`RejectedDescriptor`] describing the first violation found.
pub fn decode(raw: &str) -> Result<ShareDescriptor, RejectedDescriptor> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| RejectedDescriptor::new(format!("payload is not valid JSON: {e}")))?;

    let Some(root) = value.as_object() else {
        return Err(RejectedDescriptor::new("payload is not a JSON object"));
    };

    match root.get("schemaType").and_then(Value::as_str) {
        Some(DESCRIPTOR_SCHEMA_TYPE) => {}
        Some(other) => {
            return Err(RejectedDescriptor::new(format!(
                "unsupported schema type '{other}'"
            )))
        }
        None => return Err(RejectedDescriptor::new("missing schemaType")),
    }

    match root.get("schemaVersion").and_then(Value::as_str) {
        Some(DESCRIPTOR_SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(RejectedDescriptor::new(format!(
                "unsupported schema version '{other}'"
            )))
        }
        None => return Err(RejectedDescriptor::new("missing schemaVersion")),
    }

    let Some(video) = root.get("video").and_then(Value::as_object) else {
        return Err(RejectedDescriptor::new("missing video"));
    };
    for field in ["id", "title", "filePath"] {
        require_text(video, field, "video")?;
    }

    let Some(sender) = root.get("senderDevice").and_then(Value::as_object) else {
        return Err(RejectedDescriptor::new("missing senderDevice"));
    };
    require_text(sender, "name", "senderDevice")?;

    let descriptor: ShareDescriptor = serde_json::from_value(value)
        .map_err(|e| RejectedDescriptor::new(format!("malformed descriptor: {e}")))?;

    match reqwest::Url::parse(&descriptor.video.server_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {}
        _ => {
            return Err(RejectedDescriptor::new(format!(
                "video.serverUrl '{}' is not an http URL",
                descriptor.video.server_url
            )))
        }
    }

    Ok(descriptor)
}

fn require_text(
    object: &serde_json::Map<String, Value>,
    field: &str,
    parent: &str,
) -> Result<(), RejectedDescriptor> {
    match object.get(field).and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(()),
        Some(_) => Err(RejectedDescriptor::new(format!("{parent}.{field} is empty"))),
        None => Err(RejectedDescriptor::new(format!("missing {parent}.{field}"))),
    }
}

/// Build an `app-share://share/<id>` link.
///
/// # Example
///
/// ```
/// use vidshare_core::descriptor::share_link;
///
/// assert_eq!(share_link("abc"), "app-share://share/abc");
/// ```
#[must_use]
pub fn share_link(session_id: &str) -> String {
    format!("{SHARE_LINK_SCHEME}://share/{session_id}")
}

/// Extract the session id from an `app-share://share/<id>` link.
#[must_use]
pub fn parse_share_link(link: &str) -> Option<&str> {
    let rest = link
        .trim()
        .strip_prefix(SHARE_LINK_SCHEME)?
        .strip_prefix("://share/")?;
    let id = rest.trim_end_matches('/');
    (!id.is_empty() && !id.contains('/')).then_some(id)
}
