//! Error types for VidShare.
//!
//! This module provides a unified error type for all VidShare operations,
//! with specific error variants for the sender, the receiver and the
//! network plumbing between them.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A specialized `Result` type for VidShare operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for VidShare.
#[derive(Error, Debug)]
pub enum Error {
    /// File to share or verify does not exist (E001)
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Listener could not be bound (E002)
    #[error("failed to bind port {port}: {reason}")]
    Bind {
        /// Last port that was tried
        port: u16,
        /// Underlying reason
        reason: String,
    },

    /// Every candidate port was already taken (E002)
    #[error("port {0} is already in use")]
    PortInUse(u16),

    /// Platform refused the hotspot permissions (E003)
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Capability is not available on this platform (E004)
    #[error("not supported on this platform: {0}")]
    UnsupportedPlatform(String),

    /// Share descriptor was malformed or had the wrong version (E005)
    #[error("share descriptor rejected: {0}")]
    DescriptorRejected(String),

    /// Referenced share is unknown or expired (E006)
    #[error("share '{0}' not found or expired")]
    ShareNotFound(String),

    /// Server answered with a status other than 200/206 (E007)
    #[error("download failed with HTTP status {status}")]
    Download {
        /// HTTP status code returned by the sender
        status: u16,
    },

    /// Operation timed out (E008)
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Downloaded content does not match the advertised checksum (E009)
    #[error("integrity check failed: expected {expected}, got {actual}")]
    Integrity {
        /// Checksum from the descriptor
        expected: String,
        /// Checksum of the received file
        actual: String,
    },

    /// Checksum could not be computed
    #[error("checksum unavailable for {}: {reason}", path.display())]
    ChecksumUnavailable {
        /// File that was being hashed
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// Starting a share session failed
    #[error("failed to start sharing: {0}")]
    SharingStart(Box<Error>),

    /// Hotspot operation failed
    #[error("hotspot error: {0}")]
    Hotspot(String),

    /// Network error other than a timeout
    #[error("network error: {0}")]
    Network(String),

    /// Operation was cancelled
    #[error("cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code for this error, if applicable.
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::FileNotFound(_) => Some("E001"),
            Self::Bind { .. } | Self::PortInUse(_) => Some("E002"),
            Self::PermissionDenied(_) => Some("E003"),
            Self::UnsupportedPlatform(_) => Some("E004"),
            Self::DescriptorRejected(_) => Some("E005"),
            Self::ShareNotFound(_) => Some("E006"),
            Self::Download { .. } => Some("E007"),
            Self::Timeout(_) => Some("E008"),
            Self::Integrity { .. } => Some("E009"),
            Self::SharingStart(inner) => inner.code(),
            _ => None,
        }
    }

    /// Returns whether this error is recoverable (a retry may resume).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Network(_) | Self::Cancelled | Self::Download { .. }
        )
    }

    /// Returns a short actionable message for the user, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::FileNotFound(_) => Some("Check that the file still exists and try again"),
            Self::Bind { .. } | Self::PortInUse(_) => {
                Some("Close other apps using the port or choose another with --port")
            }
            Self::PermissionDenied(_) => {
                Some("Grant network management permissions to create a hotspot")
            }
            Self::UnsupportedPlatform(_) => {
                Some("Offline sharing is unavailable here; share over the current network instead")
            }
            Self::DescriptorRejected(_) => {
                Some("The scanned code is not a valid video share; ask the sender to share again")
            }
            Self::ShareNotFound(_) => Some("The share has ended; ask the sender to share again"),
            Self::Download { .. } | Self::Network(_) => {
                Some("Download requires a working connection to the sender")
            }
            Self::Timeout(_) => Some("The sender stopped responding; retry to resume the download"),
            Self::Integrity { .. } => Some("The file failed its integrity check and was removed"),
            Self::ChecksumUnavailable { .. } => {
                Some("The file could not be read to verify it; check permissions and disk space")
            }
            Self::SharingStart(inner) => inner.suggestion(),
            _ => None,
        }
    }
}
