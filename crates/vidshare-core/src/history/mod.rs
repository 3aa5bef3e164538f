//! Transfer history.
//!
//! A JSON log of shared and received videos, newest first, capped at
//! `history.max_entries`.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::HistoryConfig;
use crate::error::{Error, Result};

const FORMAT_VERSION: u32 = 1;

/// Direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// This device shared the video
    Sent,
    /// This device downloaded the video
    Received,
}

impl std::fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sent => write!(f, "Sent"),
            Self::Received => write!(f, "Received"),
        }
    }
}

/// How a transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Finished (and verified, when a checksum was present)
    Completed,
    /// Ended with an error
    Failed,
    /// Stopped by the user
    Cancelled,
}

impl std::fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// One recorded transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entry identifier
    pub id: Uuid,
    /// Seconds since the UNIX epoch
    pub timestamp: u64,
    /// Direction
    pub direction: TransferDirection,
    /// Share session the transfer belonged to
    pub session_id: String,
    /// Video title
    pub title: String,
    /// Other device, when known
    pub peer_name: Option<String>,
    /// Local file involved
    pub file_path: Option<PathBuf>,
    /// Advertised size in bytes
    pub total_bytes: u64,
    /// Bytes actually moved
    pub bytes_transferred: u64,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Whether a checksum matched
    pub verified: bool,
    /// Final outcome
    pub outcome: TransferOutcome,
    /// Error message, when failed
    pub error_message: Option<String>,
}

impl HistoryEntry {
    /// A completed entry stamped with the current time.
    #[must_use]
    pub fn new(direction: TransferDirection, session_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            direction,
            session_id: session_id.into(),
            title: title.into(),
            peer_name: None,
            file_path: None,
            total_bytes: 0,
            bytes_transferred: 0,
            duration_ms: 0,
            verified: false,
            outcome: TransferOutcome::Completed,
            error_message: None,
        }
    }

    /// Set the other device's name.
    #[must_use]
    pub fn with_peer(mut self, name: impl Into<String>) -> Self {
        self.peer_name = Some(name.into());
        self
    }

    /// Set the local file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set sizes and duration.
    #[must_use]
    pub const fn with_stats(mut self, total_bytes: u64, bytes_transferred: u64, duration_ms: u64) -> Self {
        self.total_bytes = total_bytes;
        self.bytes_transferred = bytes_transferred;
        self.duration_ms = duration_ms;
        self
    }

    /// Record whether a checksum matched.
    #[must_use]
    pub const fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    /// Set the outcome.
    #[must_use]
    pub const fn with_outcome(mut self, outcome: TransferOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Mark as failed with `message`.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self.outcome = TransferOutcome::Failed;
        self
    }

    /// Average speed in bytes per second.
    #[must_use]
    pub fn speed_bps(&self) -> Option<u64> {
        (self.duration_ms > 0).then(|| self.bytes_transferred.saturating_mul(1000) / self.duration_ms)
    }

    /// Local time as "YYYY-MM-DD HH:MM".
    #[must_use]
    pub fn formatted_timestamp(&self) -> String {
        use chrono::{DateTime, Local};
        i64::try_from(self.timestamp)
            .ok()
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map_or_else(
                || "Unknown".to_string(),
                |dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            )
    }
}

/// Aggregates over the stored entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStatistics {
    /// Shared videos
    pub sent: usize,
    /// Received videos
    pub received: usize,
    /// Completed transfers
    pub completed: usize,
    /// Failed or cancelled transfers
    pub unsuccessful: usize,
    /// Bytes moved by all transfers
    pub bytes_transferred: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    entries: Vec<HistoryEntry>,
}

/// Persistent history.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
    config: HistoryConfig,
}

impl HistoryStore {
    /// Open the store at the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing store cannot be read.
    pub fn load(config: HistoryConfig) -> Result<Self> {
        let path = Self::default_path().unwrap_or_else(|| PathBuf::from("history.json"));
        Self::load_from(path, config)
    }

    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: impl Into<PathBuf>, config: HistoryConfig) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                entries: Vec::new(),
                config,
            });
        }

        let file = fs::File::open(&path).map_err(|e| {
            Error::ConfigError(format!("Failed to open history at {}: {e}", path.display()))
        })?;
        let stored: HistoryFile = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            Error::ConfigError(format!("Failed to parse history at {}: {e}", path.display()))
        })?;

        let mut entries = stored.entries;
        entries.truncate(config.max_entries);
        Ok(Self {
            path,
            entries,
            config,
        })
    }

    /// Default store location in the platform data directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vidshare", "VidShare")
            .map(|dirs| dirs.data_dir().join("history.json"))
    }

    /// File backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a transfer and persist.
    ///
    /// Does nothing when history is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn add(&mut self, entry: HistoryEntry) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        self.entries.insert(0, entry);
        self.entries.truncate(self.config.max_entries);
        self.save()
    }

    /// Newest entries first, at most `limit`.
    #[must_use]
    pub fn list(&self, limit: Option<usize>) -> &[HistoryEntry] {
        let n = limit.unwrap_or(self.entries.len()).min(self.entries.len());
        &self.entries[..n]
    }

    /// Entries in one direction, newest first.
    pub fn filter(&self, direction: TransferDirection) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(move |e| e.direction == direction)
    }

    /// Totals over all entries.
    #[must_use]
    pub fn statistics(&self) -> HistoryStatistics {
        self.entries
            .iter()
            .fold(HistoryStatistics::default(), |mut stats, e| {
                match e.direction {
                    TransferDirection::Sent => stats.sent += 1,
                    TransferDirection::Received => stats.received += 1,
                }
                if e.outcome == TransferOutcome::Completed {
                    stats.completed += 1;
                } else {
                    stats.unsuccessful += 1;
                }
                stats.bytes_transferred += e.bytes_transferred;
                stats
            })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!(
                    "Failed to create history directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let file = fs::File::create(&self.path).map_err(|e| {
            Error::ConfigError(format!("Failed to write history at {}: {e}", self.path.display()))
        })?;
        let stored = HistoryFile {
            version: FORMAT_VERSION,
            entries: self.entries.clone(),
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &stored)?;
        Ok(())
    }
}
