//! Collaborators at the edges of a transfer.
//!
//! - [`DeviceIdentity`] names the sending device inside descriptors.
//! - [`ReceivedFileSink`] takes ownership of a verified download.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::config::GeneralConfig;
use crate::error::Result;

/// Supplies the name and platform advertised to receivers.
pub trait DeviceIdentity: Send + Sync + std::fmt::Debug {
    /// Human-readable device name.
    fn device_name(&self) -> String;

    /// Platform identifier (e.g. "linux", "android").
    fn platform(&self) -> String;
}

/// Identity derived from the host system.
///
/// The name comes from configuration when set, then the hostname, then a
/// generated `VidShare_Device_<digits>` fallback.
#[derive(Debug, Clone)]
pub struct HostIdentity {
    name: String,
    platform: String,
}

impl HostIdentity {
    /// Detect the identity of this machine.
    #[must_use]
    pub fn detect() -> Self {
        Self::with_name(None)
    }

    /// Identity honouring a configured device name.
    #[must_use]
    pub fn from_config(config: &GeneralConfig) -> Self {
        Self::with_name(config.device_name.clone())
    }

    fn with_name(name: Option<String>) -> Self {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                hostname::get()
                    .ok()
                    .map(|h| h.to_string_lossy().into_owned())
                    .filter(|h| !h.is_empty())
            })
            .unwrap_or_else(fallback_name);

        Self {
            name,
            platform: std::env::consts::OS.to_string(),
        }
    }
}

impl DeviceIdentity for HostIdentity {
    fn device_name(&self) -> String {
        self.name.clone()
    }

    fn platform(&self) -> String {
        self.platform.clone()
    }
}

fn fallback_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("VidShare_Device_{:04}", millis % 10_000)
}

/// Receives a verified download and decides where it finally lives.
#[async_trait]
pub trait ReceivedFileSink: Send + Sync {
    /// Take ownership of `path`, returning its final location.
    async fn accept(&self, path: &Path, suggested_name: &str) -> Result<PathBuf>;
}

/// Leaves downloads where they were written.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepInPlace;

#[async_trait]
impl ReceivedFileSink for KeepInPlace {
    async fn accept(&self, path: &Path, _suggested_name: &str) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}

/// Moves downloads into a directory under their suggested name.
///
/// An existing file is never overwritten; a numeric suffix is added
/// instead (`clip (1).mp4`).
#[derive(Debug, Clone)]
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    /// Sink into `directory`, created on first use.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    async fn free_path(&self, name: &str) -> PathBuf {
        let candidate = self.directory.join(name);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }

        let as_path = Path::new(name);
        let stem = as_path
            .file_stem()
            .map_or_else(|| name.to_string(), |s| s.to_string_lossy().into_owned());
        let ext = as_path.extension().map(|e| e.to_string_lossy().into_owned());

        let mut n = 1u32;
        loop {
            let file_name = ext
                .as_ref()
                .map_or_else(|| format!("{stem} ({n})"), |ext| format!("{stem} ({n}).{ext}"));
            let candidate = self.directory.join(file_name);
            if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[async_trait]
impl ReceivedFileSink for DirectorySink {
    async fn accept(&self, path: &Path, suggested_name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.directory).await?;

        if path.parent() == Some(self.directory.as_path())
            && path.file_name().and_then(|n| n.to_str()) == Some(suggested_name)
        {
            return Ok(path.to_path_buf());
        }

        let target = self.free_path(suggested_name).await;
        if tokio::fs::rename(path, &target).await.is_err() {
            tokio::fs::copy(path, &target).await?;
            tokio::fs::remove_file(path).await?;
        }
        tracing::info!(from = %path.display(), to = %target.display(), "Stored received video");
        Ok(target)
    }
}
