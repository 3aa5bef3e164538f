//! Configuration management for VidShare.
//!
//! This module handles loading, saving, and managing VidShare configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/vidshare/config.toml` |
//! | macOS | `~/Library/Application Support/com.vidshare.VidShare/config.toml` |
//! | Windows | `%APPDATA%\vidshare\VidShare\config\config.toml` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use vidshare_core::config::Config;
//!
//! let config = Config::load()?;
//! println!("Serving on port {}", config.server.port);
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::checksum::ChecksumPolicy;
use crate::error::{Error, Result};

/// Main configuration struct for VidShare.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// File server settings
    pub server: ServerSettings,
    /// Hotspot settings
    pub hotspot: HotspotSettings,
    /// Download settings
    pub transfer: TransferConfig,
    /// History settings
    pub history: HistoryConfig,
}

/// General configuration options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Name shown to receivers (detected from the hostname when unset)
    pub device_name: Option<String>,
    /// Directory received videos are moved into
    pub download_dir: Option<PathBuf>,
}

/// File server configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// First port to try
    pub port: u16,
    /// Number of successive ports to try
    pub port_attempts: u16,
    /// Upper bound on each bind attempt
    #[serde(with = "humantime_serde")]
    pub bind_timeout: Duration,
    /// Interface to listen on
    pub bind_address: IpAddr,
    /// Host written into share URLs (detected when unset)
    pub host: Option<String>,
    /// Path segment the video is served under
    pub video_route: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_SERVER_PORT,
            port_attempts: crate::DEFAULT_PORT_ATTEMPTS,
            bind_timeout: Duration::from_secs(5),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            host: None,
            video_route: crate::DEFAULT_VIDEO_ROUTE.to_string(),
        }
    }
}

/// Hotspot configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotSettings {
    /// Prefix for generated SSIDs
    pub ssid_prefix: String,
    /// Upper bound on creating an access point
    #[serde(with = "humantime_serde")]
    pub create_timeout: Duration,
    /// Pause after joining an access point before the first request
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Wireless interface to use (NetworkManager default when unset)
    pub interface: Option<String>,
}

impl Default for HotspotSettings {
    fn default() -> Self {
        Self {
            ssid_prefix: crate::DEFAULT_SSID_PREFIX.to_string(),
            create_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(3),
            interface: None,
        }
    }
}

/// Download configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes between progress reports
    pub chunk_size: usize,
    /// Upper bound on establishing a connection
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Upper bound on waiting for the next piece of the body
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Compute a checksum when sharing
    pub compute_checksum: bool,
    /// What to do when a checksum cannot be computed
    pub checksum_policy: ChecksumPolicy,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            compute_checksum: true,
            checksum_policy: ChecksumPolicy::Strict,
        }
    }
}

/// History configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Enable transfer history
    pub enabled: bool,
    /// Maximum history entries
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to the default location.
    ///
    /// Creates the configuration directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        std::fs::write(path, self.to_toml()?)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Render as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vidshare", "VidShare")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

/// Durations as "300ms", "30s" or "5m" strings.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.trim();
        let parse = |digits: &str| digits.trim().parse::<u64>().map_err(serde::de::Error::custom);

        if let Some(ms) = s.strip_suffix("ms") {
            parse(ms).map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            parse(secs).map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            parse(mins).map(|m| Duration::from_secs(m * 60))
        } else {
            Err(serde::de::Error::custom("invalid duration format"))
        }
    }
}
