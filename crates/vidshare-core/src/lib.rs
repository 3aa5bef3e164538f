//! # VidShare Core Library
//!
//! `vidshare-core` moves a single video file from one device to another
//! without a cloud intermediary. The sender serves the file over a local
//! HTTP server (optionally behind an ad-hoc hotspot) and advertises it
//! through a scannable share descriptor; the receiver decodes the
//! descriptor, downloads with resume support and verifies the result.
//!
//! ## Modules
//!
//! - [`descriptor`] - Share descriptor wire format and `app-share://` links
//! - [`checksum`] - SHA-256 digests and verification policy
//! - [`server`] - Single-file HTTP server with byte-range support
//! - [`hotspot`] - Ad-hoc access point control behind [`hotspot::NearbyTransport`]
//! - [`session`] - One active outbound share at a time
//! - [`client`] - Resumable, verifying download client
//! - [`config`] - Configuration management
//! - [`device`] - Device identity and received-file handoff
//! - [`history`] - Transfer history tracking and persistence
//! - [`qr`] - QR rendering of share descriptors
//! - [`mod@file`] - File helpers (MIME types, size formatting)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vidshare_core::config::Config;
//! use vidshare_core::device::HostIdentity;
//! use vidshare_core::hotspot::SimulatedTransport;
//! use vidshare_core::session::{ShareRequest, ShareSessionManager};
//!
//! let config = Config::load()?;
//! let identity = Arc::new(HostIdentity::from_config(&config.general));
//! let manager = ShareSessionManager::new(config, Arc::new(SimulatedTransport::new()), identity);
//!
//! let shared = manager.start_sharing(ShareRequest::new("clip.mp4", "Holiday")).await?;
//! println!("{}", shared.descriptor.to_json()?);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod checksum;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod file;
pub mod history;
pub mod hotspot;
pub mod qr;
pub mod server;
pub mod session;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Descriptor `schemaType` accepted by the codec
pub const DESCRIPTOR_SCHEMA_TYPE: &str = "video_share";

/// Descriptor `schemaVersion` accepted by the codec
pub const DESCRIPTOR_SCHEMA_VERSION: &str = "1.0";

/// URL scheme for intra-app share links
pub const SHARE_LINK_SCHEME: &str = "app-share";

/// Default first port tried by the file server
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default number of successive ports tried before giving up
pub const DEFAULT_PORT_ATTEMPTS: u16 = 20;

/// Default route the video is served under
pub const DEFAULT_VIDEO_ROUTE: &str = "video";

/// Default chunk size for download progress reporting (256 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Default SSID prefix for generated hotspots
pub const DEFAULT_SSID_PREFIX: &str = "VidShare";

/// Length of generated hotspot passwords
pub const HOTSPOT_PASSWORD_LENGTH: usize = 12;
