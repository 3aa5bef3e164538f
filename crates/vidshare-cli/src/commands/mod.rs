//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;

use vidshare_core::config::Config;
use vidshare_core::hotspot::{NearbyTransport, SimulatedTransport, SystemTransport};

pub mod checksum;
pub mod config;
pub mod history;
pub mod inspect;
pub mod receive;
pub mod share;

/// Load configuration with graceful fallback to defaults.
///
/// A missing or unreadable config file is not an error for any command.
pub fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Using default configuration");
        Config::default()
    })
}

/// Pick the radio backend for this run.
pub fn transport(simulate: bool, config: &Config) -> Arc<dyn NearbyTransport> {
    if simulate {
        return Arc::new(SimulatedTransport::new());
    }
    match &config.hotspot.interface {
        Some(interface) => Arc::new(SystemTransport::new().with_interface(interface)),
        None => Arc::new(SystemTransport::new()),
    }
}

/// Attach the library's actionable hint to an error.
pub fn explain(e: vidshare_core::Error) -> anyhow::Error {
    match e.suggestion() {
        Some(hint) => anyhow::anyhow!("{e}\n  Hint: {hint}"),
        None => anyhow::Error::new(e),
    }
}

/// Read a descriptor argument: literal JSON, `@path`, or `-` for stdin.
pub async fn read_descriptor_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("Failed to read descriptor from stdin")?;
        return Ok(raw);
    }

    if let Some(path) = input.strip_prefix('@') {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read descriptor from {path}"));
    }

    if vidshare_core::descriptor::parse_share_link(input).is_some() {
        bail!("Share links only resolve on the sharing device; pass the descriptor JSON instead");
    }

    Ok(input.to_string())
}

/// VidShare - Send a video to a nearby device
#[derive(Parser)]
#[command(name = "vidshare")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Share a video until interrupted
    Share(ShareArgs),

    /// Download a shared video
    Receive(ReceiveArgs),

    /// Decode and display a share descriptor
    Inspect(InspectArgs),

    /// Print the SHA-256 digest of a file
    Checksum(ChecksumArgs),

    /// View transfer history
    History(HistoryArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the share command
#[derive(Parser)]
pub struct ShareArgs {
    /// Video file to share
    pub file: PathBuf,

    /// Title shown to the receiver (defaults to the file name)
    #[arg(short, long)]
    pub title: Option<String>,

    /// Host a Wi-Fi access point for receivers without a shared network
    #[arg(long)]
    pub offline: bool,

    /// First port to try
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Use an in-memory radio instead of NetworkManager
    #[arg(long)]
    pub simulate_hotspot: bool,

    /// Don't print the QR code
    #[arg(long)]
    pub no_qr: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the receive command
#[derive(Parser)]
pub struct ReceiveArgs {
    /// Descriptor JSON, @file containing it, or - for stdin
    pub descriptor: String,

    /// Directory to store the video in
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Use an in-memory radio instead of NetworkManager
    #[arg(long)]
    pub simulate_hotspot: bool,
}

/// Arguments for the inspect command
#[derive(Parser)]
pub struct InspectArgs {
    /// Descriptor JSON, @file containing it, or - for stdin
    pub descriptor: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the checksum command
#[derive(Parser)]
pub struct ChecksumArgs {
    /// File to hash
    pub file: PathBuf,
}

/// Arguments for the history command
#[derive(Parser)]
pub struct HistoryArgs {
    /// Number of entries to show
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Clear history
    #[arg(long)]
    pub clear: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand (defaults to show)
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Reset to defaults
    Reset,
}
