//! VidShare CLI - Send a video to a nearby device
//!
//! The sender serves the file over local HTTP and prints a scannable
//! descriptor; the receiver downloads, resumes and verifies it.
//!
//! ## Quick Start
//!
//! ```bash
//! # Share a video
//! vidshare share ./holiday.mp4
//!
//! # Receive it (on another device)
//! vidshare receive @descriptor.json -o ~/Videos
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]
#![allow(clippy::cast_precision_loss)]

use anyhow::Result;
use clap::Parser;

mod commands;
pub mod ui;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Command::Share(args) => commands::share::run(args).await,
        Command::Receive(args) => commands::receive::run(args).await,
        Command::Inspect(args) => commands::inspect::run(args).await,
        Command::Checksum(args) => commands::checksum::run(args).await,
        Command::History(args) => commands::history::run(args).await,
        Command::Config(args) => commands::config::run(args).await,
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "info,vidshare=debug,vidshare_core=debug"
    } else {
        "warn,vidshare=info,vidshare_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
