//! Receive command implementation.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::watch;

use vidshare_core::client::{DownloadState, DownloadStatus, TransferClient};
use vidshare_core::device::DirectorySink;
use vidshare_core::file::format_size;
use vidshare_core::history::{HistoryEntry, TransferDirection, TransferOutcome};
use vidshare_core::Error;

use super::ReceiveArgs;
use crate::ui::{format_elapsed, format_speed, progress_line};

/// Run the receive command.
pub async fn run(args: ReceiveArgs) -> Result<()> {
    let config = super::load_config();
    let raw = super::read_descriptor_input(&args.descriptor).await?;

    let output_dir = args
        .output
        .clone()
        .or_else(|| config.general.download_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let transport = super::transport(args.simulate_hotspot, &config);
    let client = Arc::new(
        TransferClient::new(&config, transport)
            .map_err(super::explain)?
            .with_sink(Arc::new(DirectorySink::new(&output_dir))),
    );
    let descriptor = client.accept_descriptor(&raw).map_err(super::explain)?;
    let video = &descriptor.video;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "status": "connecting",
                "title": video.title,
                "size": video.file_size,
                "sender": descriptor.sender_device.name,
            }))?
        );
    } else {
        println!();
        println!("VidShare v{}", vidshare_core::VERSION);
        println!("{}", "-".repeat(37));
        println!();
        println!(
            "  Receiving \"{}\" ({}) from {}",
            video.title,
            format_size(video.file_size),
            descriptor.sender_device.name
        );
        if let Some(hotspot) = &descriptor.hotspot {
            println!("  Joining Wi-Fi network {}...", hotspot.ssid);
        }
        println!();
    }

    // Partial downloads are keyed by session so re-running resumes.
    let partial = output_dir.join(format!(".{}.part", video.id));

    let display = (!args.json).then(|| tokio::spawn(display_progress(client.subscribe())));
    let interrupt = {
        let client = client.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                client.cancel(false).await;
            }
        })
    };

    let started = Instant::now();
    let result = client.download(&descriptor, &partial).await;
    interrupt.abort();
    if let Some(handle) = display {
        let _ = handle.await;
    }
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let entry = HistoryEntry::new(TransferDirection::Received, &video.id, &video.title)
        .with_peer(&descriptor.sender_device.name);

    match result {
        Ok(done) => {
            super::history::record(
                config.history,
                entry
                    .with_file(&done.path)
                    .with_stats(video.file_size, done.bytes - done.resumed_from, elapsed_ms)
                    .with_verified(done.verification.is_verified()),
            );

            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "status": "completed",
                        "path": done.path.display().to_string(),
                        "bytes": done.bytes,
                        "resumedFrom": done.resumed_from,
                        "verified": done.verification.is_verified(),
                    }))?
                );
            } else {
                println!();
                println!("  Saved to {}", done.path.display());
                if done.verification.is_verified() {
                    println!("  Checksum verified");
                }
                println!("  Took {}", format_elapsed(done.elapsed));
                println!();
            }
            Ok(())
        }
        Err(e) => {
            let written = client.state().bytes_written;
            let outcome = if matches!(e, Error::Cancelled) {
                TransferOutcome::Cancelled
            } else {
                TransferOutcome::Failed
            };
            super::history::record(
                config.history,
                entry
                    .with_stats(video.file_size, written, elapsed_ms)
                    .with_error(e.to_string())
                    .with_outcome(outcome),
            );

            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "status": "failed",
                        "error": e.to_string(),
                        "code": e.code(),
                        "resumable": e.is_recoverable(),
                    }))?
                );
            }
            if e.is_recoverable() && !args.json {
                eprintln!();
                eprintln!("  Partial download kept; run the same command again to resume.");
            }
            Err(super::explain(e))
        }
    }
}

/// Render download state until it reaches a terminal status.
async fn display_progress(mut rx: watch::Receiver<DownloadState>) {
    let started = Instant::now();
    let mut last_status = DownloadStatus::Idle;

    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();

        if state.status != last_status {
            match state.status {
                DownloadStatus::Connecting => println!("  Connecting..."),
                DownloadStatus::Verifying => println!("\n  Verifying checksum..."),
                _ => {}
            }
            last_status = state.status;
        }

        if state.status == DownloadStatus::Downloading {
            let elapsed = started.elapsed().as_secs_f64();
            let speed = if elapsed > 0.0 {
                state.bytes_written as f64 / elapsed
            } else {
                0.0
            };
            print!(
                "\r  {}  {}   ",
                progress_line(state.bytes_written, state.total_bytes),
                format_speed(speed)
            );
            let _ = io::stdout().flush();
        }

        if state.status.is_terminal() {
            break;
        }
    }
}
