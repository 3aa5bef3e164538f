//! Share command implementation.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast;

use vidshare_core::device::HostIdentity;
use vidshare_core::history::{HistoryEntry, TransferDirection};
use vidshare_core::qr;
use vidshare_core::server::ServeProgress;
use vidshare_core::session::{ShareRequest, ShareSessionManager, SharedSession};

use super::ShareArgs;
use crate::ui::{format_elapsed, format_speed, progress_line, ShareBox};

/// Run the share command.
pub async fn run(args: ShareArgs) -> Result<()> {
    let mut config = super::load_config();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let history_config = config.history.clone();

    let identity = Arc::new(HostIdentity::from_config(&config.general));
    let transport = super::transport(args.simulate_hotspot, &config);
    let manager = ShareSessionManager::new(config, transport, identity);

    if args.offline {
        let support = manager.offline_support();
        if !support.supported {
            bail!(
                "Offline sharing is not available: {}\n  Hint: try --simulate-hotspot or share over the current network",
                support.reason.unwrap_or_default()
            );
        }
    }

    let title = args.title.clone().unwrap_or_else(|| {
        args.file
            .file_stem()
            .map_or_else(|| "Video".to_string(), |s| s.to_string_lossy().into_owned())
    });

    let shared = manager
        .start_sharing(ShareRequest::new(&args.file, &title).offline(args.offline))
        .await
        .map_err(super::explain)?;

    let served = Arc::new(AtomicU64::new(0));
    let progress = tokio::spawn(track_progress(
        manager.subscribe_progress(),
        served.clone(),
        !args.json,
    ));

    // The share is torn down on every path from here on.
    let waited = match display_share(&shared, &args) {
        Ok(()) => tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C"),
        Err(e) => Err(e),
    };

    let status = manager.status().await;
    manager.stop_sharing().await;
    progress.abort();
    waited?;

    let video = &shared.descriptor.video;
    let entry = HistoryEntry::new(TransferDirection::Sent, &video.id, &video.title)
        .with_file(&args.file)
        .with_stats(
            video.file_size,
            served.load(Ordering::Relaxed),
            u64::try_from(status.uptime.as_millis()).unwrap_or(u64::MAX),
        )
        .with_verified(video.checksum.is_some());
    super::history::record(history_config, entry);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "status": "stopped",
                "sessionId": video.id,
                "requestCount": status.request_count,
                "uptimeMs": status.uptime.as_millis(),
            }))?
        );
    } else {
        println!();
        println!(
            "  Stopped after {} ({} request{})",
            format_elapsed(status.uptime),
            status.request_count,
            if status.request_count == 1 { "" } else { "s" }
        );
        println!();
    }

    Ok(())
}

/// Print the descriptor, link and QR code.
fn display_share(shared: &SharedSession, args: &ShareArgs) -> Result<()> {
    let descriptor = &shared.descriptor;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "status": "sharing",
                "link": descriptor.link(),
                "descriptor": descriptor,
            }))?
        );
        return Ok(());
    }

    println!();
    println!("VidShare v{}", vidshare_core::VERSION);
    println!("{}", "-".repeat(37));
    println!();

    let video = &descriptor.video;
    let mut share_box = ShareBox::new(&video.title, video.file_size, &video.server_url);
    if let Some(hotspot) = &descriptor.hotspot {
        share_box = share_box.with_network(&hotspot.ssid, &hotspot.password);
    }
    share_box.display();
    println!();

    if !args.no_qr {
        match qr::render_ascii(descriptor) {
            Ok(code) => println!("{code}"),
            Err(e) => tracing::warn!(error = %e, "Could not render QR code"),
        }
    }

    println!("  Link: {}", descriptor.link());
    println!("  Descriptor: {}", descriptor.to_json()?);
    println!();
    println!("  Press Ctrl+C to stop sharing");
    println!();
    Ok(())
}

/// Count bytes of finished responses, optionally rendering a progress line.
async fn track_progress(
    mut rx: broadcast::Receiver<ServeProgress>,
    served: Arc<AtomicU64>,
    display: bool,
) {
    loop {
        match rx.recv().await {
            Ok(progress) => {
                if display {
                    print!(
                        "\r  #{} {}  {}   ",
                        progress.request,
                        progress_line(progress.bytes_transferred, progress.total_bytes),
                        format_speed(progress.instantaneous_speed)
                    );
                    let _ = io::stdout().flush();
                }
                if progress.is_complete() {
                    served.fetch_add(progress.total_bytes, Ordering::Relaxed);
                    if display {
                        println!();
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress display fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
