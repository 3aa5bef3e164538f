//! History command implementation.

use anyhow::Result;

use vidshare_core::config::HistoryConfig;
use vidshare_core::file::format_size;
use vidshare_core::history::{HistoryEntry, HistoryStore};

use super::HistoryArgs;

/// Run the history command.
pub async fn run(args: HistoryArgs) -> Result<()> {
    let config = super::load_config();
    let mut store = HistoryStore::load(config.history).map_err(super::explain)?;

    if args.clear {
        store.clear().map_err(super::explain)?;
        if args.json {
            println!("{}", serde_json::json!({ "cleared": true }));
        } else {
            println!("  History cleared");
        }
        return Ok(());
    }

    let entries = store.list(args.limit);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "entries": entries,
                "statistics": store.statistics(),
            }))?
        );
        return Ok(());
    }

    if entries.is_empty() {
        println!("  No transfers recorded yet");
        return Ok(());
    }

    println!();
    for entry in entries {
        println!("  {}", summary_line(entry));
        if let Some(error) = &entry.error_message {
            println!("      {error}");
        }
    }

    let stats = store.statistics();
    println!();
    println!(
        "  {} sent, {} received, {} completed, {} moved",
        stats.sent,
        stats.received,
        stats.completed,
        format_size(stats.bytes_transferred)
    );
    println!();
    Ok(())
}

/// Record a transfer, logging instead of failing when the store is unusable.
pub fn record(config: HistoryConfig, entry: HistoryEntry) {
    match HistoryStore::load(config) {
        Ok(mut store) => {
            if let Err(e) = store.add(entry) {
                tracing::warn!(error = %e, "Failed to save history");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to load history"),
    }
}

fn summary_line(entry: &HistoryEntry) -> String {
    let peer = entry
        .peer_name
        .as_deref()
        .map(|p| format!(" ({p})"))
        .unwrap_or_default();
    format!(
        "{}  {:<8} {:<9} {}{}  {}",
        entry.formatted_timestamp(),
        entry.direction.to_string(),
        entry.outcome.to_string(),
        entry.title,
        peer,
        format_size(entry.total_bytes)
    )
}
