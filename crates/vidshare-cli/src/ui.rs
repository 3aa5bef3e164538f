//! UI utilities for the VidShare CLI.

use std::time::Duration;

use vidshare_core::file::format_size;

const BOX_WIDTH: usize = 45;

/// A framed summary of an active share.
pub struct ShareBox<'a> {
    title: &'a str,
    size: u64,
    url: &'a str,
    network: Option<(&'a str, &'a str)>,
}

impl<'a> ShareBox<'a> {
    /// Create a box for a share of `size` bytes served at `url`.
    #[must_use]
    pub const fn new(title: &'a str, size: u64, url: &'a str) -> Self {
        Self {
            title,
            size,
            url,
            network: None,
        }
    }

    /// Show the access point receivers must join.
    #[must_use]
    pub const fn with_network(mut self, ssid: &'a str, password: &'a str) -> Self {
        self.network = Some((ssid, password));
        self
    }

    /// Display the box to stdout.
    pub fn display(&self) {
        let heading = format!("{} ({})", truncate(self.title, BOX_WIDTH - 12), format_size(self.size));

        println!("  ┌{}┐", "─".repeat(BOX_WIDTH));
        println!("  │{}│", " ".repeat(BOX_WIDTH));
        println!("  │{}│", center_in_box(&heading, BOX_WIDTH));
        println!("  │{}│", center_in_box(&truncate(self.url, BOX_WIDTH - 2), BOX_WIDTH));
        println!("  │{}│", " ".repeat(BOX_WIDTH));

        if let Some((ssid, password)) = self.network {
            println!("  │{}│", center_in_box(&format!("Wi-Fi: {ssid}"), BOX_WIDTH));
            println!("  │{}│", center_in_box(&format!("Password: {password}"), BOX_WIDTH));
            println!("  │{}│", " ".repeat(BOX_WIDTH));
        }

        println!("  └{}┘", "─".repeat(BOX_WIDTH));
    }
}

fn center_in_box(content: &str, width: usize) -> String {
    let content_len = content.chars().count();
    let padding = width.saturating_sub(content_len);
    let left = padding / 2;
    let right = padding - left;
    format!("{}{}{}", " ".repeat(left), content, " ".repeat(right))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Format a transfer rate as "1.2 MB/s".
pub fn format_speed(bytes_per_sec: f64) -> String {
    if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
        return "-- B/s".to_string();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = bytes_per_sec as u64;
    format!("{}/s", format_size(whole))
}

/// One-line progress: `[#####.....]  50.0%  5.0 MB / 10.0 MB`.
pub fn progress_line(done: u64, total: u64) -> String {
    const BAR: usize = 20;
    let pct = if total == 0 {
        0.0
    } else {
        (done as f64 / total as f64 * 100.0).min(100.0)
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((pct / 100.0) * BAR as f64).round() as usize;
    format!(
        "[{}{}] {:5.1}%  {} / {}",
        "#".repeat(filled),
        ".".repeat(BAR - filled),
        pct,
        format_size(done),
        format_size(total)
    )
}

/// Format an elapsed duration as "M:SS".
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
