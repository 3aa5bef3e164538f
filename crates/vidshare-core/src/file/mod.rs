//! File helpers for VidShare.
//!
//! This module handles:
//! - MIME type inference for served files
//! - Human-readable size formatting
//! - Turning share titles into safe local file names

use std::path::Path;

/// Video container types that are advertised with a specific MIME type
/// regardless of what the system MIME database says.
const VIDEO_MIME_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("m4v", "video/x-m4v"),
    ("3gp", "video/3gpp"),
    ("flv", "video/x-flv"),
    ("wmv", "video/x-ms-wmv"),
];

/// Infer the MIME type for a file from its extension.
///
/// Known video containers map to fixed types; anything else falls back to
/// `mime_guess`, and finally to `application/octet-stream`.
///
/// # Example
///
/// ```
/// use vidshare_core::file::mime_type_for;
///
/// assert_eq!(mime_type_for("clip.MOV"), "video/quicktime");
/// assert_eq!(mime_type_for("notes"), "application/octet-stream");
/// ```
#[must_use]
pub fn mime_type_for(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    if let Some(ext) = ext.as_deref() {
        if let Some((_, mime)) = VIDEO_MIME_TYPES.iter().find(|(e, _)| *e == ext) {
            return (*mime).to_string();
        }
    }

    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Format a file size for display.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Size in megabytes rounded to two decimals, as reported by `/info`.
#[must_use]
pub fn size_in_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Build a file name that is safe to create in a local directory.
///
/// Path separators and control characters are replaced, leading dots are
/// stripped so the result is never hidden or a parent reference, and the
/// extension of `source_path` is appended when the title lacks one.
#[must_use]
pub fn safe_file_name(title: &str, source_path: &str) -> String {
    let mut name: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    name = name.trim().trim_start_matches('.').to_string();

    if name.is_empty() {
        name = "video".to_string();
    }

    let source_ext = Path::new(source_path.rsplit(['/', '\\']).next().unwrap_or(source_path))
        .extension()
        .and_then(|e| e.to_str());

    match source_ext {
        Some(ext) if Path::new(&name).extension().and_then(|e| e.to_str()) != Some(ext) => {
            format!("{name}.{ext}")
        }
        _ => name,
    }
}
