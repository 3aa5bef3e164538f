//! QR rendering of share descriptors.
//!
//! The QR payload is the descriptor JSON itself, so a receiver can decode
//! it without contacting anything first.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vidshare_core::qr;
//!
//! let ascii = qr::render_ascii(&shared.descriptor)?;
//! println!("{ascii}");
//! ```

use qrcode::render::{svg, unicode};
use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode};

use crate::descriptor::ShareDescriptor;
use crate::error::{Error, Result};

/// Encode `payload`, dropping to low error correction when it does not fit.
fn encode(payload: &str) -> Result<QrCode> {
    match QrCode::with_error_correction_level(payload, EcLevel::M) {
        Err(QrError::DataTooLong) => QrCode::with_error_correction_level(payload, EcLevel::L),
        other => other,
    }
    .map_err(|e| Error::Internal(format!("Failed to generate QR code: {e}")))
}

/// Render arbitrary text as a terminal QR code.
///
/// Uses Unicode half blocks, two modules per character row.
///
/// # Errors
///
/// Returns an error if the text is too long for a QR code.
pub fn ascii_for(payload: &str) -> Result<String> {
    Ok(encode(payload)?
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}

/// Render arbitrary text as an SVG document.
///
/// # Errors
///
/// Returns an error if the text is too long for a QR code.
pub fn svg_for(payload: &str) -> Result<String> {
    Ok(encode(payload)?
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// Terminal QR code of a descriptor's compact JSON.
///
/// # Errors
///
/// Returns an error if serialization or encoding fails.
pub fn render_ascii(descriptor: &ShareDescriptor) -> Result<String> {
    ascii_for(&descriptor.to_json()?)
}

/// SVG QR code of a descriptor's compact JSON.
///
/// # Errors
///
/// Returns an error if serialization or encoding fails.
pub fn render_svg(descriptor: &ShareDescriptor) -> Result<String> {
    svg_for(&descriptor.to_json()?)
}
