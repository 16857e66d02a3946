//! Terminal rendering of WhatsApp pairing QR codes.

use qrcode::render::unicode::Dense1x2;
use qrcode::QrCode;

/// Renders a QR payload as half-block text, quiet zone included.
///
/// Returns `None` for an empty payload or one too large to encode.
pub fn render_qr(payload: &str) -> Option<String> {
    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }

    let code = QrCode::new(payload.as_bytes()).ok()?;
    Some(code.render::<Dense1x2>().quiet_zone(true).build())
}
