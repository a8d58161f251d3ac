//! Decoding of pipeline payloads into PNG bytes for the chat.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::Cursor;
use tracing::debug;

use crate::errors::ImageError;

/// Decode a base64 image payload and re-encode it as PNG
pub fn decode_to_png(payload: &str) -> Result<Vec<u8>, ImageError> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    let format = image::guess_format(&bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    debug!(
        source_format = ?format,
        width = img.width(),
        height = img.height(),
        png_bytes = png.len(),
        "Re-encoded generated image"
    );
    Ok(png)
}
