//! QR image rendering.
//!
//! Encodes a string into a QR symbol and rasterizes it as a grayscale PNG.
//! Rendering is a pure function of `(content, options)`: the same input
//! always yields byte-identical output, which is what lets the artifact
//! store regenerate lost files without coordination.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};
use serde::Serialize;

use crate::error::CoreError;

/// Byte-mode capacity of a version 40 symbol at the lowest error correction.
pub const MAX_PAYLOAD_BYTES: usize = 2953;

/// Error correction levels tried in order. Larger payloads fall back to
/// lower correction (and thus higher density) before giving up.
const EC_LEVELS: [EcLevel; 2] = [EcLevel::M, EcLevel::L];

/// Default rendered width in pixels.
pub const DEFAULT_WIDTH: u32 = 512;

/// Default quiet zone in modules.
pub const DEFAULT_MARGIN: u32 = 1;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderOptions {
    /// Target image width in pixels. The output is the largest whole-pixel
    /// module scale that fits, and never less than one pixel per module.
    pub width: u32,
    /// Quiet zone around the symbol, in modules.
    pub margin: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            margin: DEFAULT_MARGIN,
        }
    }
}

/// Encode `content` into a QR symbol, degrading error correction as needed.
fn encode(content: &str) -> Result<QrCode, CoreError> {
    for level in EC_LEVELS {
        match QrCode::with_error_correction_level(content.as_bytes(), level) {
            Ok(code) => return Ok(code),
            Err(QrError::DataTooLong) => continue,
            Err(e) => return Err(CoreError::Internal(format!("QR encoding failed: {e}"))),
        }
    }
    Err(CoreError::PayloadTooLarge {
        len: content.len(),
        max: MAX_PAYLOAD_BYTES,
    })
}

/// Render `content` as PNG bytes.
pub fn render_png(content: &str, opts: RenderOptions) -> Result<Vec<u8>, CoreError> {
    let code = encode(content)?;
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let span = modules + 2 * opts.margin;
    let scale = (opts.width / span).max(1);
    let size = span * scale;
    let margin = opts.margin;

    let img = GrayImage::from_fn(size, size, |x, y| {
        let (mx, my) = (x / scale, y / scale);
        if mx < margin || my < margin || mx >= margin + modules || my >= margin + modules {
            return LIGHT;
        }
        let idx = ((my - margin) * modules + (mx - margin)) as usize;
        match colors[idx] {
            Color::Dark => DARK,
            Color::Light => LIGHT,
        }
    });

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| CoreError::Internal(format!("PNG encoding failed: {e}")))?;
    Ok(buf)
}
