//! Pixel storage behind `<canvas>` elements and its data-URL export.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};

use crate::error::{DomError, DomResult};

/// Default intrinsic size of a canvas element
pub const DEFAULT_WIDTH: u32 = 300;
pub const DEFAULT_HEIGHT: u32 = 150;

/// Largest side length a canvas bitmap may have
pub const MAX_SIDE: u32 = 32_767;
/// Largest pixel count a canvas bitmap may have
pub const MAX_AREA: u64 = 268_435_456;

/// Byte length of an RGBA8 bitmap, or `None` when the size exceeds
/// [`MAX_SIDE`] or [`MAX_AREA`].
fn bitmap_len(width: u32, height: u32) -> Option<usize> {
    if width > MAX_SIDE || height > MAX_SIDE {
        return None;
    }
    let area = u64::from(width).checked_mul(u64::from(height))?;
    if area > MAX_AREA {
        return None;
    }
    usize::try_from(area).ok()?.checked_mul(4)
}

/// RGBA8 bitmap of a canvas element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    /// A transparent canvas of the given size. A size the bitmap cannot
    /// hold yields a zero-area canvas, like a browser failing to allocate one.
    pub fn new(width: u32, height: u32) -> Self {
        match bitmap_len(width, height) {
            Some(len) => Self {
                width,
                height,
                pixels: vec![0; len],
            },
            None => {
                tracing::warn!(width, height, "canvas size exceeds bitmap limits");
                Self {
                    width: 0,
                    height: 0,
                    pixels: Vec::new(),
                }
            }
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Replace the bitmap. `pixels` must hold exactly `width * height` RGBA quads.
    pub fn set_pixels(&mut self, width: u32, height: u32, pixels: Vec<u8>) -> DomResult<()> {
        let expected = bitmap_len(width, height).ok_or_else(|| {
            DomError::ImageEncoding(format!("a {}x{} bitmap exceeds canvas limits", width, height))
        })?;
        if pixels.len() != expected {
            return Err(DomError::ImageEncoding(format!(
                "expected {} bytes for a {}x{} bitmap, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        self.width = width;
        self.height = height;
        self.pixels = pixels;
        Ok(())
    }

    /// Resizing a canvas clears it.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Canvas::new(width, height);
    }

    /// Encode the bitmap as an `image/png` data URL. A zero-area canvas
    /// yields `data:,`.
    pub fn to_data_url(&self) -> DomResult<String> {
        if self.width == 0 || self.height == 0 {
            return Ok("data:,".to_string());
        }

        let bitmap = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| DomError::ImageEncoding("bitmap size mismatch".to_string()))?;

        let mut png = Cursor::new(Vec::new());
        bitmap
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| DomError::ImageEncoding(e.to_string()))?;

        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner())))
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}
