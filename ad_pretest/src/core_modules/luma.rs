// THEORY:
// The grayscale stage collapses the RGBA creative into a single luma byte per pixel.
// It is the only input the edge detector sees. The map is short-lived: it is built at
// the start of the saliency stage and dropped as soon as the edge magnitudes exist.

use crate::core_modules::pixel_buffer::pixel_buffer::PixelBuffer;

/// A `width × height` grid of truncated Rec. 601 luma values.
#[derive(Debug, Clone, PartialEq)]
pub struct LumaMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<u8>,
}

impl LumaMap {
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> u8 {
        self.values[y * self.width as usize + x]
    }
}

/// Converts every pixel to luma. Alpha is ignored.
pub fn to_luma(pixels: &PixelBuffer) -> LumaMap {
    LumaMap {
        width: pixels.width(),
        height: pixels.height(),
        values: pixels.pixels().map(|pixel| pixel.luma_byte()).collect(),
    }
}
