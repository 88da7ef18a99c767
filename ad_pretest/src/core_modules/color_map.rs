// THEORY:
// The colour mapper renders the fused saliency map as a translucent overlay. The palette
// is a blue → green → red ramp declared as three stops; each value is linearly
// interpolated inside its segment. Opacity follows saliency (`v * 180`), so quiet areas
// are almost invisible and hot spots stay see-through enough to show the creative below.

use crate::core_modules::saliency_map::SaliencyMap;
use image::{Rgba, RgbaImage};

/// A palette stop: saliency position and the RGB colour at that position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteStop {
    pub position: f64,
    pub rgb: [f64; 3],
}

pub const PALETTE: [PaletteStop; 3] = [
    PaletteStop {
        position: 0.0,
        rgb: [0.0, 0.0, 255.0],
    },
    PaletteStop {
        position: 0.5,
        rgb: [0.0, 255.0, 0.0],
    },
    PaletteStop {
        position: 1.0,
        rgb: [255.0, 0.0, 0.0],
    },
];

/// Alpha reached at saliency 1.0.
pub const ALPHA_SCALE: f64 = 180.0;

/// Maps one saliency value to an overlay pixel. Interpolation runs in f64.
pub fn color_for(value: f32) -> Rgba<u8> {
    let v = if value.is_nan() { 0.0 } else { f64::from(value).clamp(0.0, 1.0) };

    let (lower, upper) = if v <= PALETTE[1].position {
        (PALETTE[0], PALETTE[1])
    } else {
        (PALETTE[1], PALETTE[2])
    };
    let t = (v - lower.position) / (upper.position - lower.position);

    let channel = |i: usize| {
        let c = lower.rgb[i] + (upper.rgb[i] - lower.rgb[i]) * t;
        c.round().clamp(0.0, 255.0) as u8
    };
    let alpha = (v * ALPHA_SCALE).clamp(0.0, 255.0) as u8;

    Rgba([channel(0), channel(1), channel(2), alpha])
}

/// Renders the whole map as an RGBA heatmap image.
pub fn render(map: &SaliencyMap) -> RgbaImage {
    let mut raw = Vec::with_capacity(map.values.len() * 4);
    for &value in &map.values {
        raw.extend_from_slice(&color_for(value).0);
    }
    RgbaImage::from_raw(map.width, map.height, raw)
        .unwrap_or_else(|| RgbaImage::new(map.width, map.height))
}
