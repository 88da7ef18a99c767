// THEORY:
// The metrics stage reduces the creative and its fused saliency map to the scalar
// signals the scorer consumes:
//
// 1.  **Contrast ratio**: WCAG relative luminance sampled on a square grid. The stride
//     grows with image area (`max(4, floor(sqrt(W·H / 5000)))`), bounding the sample
//     count near 5000 for large creatives. The ratio of the brightest to the darkest
//     sample, `(max + 0.05) / (min + 0.05)`, is clamped to the WCAG range [1, 21].
// 2.  **Saliency focus**: the share of total saliency that falls inside the placement's
//     safe area. The feed box covers the middle 70% on both axes.
// 3.  **Visual noise**: mean fused saliency, clamped to [0, 1].
// 4.  **Text words**: passed through from the OCR collaborator.

use crate::core_modules::pixel_buffer::pixel_buffer::PixelBuffer;
use crate::core_modules::saliency_map::SaliencyMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_SAMPLE_STEP: u32 = 4;
pub const TARGET_SAMPLES: f64 = 5000.0;
pub const MIN_CONTRAST_RATIO: f64 = 1.0;
pub const MAX_CONTRAST_RATIO: f64 = 21.0;
const LUMINANCE_FLARE: f64 = 0.05;

/// Where the creative will run. Each placement has its own safe area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Feed,
    Story,
    Square,
}

impl Placement {
    /// Safe-area fractions as `(x0, x1, y0, y1)`.
    pub fn safe_area_fractions(self) -> (f64, f64, f64, f64) {
        match self {
            Placement::Feed => (0.15, 0.85, 0.15, 0.85),
            // Story UI bars sit at the top and bottom.
            Placement::Story => (0.10, 0.90, 0.15, 0.85),
            Placement::Square => (0.10, 0.90, 0.10, 0.90),
        }
    }

    /// The safe area in pixels as half-open ranges `[x0, x1) × [y0, y1)`.
    pub fn safe_area(self, width: u32, height: u32) -> SafeArea {
        let (fx0, fx1, fy0, fy1) = self.safe_area_fractions();
        let scale = |fraction: f64, extent: u32| (extent as f64 * fraction).floor() as usize;
        SafeArea {
            x0: scale(fx0, width),
            x1: scale(fx1, width),
            y0: scale(fy0, height),
            y1: scale(fy1, height),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Placement::Feed => "feed",
            Placement::Story => "story",
            Placement::Square => "square",
        };
        f.write_str(name)
    }
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feed" => Ok(Placement::Feed),
            "story" => Ok(Placement::Story),
            "square" => Ok(Placement::Square),
            other => Err(format!("unknown placement `{other}` (expected feed, story or square)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeArea {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
}

impl SafeArea {
    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// The scalar signals of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub saliency_focus_ratio: f64,
    pub text_words: u32,
    pub visual_noise: f64,
    pub contrast_ratio: f64,
}

/// Extracts all metrics. `contrast_ratio` is already clamped to [1, 21].
pub fn extract(pixels: &PixelBuffer, fused: &SaliencyMap, text_words: u32, placement: Placement) -> Metrics {
    Metrics {
        saliency_focus_ratio: focus_ratio(fused, placement),
        text_words,
        visual_noise: visual_noise(fused),
        contrast_ratio: contrast_ratio(pixels).clamp(MIN_CONTRAST_RATIO, MAX_CONTRAST_RATIO),
    }
}

/// Grid stride for contrast sampling.
pub fn sample_step(width: u32, height: u32) -> u32 {
    let area = width as f64 * height as f64;
    let step = (area / TARGET_SAMPLES).sqrt().floor() as u32;
    step.max(MIN_SAMPLE_STEP)
}

/// Unclamped WCAG contrast ratio between the brightest and darkest sampled pixels.
pub fn contrast_ratio(pixels: &PixelBuffer) -> f64 {
    let step = sample_step(pixels.width(), pixels.height()) as usize;
    let mut min_luminance = f64::INFINITY;
    let mut max_luminance = f64::NEG_INFINITY;

    for y in (0..pixels.height()).step_by(step) {
        for x in (0..pixels.width()).step_by(step) {
            let luminance = pixels.pixel(x, y).relative_luminance();
            min_luminance = min_luminance.min(luminance);
            max_luminance = max_luminance.max(luminance);
        }
    }

    if !min_luminance.is_finite() || !max_luminance.is_finite() {
        return MIN_CONTRAST_RATIO;
    }
    (max_luminance + LUMINANCE_FLARE) / (min_luminance + LUMINANCE_FLARE)
}

/// Share of saliency inside the placement's safe area; 0 when the map is all zero.
pub fn focus_ratio(map: &SaliencyMap, placement: Placement) -> f64 {
    let area = placement.safe_area(map.width, map.height);
    let width = map.width as usize;
    let mut sum_all = 0.0f64;
    let mut sum_center = 0.0f64;

    for (i, &value) in map.values.iter().enumerate() {
        let value = value as f64;
        sum_all += value;
        if area.contains(i % width, i / width) {
            sum_center += value;
        }
    }

    if sum_all <= 0.0 {
        return 0.0;
    }
    (sum_center / sum_all).clamp(0.0, 1.0)
}

/// Mean fused saliency clamped to [0, 1].
pub fn visual_noise(map: &SaliencyMap) -> f64 {
    map.mean().clamp(0.0, 1.0)
}
