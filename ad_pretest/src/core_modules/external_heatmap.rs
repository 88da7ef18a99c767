// THEORY:
// An externally produced heatmap (e.g. from an eye-tracking service) arrives as an
// encoded image of arbitrary size and colour scheme. This stage makes it comparable to
// the internal saliency map:
//
// 1.  Decode the bytes.
// 2.  Stretch to exactly the creative's `W×H` (aspect ratio is not preserved).
// 3.  Read every pixel through Rec. 601 luma, keeping full precision.
// 4.  Min-max normalize to [0, 1], with an epsilon floor on the range so a flat
//     external image does not divide by zero.
//
// Every failure here is a `FetchError::Decode`; the pipeline treats it like a failed
// download and falls back to the internal map.

use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::saliency_map::SaliencyMap;
use crate::error::FetchError;
use image::DynamicImage;
use image::imageops::FilterType;

/// Smallest range used as the normalization denominator.
pub const MIN_RANGE: f32 = 1e-6;

/// Decodes and normalizes external heatmap bytes to a `width × height` map.
pub fn normalize_external(bytes: &[u8], width: u32, height: u32) -> Result<SaliencyMap, FetchError> {
    if bytes.is_empty() {
        return Err(FetchError::Decode("empty heatmap body".into()));
    }
    if width == 0 || height == 0 {
        return Err(FetchError::Decode(format!(
            "cannot resample heatmap to {width}x{height}"
        )));
    }
    let decoded = image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(normalize_image(&decoded, width, height))
}

/// Stretches an already decoded image to `width × height` and normalizes its luma.
pub fn normalize_image(image: &DynamicImage, width: u32, height: u32) -> SaliencyMap {
    let resized = image.resize_exact(width, height, FilterType::Triangle).to_rgba8();

    let mut values: Vec<f32> = resized
        .pixels()
        .map(|p| Pixel::from(&p.0[..]).luma() as f32)
        .collect();

    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = (max - min).max(MIN_RANGE);
    for value in &mut values {
        *value = (*value - min) / range;
    }

    SaliencyMap {
        width,
        height,
        values,
    }
}
