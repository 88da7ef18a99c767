// THEORY:
// The `EdgeSaliency` stage is the engine's stand-in for a saliency model. It assumes the
// eye goes where local intensity changes are sharpest, and measures that with a 3x3
// Laplacian over the luma map.
//
// Algorithm:
// 1.  **Convolution**: every interior pixel (one pixel in from each border) is convolved
//     with `LAPLACIAN_KERNEL`. Border pixels have no full neighbourhood and stay 0.
// 2.  **Magnitude**: the sign of the second derivative is irrelevant for attention, so
//     each response is replaced by its absolute value.
// 3.  **Normalization**: every magnitude is divided by the global maximum, so the
//     strongest edge is exactly 1.0. A flat image has no edges and yields all zeros.
//
// This is a deliberate edge-density proxy, not a trained model.

use crate::core_modules::luma::{LumaMap, to_luma};
use crate::core_modules::pixel_buffer::pixel_buffer::PixelBuffer;
use crate::core_modules::saliency_map::SaliencyMap;

/// The 4-neighbour Laplacian.
pub const LAPLACIAN_KERNEL: [[i32; 3]; 3] = [[0, 1, 0], [1, -4, 1], [0, 1, 0]];

/// Grayscale conversion plus edge saliency. The luma map does not outlive this call.
pub fn internal_saliency(pixels: &PixelBuffer) -> SaliencyMap {
    let luma = to_luma(pixels);
    edge_saliency(&luma)
}

/// Absolute Laplacian response of every interior pixel, min-max normalized to [0, 1].
pub fn edge_saliency(luma: &LumaMap) -> SaliencyMap {
    let mut map = edge_magnitudes(luma);
    let max = map.max();
    if max > 0.0 {
        for value in &mut map.values {
            *value /= max;
        }
    }
    map
}

fn edge_magnitudes(luma: &LumaMap) -> SaliencyMap {
    let width = luma.width as usize;
    let height = luma.height as usize;
    let mut map = SaliencyMap::zeros(luma.width, luma.height);

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let mut response = 0i32;
            for (ky, row) in LAPLACIAN_KERNEL.iter().enumerate() {
                for (kx, &weight) in row.iter().enumerate() {
                    if weight == 0 {
                        continue;
                    }
                    response += weight * luma.at(x + kx - 1, y + ky - 1) as i32;
                }
            }
            map.values[y * width + x] = response.unsigned_abs() as f32;
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    fn luma_from(width: u32, height: u32, values: Vec<u8>) -> LumaMap {
        LumaMap {
            width,
            height,
            values,
        }
    }

    #[test]
    fn flat_image_has_no_saliency() {
        let pixels = PixelBuffer::filled(100, 100, Pixel::new(128, 128, 128, 255)).unwrap();
        let map = internal_saliency(&pixels);
        assert_eq!(map.values.len(), 100 * 100);
        assert!(map.is_all_zero());
    }

    #[test]
    fn single_bright_dot_peaks_at_one() {
        let mut values = vec![0u8; 25];
        values[2 * 5 + 2] = 100;
        let map = edge_saliency(&luma_from(5, 5, values));
        // Centre responds with |-400|, its four neighbours with 100 each.
        assert_eq!(map.at(2, 2), 1.0);
        assert_eq!(map.at(1, 2), 0.25);
        assert_eq!(map.at(2, 1), 0.25);
        assert_eq!(map.at(1, 1), 0.0);
        assert_eq!(map.max(), 1.0);
    }

    #[test]
    fn borders_stay_zero() {
        let values: Vec<u8> = (0..36).map(|i| ((i * 37) % 251) as u8).collect();
        let map = edge_saliency(&luma_from(6, 6, values));
        for i in 0..6 {
            assert_eq!(map.at(i, 0), 0.0);
            assert_eq!(map.at(i, 5), 0.0);
            assert_eq!(map.at(0, i), 0.0);
            assert_eq!(map.at(5, i), 0.0);
        }
    }

    #[test]
    fn non_flat_image_normalizes_max_to_one() {
        let values: Vec<u8> = (0..64).map(|i| ((i * i * 7) % 256) as u8).collect();
        let map = edge_saliency(&luma_from(8, 8, values));
        assert!((map.max() - 1.0).abs() < f32::EPSILON);
        assert!(map.values.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn tiny_images_have_no_interior() {
        let map = edge_saliency(&luma_from(2, 2, vec![0, 255, 255, 0]));
        assert!(map.is_all_zero());
        let map = edge_saliency(&luma_from(1, 1, vec![200]));
        assert_eq!(map.values, vec![0.0]);
    }

    #[test]
    fn kernel_sums_to_zero() {
        let total: i32 = LAPLACIAN_KERNEL.iter().flatten().sum();
        assert_eq!(total, 0);
    }
}
