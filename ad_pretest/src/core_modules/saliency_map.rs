// THEORY:
// A `SaliencyMap` is a per-pixel estimate of visual pull, one `f32` in [0, 1] per pixel.
// Up to three of them exist during a run: the internal edge map, the normalized external
// heatmap, and their fusion. They are plain value containers with the few reductions
// the metrics need (max, sum, mean); sums accumulate in `f64` so large creatives do not
// lose precision.

/// A `width × height` grid of saliency values.
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

impl SaliencyMap {
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width as usize + x]
    }

    pub fn same_dimensions(&self, other: &SaliencyMap) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().map(|&v| v as f64).sum()
    }

    /// Mean value, or 0 for an empty map.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum() / self.values.len() as f64
    }

    pub fn is_all_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }
}
