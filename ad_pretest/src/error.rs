// THEORY:
// Errors are split by who is allowed to recover from them. A `FetchError` belongs to
// the external heatmap path and is always absorbed by the pipeline: the run falls back
// to the internal saliency map and records why. A `PretestError` aborts the run and no
// score report is produced. `OcrError` is what the OCR collaborator reports; the
// pipeline lifts it into `PretestError::Ocr`.

use thiserror::Error;

/// Failures on the external heatmap path (retrieval or decoding).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// No URL was supplied.
    #[error("missing heatmap url")]
    InputMissing,
    /// The upstream answered with a non-success status.
    #[error("upstream responded with status {0}")]
    Upstream(u16),
    /// The request never produced a response (DNS, connect, body read).
    #[error("heatmap request failed: {0}")]
    Transport(String),
    /// The bytes arrived but could not be decoded or resampled.
    #[error("heatmap could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OcrError {
    #[error("ocr engine failed: {0}")]
    Engine(String),
}

/// Failures that abort an analysis run.
#[derive(Debug, Error)]
pub enum PretestError {
    #[error("no input image")]
    InputMissing,
    #[error("buffer of {len} bytes does not hold a {width}x{height} RGBA image")]
    InvalidBuffer { width: u32, height: u32, len: usize },
    #[error("image of {width}x{height} exceeds the {max_pixels} pixel limit")]
    TooLarge { width: u32, height: u32, max_pixels: u64 },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error("export failed: {0}")]
    Export(#[from] std::io::Error),
    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected analysis failure: {0}")]
    Unexpected(String),
}
