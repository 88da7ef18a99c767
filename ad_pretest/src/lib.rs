// THEORY:
// This file is the entry point of the `ad_pretest` library crate. It exposes the
// `AnalysisPipeline` and its data structures (`AnalysisConfig`, `AnalysisState`,
// `ScoreReport`, ...) as the high-level interface of the pretest engine, along with the
// two collaborator seams a host application plugs into: `OcrEngine` for text
// recognition and `HeatmapSource` for external heatmaps.
//
// The numeric stages live in `core_modules`; each is a small, stateless transform that
// can be used on its own.

pub mod core_modules;
pub mod error;
pub mod export;
pub mod heatmap_source;
pub mod ocr;
pub mod pipeline;

pub use core_modules::cta::{CtaMatch, detect_cta};
pub use core_modules::metrics::{Metrics, Placement};
pub use core_modules::pixel_buffer::pixel_buffer::PixelBuffer;
pub use core_modules::scoring::{ScoreReport, Status};
pub use error::{FetchError, OcrError, PretestError};
pub use export::{ExportDocument, HEATMAP_FILE_NAME, RESULT_FILE_NAME};
pub use heatmap_source::{FetchedHeatmap, HeatmapSource, HttpHeatmapSource};
pub use ocr::{NoOcr, OcrEngine, OcrWord, TranscriptOcr};
pub use pipeline::{AnalysisConfig, AnalysisPipeline, AnalysisState, Diagnostic};

/// Default `tracing` filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the `tracing` subscriber for binaries. Safe to call more than once.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .try_init();
}
