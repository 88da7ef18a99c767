// THEORY:
// The `pipeline` module is the top-level API of the pretest engine. It runs one creative
// through every stage in a fixed order and hands back a single `AnalysisState`:
//
//   (external heatmap fetch) → grayscale → edge saliency → fusion → colour map
//     → OCR + CTA keywords → metrics → scores
//
// Each run starts from nothing and shares no state with other runs. Stages own their
// outputs; the pipeline only threads them forward and keeps a diagnostics log. The fetch
// is the only stage that awaits I/O. Everything after it is CPU-bound and runs as one
// job on tokio's blocking pool, so a large creative never stalls the async workers.
//
// Failure policy:
// - The external heatmap is best-effort. Any `FetchError` is recorded as a fallback
//   diagnostic and the run continues on the internal map.
// - Everything else (OCR, encoding, a worker panic) aborts the run. There is no partial
//   report.

use crate::core_modules::color_map;
use crate::core_modules::cta::{CtaMatch, detect_cta};
use crate::core_modules::edge_saliency::internal_saliency;
use crate::core_modules::external_heatmap::normalize_external;
use crate::core_modules::heatmap_fuser::{ExternalOutcome, fuse};
use crate::core_modules::metrics::{self, Metrics, Placement};
use crate::core_modules::pixel_buffer::pixel_buffer::PixelBuffer;
use crate::core_modules::saliency_map::SaliencyMap;
use crate::core_modules::scoring::{ScoreReport, Status, compose};
use crate::error::{FetchError, PretestError};
use crate::export::ExportDocument;
use crate::heatmap_source::{FetchedHeatmap, HeatmapSource};
use crate::ocr::{DEFAULT_OCR_LANGUAGE, OcrEngine, recognized_words};
use image::RgbaImage;
use std::fmt;
use std::sync::Arc;

/// Per-run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Optional externally hosted heatmap to fuse with the internal map.
    pub external_heatmap_url: Option<String>,
    /// Placement whose safe area the focus ratio is measured against.
    pub placement: Placement,
    /// Language hint passed to the OCR engine.
    pub ocr_language: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            external_heatmap_url: None,
            placement: Placement::default(),
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
        }
    }
}

/// One entry in a run's diagnostics log.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    ExternalHeatmapRequested { url: String },
    ExternalHeatmapFused,
    ExternalHeatmapFallback { reason: FetchError },
    OcrCompleted { words: usize },
    CtaDetected { word: String },
    AnalysisCompleted { status: Status },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ExternalHeatmapRequested { url } => write!(f, "fetching external heatmap from {url}"),
            Diagnostic::ExternalHeatmapFused => f.write_str("fused external heatmap with internal saliency"),
            Diagnostic::ExternalHeatmapFallback { reason } => {
                write!(f, "external heatmap unavailable ({reason}); using internal saliency")
            }
            Diagnostic::OcrCompleted { words } => write!(f, "OCR found {words} words"),
            Diagnostic::CtaDetected { word } => write!(f, "call to action detected in \"{word}\""),
            Diagnostic::AnalysisCompleted { status } => write!(f, "analysis complete: {status}"),
        }
    }
}

/// Everything one analysis run produced.
#[derive(Debug, Clone)]
pub struct AnalysisState {
    pub width: u32,
    pub height: u32,
    /// The fused saliency map every downstream stage read.
    pub saliency: SaliencyMap,
    pub external: ExternalOutcome,
    pub heatmap: RgbaImage,
    pub words: Vec<String>,
    /// First OCR word carrying a call-to-action keyword, if any.
    pub cta: Option<CtaMatch>,
    pub metrics: Metrics,
    pub report: ScoreReport,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisState {
    pub fn format_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn export_document(&self) -> ExportDocument {
        ExportDocument::new(Some(self.format_label()), self.report.clone())
    }

    pub fn fell_back(&self) -> bool {
        matches!(self.external, ExternalOutcome::FellBack(_))
    }

    pub fn cta_detected(&self) -> bool {
        self.cta.is_some()
    }
}

/// The main entry point of the engine. Cheap to clone; holds no per-run state.
#[derive(Clone)]
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    heatmap_source: Arc<dyn HeatmapSource>,
    ocr: Arc<dyn OcrEngine>,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig, heatmap_source: Arc<dyn HeatmapSource>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            config,
            heatmap_source,
            ocr,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Same collaborators, different settings.
    pub fn with_config(&self, config: AnalysisConfig) -> Self {
        Self {
            config,
            heatmap_source: Arc::clone(&self.heatmap_source),
            ocr: Arc::clone(&self.ocr),
        }
    }

    /// Runs one creative through every stage. Only the heatmap fetch runs on the async
    /// executor; the per-pixel stages and OCR run on the blocking pool.
    pub async fn analyze(&self, pixels: PixelBuffer) -> Result<AnalysisState, PretestError> {
        let mut diagnostics = Vec::new();

        // Stage 1: External heatmap retrieval (best-effort)
        let fetched = match self.external_url() {
            Some(url) => {
                diagnostics.push(Diagnostic::ExternalHeatmapRequested { url: url.to_string() });
                Some(self.heatmap_source.fetch(url).await)
            }
            None => None,
        };

        let ocr = Arc::clone(&self.ocr);
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || run_stages(&pixels, fetched, ocr.as_ref(), &config, diagnostics))
            .await
            .map_err(|e| PretestError::Unexpected(format!("analysis worker failed: {e}")))?
    }

    fn external_url(&self) -> Option<&str> {
        self.config
            .external_heatmap_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

fn run_stages(
    pixels: &PixelBuffer,
    fetched: Option<Result<FetchedHeatmap, FetchError>>,
    ocr: &dyn OcrEngine,
    config: &AnalysisConfig,
    mut diagnostics: Vec<Diagnostic>,
) -> Result<AnalysisState, PretestError> {
    let (width, height) = (pixels.width(), pixels.height());

    // Stage 2: Grayscale + edge saliency
    let internal = internal_saliency(pixels);
    tracing::debug!(width, height, peak = internal.max(), "internal saliency computed");

    // Stage 3: Fusion
    let external = fetched.map(|result| {
        result.and_then(|heatmap| {
            tracing::debug!(bytes = heatmap.bytes.len(), content_type = %heatmap.content_type, "external heatmap fetched");
            normalize_external(&heatmap.bytes, width, height)
        })
    });
    let fused = fuse(internal, external);
    match &fused.outcome {
        ExternalOutcome::NotRequested => {}
        ExternalOutcome::Fused => diagnostics.push(Diagnostic::ExternalHeatmapFused),
        ExternalOutcome::FellBack(reason) => {
            tracing::warn!(%reason, "external heatmap unavailable, using internal saliency");
            diagnostics.push(Diagnostic::ExternalHeatmapFallback { reason: reason.clone() });
        }
    }

    // Stage 4: Rendering
    let heatmap = color_map::render(&fused.map);

    // Stage 5: OCR + CTA keywords
    let words = recognized_words(ocr.recognize(&pixels.to_png()?, &config.ocr_language)?);
    diagnostics.push(Diagnostic::OcrCompleted { words: words.len() });
    let text_words = u32::try_from(words.len())
        .map_err(|_| PretestError::Unexpected(format!("{} OCR words overflow the counter", words.len())))?;
    let cta = detect_cta(&words);
    if let Some(found) = &cta {
        tracing::debug!(word = %found.word, keyword = found.keyword, "call to action found");
        diagnostics.push(Diagnostic::CtaDetected {
            word: found.word.clone(),
        });
    }

    // Stage 6: Metrics and scores
    let metrics = metrics::extract(pixels, &fused.map, text_words, config.placement);
    let report = compose(&metrics);
    diagnostics.push(Diagnostic::AnalysisCompleted { status: report.status });
    tracing::info!(
        status = %report.status,
        composite = report.composite(),
        attention = report.attention,
        clarity = report.clarity,
        cta_detected = cta.is_some(),
        "analysis complete"
    );

    Ok(AnalysisState {
        width,
        height,
        saliency: fused.map,
        external: fused.outcome,
        heatmap,
        words,
        cta,
        metrics,
        report,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::core_modules::pixel_buffer::pixel_buffer::encode_png;
    use crate::error::OcrError;
    use crate::heatmap_source::{FetchedHeatmap, HttpHeatmapSource};
    use crate::ocr::{NoOcr, OcrWord, TranscriptOcr};
    use futures::future::BoxFuture;
    use std::sync::Mutex;
    use std::thread::ThreadId;

    struct FixedSource(Result<FetchedHeatmap, FetchError>);

    impl HeatmapSource for FixedSource {
        fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<FetchedHeatmap, FetchError>> {
            let result = self.0.clone();
            Box::pin(async move { result })
        }
    }

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn recognize(&self, _png: &[u8], _language: &str) -> Result<Vec<OcrWord>, OcrError> {
            Err(OcrError::Engine("tessdata missing".into()))
        }
    }

    fn pipeline(url: Option<&str>, source: impl HeatmapSource + 'static, ocr: impl OcrEngine + 'static) -> AnalysisPipeline {
        let config = AnalysisConfig {
            external_heatmap_url: url.map(str::to_string),
            ..AnalysisConfig::default()
        };
        AnalysisPipeline::new(config, Arc::new(source), Arc::new(ocr))
    }

    fn gray_creative() -> PixelBuffer {
        PixelBuffer::filled(100, 100, Pixel::new(128, 128, 128, 255)).unwrap()
    }

    fn checkerboard(width: u32, height: u32) -> PixelBuffer {
        let image = image::RgbaImage::from_fn(width, height, |x, y| {
            let v = if (x / 8 + y / 8) % 2 == 0 { 20 } else { 230 };
            image::Rgba([v, v, v, 255])
        });
        PixelBuffer::from_rgba_image(image).unwrap()
    }

    fn gradient_png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_fn(width, height, |x, _| {
            let v = (x * 255 / (width - 1)) as u8;
            image::Rgba([v, v, v, 255])
        });
        encode_png(width, height, image.as_raw()).unwrap()
    }

    #[tokio::test]
    async fn flat_gray_creative_scores_stop() {
        let state = pipeline(None, HttpHeatmapSource::direct(None), NoOcr)
            .analyze(gray_creative())
            .await
            .unwrap();

        assert!(state.saliency.is_all_zero());
        assert_eq!(state.external, ExternalOutcome::NotRequested);
        assert_eq!(state.metrics.visual_noise, 0.0);
        assert_eq!(state.metrics.saliency_focus_ratio, 0.0);
        assert_eq!(state.metrics.text_words, 0);
        assert!((state.metrics.contrast_ratio - 1.0).abs() < 1e-12);

        let report = &state.report;
        assert_eq!(report.attention, 0.0);
        assert!((report.clarity - 70.0).abs() < 1e-9);
        assert!((report.cta_visibility - 80.0).abs() < 1e-9);
        assert_eq!(report.branding, 55.0);
        assert!((report.composite() - 44.5).abs() < 1e-9);
        assert_eq!(report.status, Status::Stop);
        assert_eq!(
            state.diagnostics.last(),
            Some(&Diagnostic::AnalysisCompleted { status: Status::Stop })
        );
    }

    #[tokio::test]
    async fn non_flat_creative_peaks_at_one() {
        let state = pipeline(None, HttpHeatmapSource::direct(None), NoOcr)
            .analyze(checkerboard(64, 48))
            .await
            .unwrap();
        assert!((state.saliency.max() - 1.0).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&state.metrics.saliency_focus_ratio));
        assert!(state.metrics.contrast_ratio > 1.0);
        assert_eq!(state.heatmap.dimensions(), (64, 48));
    }

    #[tokio::test]
    async fn upstream_404_falls_back_to_internal_saliency() {
        let creative = checkerboard(40, 40);
        let baseline = pipeline(None, HttpHeatmapSource::direct(None), NoOcr)
            .analyze(creative.clone())
            .await
            .unwrap();
        let state = pipeline(
            Some("https://heatmaps.example/missing.png"),
            FixedSource(Err(FetchError::Upstream(404))),
            NoOcr,
        )
        .analyze(creative)
        .await
        .unwrap();

        assert!(state.fell_back());
        assert!(state.diagnostics.contains(&Diagnostic::ExternalHeatmapFallback {
            reason: FetchError::Upstream(404)
        }));
        assert_eq!(state.saliency, baseline.saliency);
        assert_eq!(state.report, baseline.report);
    }

    #[tokio::test]
    async fn real_http_404_falls_back() {
        use axum::{Router, http::StatusCode, routing::get};
        let app = Router::new().route("/heatmap.png", get(|| async { StatusCode::NOT_FOUND }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = format!("http://{addr}/heatmap.png");
        let state = pipeline(Some(&url), HttpHeatmapSource::direct(None), NoOcr)
            .analyze(checkerboard(32, 32))
            .await
            .unwrap();
        assert_eq!(state.external, ExternalOutcome::FellBack(FetchError::Upstream(404)));
        assert!(state.diagnostics.iter().any(|d| d.to_string().contains("using internal saliency")));
    }

    #[tokio::test]
    async fn undecodable_heatmap_falls_back() {
        let source = FixedSource(Ok(FetchedHeatmap {
            bytes: b"not an image".to_vec(),
            content_type: "text/plain".into(),
        }));
        let state = pipeline(Some("https://heatmaps.example/h.png"), source, NoOcr)
            .analyze(checkerboard(24, 24))
            .await
            .unwrap();
        assert!(matches!(state.external, ExternalOutcome::FellBack(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn external_heatmap_is_fused() {
        let creative = checkerboard(32, 16);
        let internal = internal_saliency(&creative);
        let source = FixedSource(Ok(FetchedHeatmap {
            bytes: gradient_png(32, 16),
            content_type: "image/png".into(),
        }));
        let state = pipeline(Some("https://heatmaps.example/h.png"), source, NoOcr)
            .analyze(creative)
            .await
            .unwrap();

        assert_eq!(state.external, ExternalOutcome::Fused);
        assert!(state.diagnostics.contains(&Diagnostic::ExternalHeatmapFused));
        let external = normalize_external(&gradient_png(32, 16), 32, 16).unwrap();
        for ((&f, &i), &e) in state.saliency.values.iter().zip(&internal.values).zip(&external.values) {
            assert!((f - (0.7 * e + 0.3 * i)).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn blank_url_is_not_requested() {
        let state = pipeline(Some("   "), FixedSource(Err(FetchError::InputMissing)), NoOcr)
            .analyze(gray_creative())
            .await
            .unwrap();
        assert_eq!(state.external, ExternalOutcome::NotRequested);
    }

    #[tokio::test]
    async fn ocr_words_reach_the_report() {
        let ocr = TranscriptOcr::new("Jetzt  kaufen  50% Rabatt auf alles");
        let state = pipeline(None, HttpHeatmapSource::direct(None), ocr)
            .analyze(gray_creative())
            .await
            .unwrap();
        assert_eq!(state.words.len(), 6);
        assert_eq!(state.report.raw.text_words, 6);
        assert!(state.diagnostics.contains(&Diagnostic::OcrCompleted { words: 6 }));
        assert!(state.cta_detected());
        assert_eq!(state.cta.as_ref().map(|m| m.word.as_str()), Some("Jetzt"));
        assert!(state.diagnostics.contains(&Diagnostic::CtaDetected { word: "Jetzt".into() }));
        // CTA detection is reported alongside the scores and does not change them.
        assert!((state.report.cta_visibility - 80.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn no_keywords_no_cta() {
        let ocr = TranscriptOcr::new("Sommer Sale 50%");
        let state = pipeline(None, HttpHeatmapSource::direct(None), ocr)
            .analyze(gray_creative())
            .await
            .unwrap();
        assert!(!state.cta_detected());
        assert!(!state.diagnostics.iter().any(|d| matches!(d, Diagnostic::CtaDetected { .. })));
    }

    struct RecordingOcr(Mutex<Option<ThreadId>>);

    impl OcrEngine for RecordingOcr {
        fn recognize(&self, _png: &[u8], _language: &str) -> Result<Vec<OcrWord>, OcrError> {
            if let Ok(mut seen) = self.0.lock() {
                *seen = Some(std::thread::current().id());
            }
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn pixel_stages_run_off_the_async_thread() {
        let ocr = Arc::new(RecordingOcr(Mutex::new(None)));
        let config = AnalysisConfig::default();
        let source: Arc<dyn HeatmapSource> = Arc::new(HttpHeatmapSource::direct(None));
        let engine: Arc<dyn OcrEngine> = ocr.clone();
        AnalysisPipeline::new(config, source, engine)
            .analyze(checkerboard(16, 16))
            .await
            .unwrap();

        let worker = ocr.0.lock().unwrap().expect("ocr ran");
        assert_ne!(worker, std::thread::current().id());
    }

    #[tokio::test]
    async fn ocr_failure_aborts_without_report() {
        let result = pipeline(None, HttpHeatmapSource::direct(None), FailingOcr)
            .analyze(gray_creative())
            .await;
        assert!(matches!(result, Err(PretestError::Ocr(_))));
    }

    #[tokio::test]
    async fn export_document_carries_format() {
        let state = pipeline(None, HttpHeatmapSource::direct(None), NoOcr)
            .analyze(checkerboard(30, 20))
            .await
            .unwrap();
        let document = state.export_document();
        assert_eq!(document.format.as_deref(), Some("30x20"));
        assert_eq!(document.scores, state.report);
    }
}
