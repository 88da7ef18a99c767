// Command-line runner for the pretest engine: analyze one creative, print the scores,
// and write `ad-pretest-result.json` and `heatmap.png` next to each other.

use ad_pretest::export::write_artifacts;
use ad_pretest::ocr::DEFAULT_OCR_LANGUAGE;
use ad_pretest::{
    AnalysisConfig, AnalysisPipeline, HttpHeatmapSource, NoOcr, OcrEngine, PixelBuffer, Placement, TranscriptOcr,
};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "ad_pretest", version, about = "Score the visual attention of an ad creative")]
struct Cli {
    /// Creative to analyze (PNG, JPEG, ...).
    image: PathBuf,
    /// Externally hosted heatmap to fuse with the internal saliency map.
    #[arg(long)]
    heatmap_url: Option<String>,
    /// Fetch the heatmap through a heatmap proxy at this base URL instead of directly.
    #[arg(long)]
    proxy: Option<String>,
    /// Placement whose safe area attention is measured against: feed, story or square.
    #[arg(long, default_value = "feed")]
    placement: Placement,
    /// Text recognized ahead of time; its words are counted as the creative's copy.
    #[arg(long)]
    transcript: Option<PathBuf>,
    /// Language hint for the OCR engine.
    #[arg(long, default_value = DEFAULT_OCR_LANGUAGE)]
    lang: String,
    /// Directory the report and heatmap are written to.
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ad_pretest::init_logging();
    let cli = Cli::parse();

    let bytes = std::fs::read(&cli.image).with_context(|| format!("reading {}", cli.image.display()))?;
    let pixels = PixelBuffer::decode(&bytes).with_context(|| format!("decoding {}", cli.image.display()))?;

    let source = match &cli.proxy {
        Some(base) => HttpHeatmapSource::via_proxy(base.clone()),
        None => HttpHeatmapSource::direct(std::env::var("HEATMAP_API_KEY").ok()),
    };
    let ocr: Arc<dyn OcrEngine> = match &cli.transcript {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Arc::new(TranscriptOcr::new(text))
        }
        None => Arc::new(NoOcr),
    };

    let config = AnalysisConfig {
        external_heatmap_url: cli.heatmap_url,
        placement: cli.placement,
        ocr_language: cli.lang,
    };
    let pipeline = AnalysisPipeline::new(config, Arc::new(source), ocr);
    let state = pipeline.analyze(pixels).await?;

    for entry in &state.diagnostics {
        println!("- {entry}");
    }
    let report = &state.report;
    println!("Format:             {}", state.format_label());
    println!("Attention:          {:.1}", report.attention);
    println!("Clarity:            {:.1}", report.clarity);
    println!("CTA Visibility:     {:.1}", report.cta_visibility);
    println!("Branding (heur.):   {:.1}", report.branding);
    println!("Readability:        {:.1}", report.readability);
    println!("Visual Noise (inv): {:.1}", report.visual_noise_inv);
    println!("Status:             {}", report.status);
    match &state.cta {
        Some(found) => println!("CTA detected:       yes (\"{}\")", found.word),
        None => println!("CTA detected:       no"),
    }

    let paths = write_artifacts(&cli.out, &state.export_document(), &state.heatmap)?;
    println!("Wrote {} and {}", paths.report.display(), paths.heatmap.display());

    Ok(())
}
