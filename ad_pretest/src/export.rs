// THEORY:
// A finished analysis leaves two artifacts behind: the score report as pretty-printed
// JSON (`{ "format": "<w>x<h>" | null, "scores": ScoreReport }`) and the rendered
// heatmap as PNG. They are written side by side under fixed file names so downstream
// tooling can pick them up without configuration.

use crate::core_modules::pixel_buffer::pixel_buffer::encode_png;
use crate::core_modules::scoring::ScoreReport;
use crate::error::PretestError;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const RESULT_FILE_NAME: &str = "ad-pretest-result.json";
pub const HEATMAP_FILE_NAME: &str = "heatmap.png";

/// The exported JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub format: Option<String>,
    pub scores: ScoreReport,
}

impl ExportDocument {
    pub fn new(format: Option<String>, scores: ScoreReport) -> Self {
        Self { format, scores }
    }

    pub fn to_json(&self) -> Result<String, PretestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn parse_export(json: &str) -> Result<ExportDocument, PretestError> {
    Ok(serde_json::from_str(json)?)
}

/// Paths of the files written by `write_artifacts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub report: PathBuf,
    pub heatmap: PathBuf,
}

/// Writes the JSON report and the heatmap PNG into `dir`, creating it if needed.
pub fn write_artifacts(
    dir: &Path,
    document: &ExportDocument,
    heatmap: &RgbaImage,
) -> Result<ArtifactPaths, PretestError> {
    std::fs::create_dir_all(dir)?;

    let report = dir.join(RESULT_FILE_NAME);
    std::fs::write(&report, document.to_json()?)?;

    let heatmap_path = dir.join(HEATMAP_FILE_NAME);
    let png = encode_png(heatmap.width(), heatmap.height(), heatmap.as_raw())?;
    std::fs::write(&heatmap_path, png)?;

    tracing::debug!(report = %report.display(), heatmap = %heatmap_path.display(), "artifacts written");

    Ok(ArtifactPaths {
        report,
        heatmap: heatmap_path,
    })
}
