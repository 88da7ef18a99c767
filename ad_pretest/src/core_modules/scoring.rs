// THEORY:
// The scorer is the final, pure stage. It turns `Metrics` into six 0..100 scores and a
// traffic-light verdict. All weights, the branding baseline and the verdict thresholds
// are fixed protocol constants: two implementations fed the same metrics must produce
// the same report.
//
//     textPenalty    = min(1, words / 22)
//     noisePenalty   = clamp01(visual_noise)
//     contrastNorm   = clamp01((contrast_ratio - 1) / 20)
//     attention      = 100 * clamp01(focus)
//     clarity        = 100 * (0.45(1 - textPenalty) + 0.25(1 - noisePenalty) + 0.30 contrastNorm)
//     cta_visibility = 55 + 25(1 - noisePenalty)
//     branding       = 55
//     readability    = 0.6 clarity + 0.4 attention
//     composite      = 0.35 attention + 0.25 clarity + 0.20 cta + 0.20 branding
//
// Branding has no detector behind it yet; 55 is a neutral placeholder.

use crate::core_modules::metrics::Metrics;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TEXT_WORD_BUDGET: f64 = 22.0;
pub const CONTRAST_RANGE: f64 = 20.0;

pub const CLARITY_TEXT_WEIGHT: f64 = 0.45;
pub const CLARITY_NOISE_WEIGHT: f64 = 0.25;
pub const CLARITY_CONTRAST_WEIGHT: f64 = 0.30;

pub const CTA_BASELINE: f64 = 55.0;
pub const CTA_NOISE_BONUS: f64 = 25.0;
pub const BRANDING_BASELINE: f64 = 55.0;

pub const READABILITY_CLARITY_WEIGHT: f64 = 0.6;
pub const READABILITY_ATTENTION_WEIGHT: f64 = 0.4;

pub const COMPOSITE_ATTENTION_WEIGHT: f64 = 0.35;
pub const COMPOSITE_CLARITY_WEIGHT: f64 = 0.25;
pub const COMPOSITE_CTA_WEIGHT: f64 = 0.20;
pub const COMPOSITE_BRANDING_WEIGHT: f64 = 0.20;

pub const GO_THRESHOLD: f64 = 75.0;
pub const IMPROVE_THRESHOLD: f64 = 60.0;

pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// The verdict on a creative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Go,
    Improve,
    Stop,
}

impl Status {
    pub fn from_composite(composite: f64) -> Self {
        if composite >= GO_THRESHOLD {
            Status::Go
        } else if composite >= IMPROVE_THRESHOLD {
            Status::Improve
        } else {
            Status::Stop
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Go => "GO",
            Status::Improve => "IMPROVE",
            Status::Stop => "STOP",
        })
    }
}

/// The scored report. Immutable once composed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub attention: f64,
    pub clarity: f64,
    pub cta_visibility: f64,
    pub branding: f64,
    pub readability: f64,
    pub visual_noise_inv: f64,
    pub status: Status,
    pub raw: Metrics,
}

impl ScoreReport {
    /// The weighted score the verdict was derived from.
    pub fn composite(&self) -> f64 {
        composite(self.attention, self.clarity, self.cta_visibility, self.branding)
    }
}

pub fn composite(attention: f64, clarity: f64, cta_visibility: f64, branding: f64) -> f64 {
    COMPOSITE_ATTENTION_WEIGHT * attention
        + COMPOSITE_CLARITY_WEIGHT * clarity
        + COMPOSITE_CTA_WEIGHT * cta_visibility
        + COMPOSITE_BRANDING_WEIGHT * branding
}

/// Folds metrics into the score report.
pub fn compose(metrics: &Metrics) -> ScoreReport {
    let text_penalty = (metrics.text_words as f64 / TEXT_WORD_BUDGET).min(1.0);
    let noise_penalty = clamp01(metrics.visual_noise);
    let contrast_norm = clamp01((metrics.contrast_ratio - 1.0) / CONTRAST_RANGE);

    let attention = 100.0 * clamp01(metrics.saliency_focus_ratio);
    let clarity = 100.0
        * (CLARITY_TEXT_WEIGHT * (1.0 - text_penalty)
            + CLARITY_NOISE_WEIGHT * (1.0 - noise_penalty)
            + CLARITY_CONTRAST_WEIGHT * contrast_norm);
    let cta_visibility = CTA_BASELINE + CTA_NOISE_BONUS * (1.0 - noise_penalty);
    let branding = BRANDING_BASELINE;
    let readability = READABILITY_CLARITY_WEIGHT * clarity + READABILITY_ATTENTION_WEIGHT * attention;
    let visual_noise_inv = 100.0 * (1.0 - clamp01(metrics.visual_noise));

    let status = Status::from_composite(composite(attention, clarity, cta_visibility, branding));

    ScoreReport {
        attention,
        clarity,
        cta_visibility,
        branding,
        readability,
        visual_noise_inv,
        status,
        raw: *metrics,
    }
}
