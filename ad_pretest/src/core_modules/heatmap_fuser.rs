// THEORY:
// Fusion folds an external heatmap into the internal edge map with a fixed linear blend:
//
//     fused = FUSION_WEIGHT * external + (1 - FUSION_WEIGHT) * internal
//
// The fuser consumes the tagged result of the external path directly. When no external
// heatmap was requested, or its retrieval or decoding failed, the internal map passes
// through untouched and the outcome records why.

use crate::core_modules::saliency_map::SaliencyMap;
use crate::error::FetchError;

/// Share of the fused map contributed by the external heatmap.
pub const FUSION_WEIGHT: f32 = 0.7;

/// What happened to the external heatmap during fusion.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalOutcome {
    NotRequested,
    Fused,
    FellBack(FetchError),
}

/// The map propagated downstream plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedSaliency {
    pub map: SaliencyMap,
    pub outcome: ExternalOutcome,
}

/// Fuses `internal` with the external result, falling back to `internal` on any failure.
pub fn fuse(internal: SaliencyMap, external: Option<Result<SaliencyMap, FetchError>>) -> FusedSaliency {
    match external {
        None => FusedSaliency {
            map: internal,
            outcome: ExternalOutcome::NotRequested,
        },
        Some(Err(reason)) => FusedSaliency {
            map: internal,
            outcome: ExternalOutcome::FellBack(reason),
        },
        Some(Ok(external)) if !external.same_dimensions(&internal) => {
            let reason = FetchError::Decode(format!(
                "heatmap is {}x{}, expected {}x{}",
                external.width, external.height, internal.width, internal.height
            ));
            FusedSaliency {
                map: internal,
                outcome: ExternalOutcome::FellBack(reason),
            }
        }
        Some(Ok(external)) => FusedSaliency {
            map: blend(&internal, &external, FUSION_WEIGHT),
            outcome: ExternalOutcome::Fused,
        },
    }
}

/// Per-pixel `weight * external + (1 - weight) * internal`. Both maps must share dimensions.
pub fn blend(internal: &SaliencyMap, external: &SaliencyMap, weight: f32) -> SaliencyMap {
    let values = internal
        .values
        .iter()
        .zip(&external.values)
        .map(|(&i, &e)| weight * e + (1.0 - weight) * i)
        .collect();
    SaliencyMap {
        width: internal.width,
        height: internal.height,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(values: Vec<f32>) -> SaliencyMap {
        SaliencyMap {
            width: values.len() as u32,
            height: 1,
            values,
        }
    }

    #[test]
    fn blend_weights_external_by_point_seven() {
        let internal = map(vec![0.0, 1.0, 0.5, 0.2]);
        let external = map(vec![1.0, 0.0, 0.5, 0.9]);
        let fused = fuse(internal.clone(), Some(Ok(external.clone())));
        assert_eq!(fused.outcome, ExternalOutcome::Fused);
        for ((&f, &i), &e) in fused.map.values.iter().zip(&internal.values).zip(&external.values) {
            assert!((f - (0.7 * e + 0.3 * i)).abs() < 1e-6);
        }
    }

    #[test]
    fn fusing_with_itself_is_identity() {
        let internal = map(vec![0.0, 0.25, 0.75, 1.0]);
        let fused = fuse(internal.clone(), Some(Ok(internal.clone())));
        for (&f, &i) in fused.map.values.iter().zip(&internal.values) {
            assert!((f - i).abs() < 1e-6);
        }
    }

    #[test]
    fn missing_external_passes_internal_through() {
        let internal = map(vec![0.1, 0.9]);
        let fused = fuse(internal.clone(), None);
        assert_eq!(fused.map, internal);
        assert_eq!(fused.outcome, ExternalOutcome::NotRequested);
    }

    #[test]
    fn failed_external_falls_back_with_reason() {
        let internal = map(vec![0.1, 0.9]);
        let fused = fuse(internal.clone(), Some(Err(FetchError::Upstream(404))));
        assert_eq!(fused.map, internal);
        assert_eq!(fused.outcome, ExternalOutcome::FellBack(FetchError::Upstream(404)));
    }

    #[test]
    fn mismatched_external_falls_back() {
        let internal = map(vec![0.1, 0.9]);
        let fused = fuse(internal.clone(), Some(Ok(map(vec![1.0, 1.0, 1.0]))));
        assert_eq!(fused.map, internal);
        assert!(matches!(fused.outcome, ExternalOutcome::FellBack(FetchError::Decode(_))));
    }
}
