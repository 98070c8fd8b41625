/// Continuous target generation.
///
/// Instead of snapping to a discrete profile, a target is computed as a
/// point in a continuous parameter space bounded by the extremes observed
/// across the seven reference recordings. The two governing relationships:
/// crest factor and LUFS move inversely (audiophile masters are both quiet
/// and dynamic), and a mid-dominant source is rare enough to be preserved
/// rather than pulled toward the neutral point.

use crate::content_analyzer::ContentAnalysis;

pub struct ParameterBounds {
    pub min: f64,
    pub max: f64,
    pub neutral: f64,
}

pub struct TargetGenerator {
    lufs: ParameterBounds,
    crest: ParameterBounds,
    bass_mid_ratio: ParameterBounds,
    bass_pct: ParameterBounds,
    mid_pct: ParameterBounds,
}

impl Default for TargetGenerator {
    fn default() -> Self {
        Self {
            lufs: ParameterBounds { min: -21.0, max: -8.6, neutral: -15.0 },
            crest: ParameterBounds { min: 10.5, max: 21.1, neutral: 16.0 },
            bass_mid_ratio: ParameterBounds { min: -3.4, max: 5.5, neutral: 1.0 },
            bass_pct: ParameterBounds { min: 30.9, max: 74.6, neutral: 55.0 },
            mid_pct: ParameterBounds { min: 21.3, max: 66.9, neutral: 35.0 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIntent {
    Enhance,
    Preserve,
    Transform,
    Audiophile,
    Punchy,
}

#[derive(Debug, Clone, Copy)]
struct ContinuousParams {
    lufs: f64,
    crest: f64,
    bass_mid_ratio: f64,
    bass_pct: f64,
    mid_pct: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SourceCharacteristics {
    pub lufs: f64,
    pub crest: f64,
    pub bass_mid_ratio: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ParameterDeltas {
    pub lufs_change: f64,
    pub crest_change: f64,
    pub bass_mid_change: f64,
}

#[derive(Debug, Clone)]
pub struct ContinuousTarget {
    pub target_lufs: f64,
    pub target_crest_factor: f64,
    pub target_bass_mid_ratio: f64,
    pub target_bass_pct: f64,
    pub target_mid_pct: f64,
    pub processing_intensity: f64,
    pub preserve_character: f64,
    pub source_characteristics: SourceCharacteristics,
    pub deltas: ParameterDeltas,
}

impl TargetGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `preserve_character` is in `[0, 1]`: 1.0 keeps the source exactly,
    /// 0.0 pulls fully toward the computed target, 0.7 is the teacher's
    /// "mostly preserve, enhance slightly" default.
    pub fn generate_target(
        &self,
        analysis: &ContentAnalysis,
        user_intent: Option<UserIntent>,
        preserve_character: f64,
    ) -> ContinuousTarget {
        let source_lufs = analysis.dynamic.estimated_lufs;
        let source_crest = analysis.dynamic.crest_factor_db;
        let source_bass_mid = analysis.spectral.bass_to_mid_db;
        let source_bass_pct = analysis.spectral.bass_pct;
        let source_mid_pct = analysis.spectral.mid_pct;

        let mut target = self.compute_optimal_targets(
            source_lufs,
            source_crest,
            source_bass_mid,
            source_bass_pct,
            source_mid_pct,
        );

        if let Some(intent) = user_intent {
            target = self.apply_user_intent(target, intent);
        }

        let final_params = self.blend_source_target(
            ContinuousParams {
                lufs: source_lufs,
                crest: source_crest,
                bass_mid_ratio: source_bass_mid,
                bass_pct: source_bass_pct,
                mid_pct: source_mid_pct,
            },
            target,
            preserve_character,
        );

        let intensity = Self::calculate_intensity_from_deltas(
            source_lufs,
            source_crest,
            source_bass_mid,
            final_params.lufs,
            final_params.crest,
            final_params.bass_mid_ratio,
        );

        ContinuousTarget {
            target_lufs: final_params.lufs,
            target_crest_factor: final_params.crest,
            target_bass_mid_ratio: final_params.bass_mid_ratio,
            target_bass_pct: final_params.bass_pct,
            target_mid_pct: final_params.mid_pct,
            processing_intensity: intensity,
            preserve_character,
            source_characteristics: SourceCharacteristics {
                lufs: source_lufs,
                crest: source_crest,
                bass_mid_ratio: source_bass_mid,
            },
            deltas: ParameterDeltas {
                lufs_change: final_params.lufs - source_lufs,
                crest_change: final_params.crest - source_crest,
                bass_mid_change: final_params.bass_mid_ratio - source_bass_mid,
            },
        }
    }

    fn compute_optimal_targets(
        &self,
        source_lufs: f64,
        source_crest: f64,
        source_bass_mid: f64,
        source_bass_pct: f64,
        source_mid_pct: f64,
    ) -> ContinuousParams {
        let target_crest = if source_crest > 17.0 {
            (source_crest + 0.5).min(self.crest.max)
        } else if source_crest < 12.0 {
            let improvement = (self.crest.neutral - source_crest) * 0.5;
            source_crest + improvement
        } else {
            self.crest.neutral
        };

        let normalized_crest =
            (target_crest - self.crest.min) / (self.crest.max - self.crest.min);
        let target_lufs = self.lufs.max - normalized_crest * (self.lufs.max - self.lufs.min);

        let (target_bass_mid, target_bass_pct, target_mid_pct) =
            if source_mid_pct > 50.0 && source_bass_mid < 0.0 {
                (source_bass_mid, source_bass_pct, source_mid_pct)
            } else if source_bass_pct > 70.0 {
                (
                    source_bass_mid - 0.5,
                    source_bass_pct - 5.0,
                    source_mid_pct + 3.0,
                )
            } else {
                (
                    source_bass_mid * 0.7 + self.bass_mid_ratio.neutral * 0.3,
                    source_bass_pct * 0.7 + self.bass_pct.neutral * 0.3,
                    source_mid_pct * 0.7 + self.mid_pct.neutral * 0.3,
                )
            };

        ContinuousParams {
            lufs: target_lufs,
            crest: target_crest,
            bass_mid_ratio: target_bass_mid,
            bass_pct: target_bass_pct,
            mid_pct: target_mid_pct,
        }
    }

    fn apply_user_intent(&self, mut params: ContinuousParams, intent: UserIntent) -> ContinuousParams {
        match intent {
            UserIntent::Audiophile => {
                params.crest = (params.crest + 2.0).min(self.crest.max);
                params.lufs = (params.lufs - 2.0).max(self.lufs.min);
            }
            UserIntent::Punchy => {
                params.crest = (params.crest - 1.5).max(14.0);
                params.lufs = (params.lufs + 2.0).min(-12.0);
            }
            UserIntent::Preserve => {
                params.crest = params.crest * 0.5 + params.crest * 0.5;
                params.lufs = params.lufs * 0.5 + params.lufs * 0.5;
                params.bass_mid_ratio = params.bass_mid_ratio * 0.5 + params.bass_mid_ratio * 0.5;
            }
            UserIntent::Enhance | UserIntent::Transform => {}
        }
        params
    }

    fn blend_source_target(
        &self,
        source: ContinuousParams,
        target: ContinuousParams,
        preserve: f64,
    ) -> ContinuousParams {
        let blend = |s: f64, t: f64| s * preserve + t * (1.0 - preserve);
        ContinuousParams {
            lufs: blend(source.lufs, target.lufs),
            crest: blend(source.crest, target.crest),
            bass_mid_ratio: blend(source.bass_mid_ratio, target.bass_mid_ratio),
            bass_pct: blend(source.bass_pct, target.bass_pct),
            mid_pct: blend(source.mid_pct, target.mid_pct),
        }
    }

    fn calculate_intensity_from_deltas(
        source_lufs: f64,
        source_crest: f64,
        source_bass_mid: f64,
        target_lufs: f64,
        target_crest: f64,
        target_bass_mid: f64,
    ) -> f64 {
        let lufs_delta = (target_lufs - source_lufs).abs() / 10.0;
        let crest_delta = (target_crest - source_crest).abs() / 8.0;
        let freq_delta = (target_bass_mid - source_bass_mid).abs() / 5.0;

        let intensity = lufs_delta * 0.35 + crest_delta * 0.45 + freq_delta * 0.20;
        intensity.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_analyzer::{DynamicContent, EnergyContent, SpectralContent};

    fn sample_analysis(crest: f64, lufs: f64, bass_mid: f64, bass_pct: f64, mid_pct: f64) -> ContentAnalysis {
        ContentAnalysis {
            spectral: SpectralContent {
                bass_pct,
                mid_pct,
                high_pct: 100.0 - bass_pct - mid_pct,
                bass_to_mid_db: bass_mid,
                high_to_mid_db: 0.0,
                spectral_centroid: 1000.0,
            },
            dynamic: DynamicContent {
                rms_db: lufs - 3.0,
                peak_db: lufs - 3.0 + crest,
                crest_factor_db: crest,
                estimated_lufs: lufs,
                rms_variation_db: 0.0,
            },
            energy: EnergyContent { rms: 0.1, spectral_flux: 0.0 },
            profile_match: "steven_wilson_2021",
            confidence: 0.8,
            frequency_balance: "balanced",
            dynamic_range_description: "moderate dynamics",
            era_estimation: "balanced modern (2015+)",
        }
    }

    #[test]
    fn test_full_preservation_keeps_source_exactly() {
        let generator = TargetGenerator::new();
        let analysis = sample_analysis(14.0, -13.0, 1.0, 55.0, 35.0);
        let target = generator.generate_target(&analysis, None, 1.0);
        assert!((target.target_lufs - (-13.0)).abs() < 1e-9);
        assert!((target.target_crest_factor - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_compressed_source_gains_dynamics() {
        let generator = TargetGenerator::new();
        let analysis = sample_analysis(9.0, -8.0, 2.0, 60.0, 30.0);
        let target = generator.generate_target(&analysis, None, 0.0);
        assert!(target.target_crest_factor > 9.0);
    }

    #[test]
    fn test_mid_dominant_frequency_balance_preserved() {
        let generator = TargetGenerator::new();
        let analysis = sample_analysis(17.0, -15.0, -1.0, 30.0, 55.0);
        let target = generator.generate_target(&analysis, None, 0.0);
        assert!((target.target_bass_mid_ratio - (-1.0)).abs() < 1e-9);
        assert!((target.target_mid_pct - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_audiophile_intent_pushes_toward_high_dynamics() {
        let generator = TargetGenerator::new();
        let analysis = sample_analysis(15.0, -14.0, 1.0, 55.0, 35.0);
        let baseline = generator.generate_target(&analysis, None, 0.0);
        let audiophile = generator.generate_target(&analysis, Some(UserIntent::Audiophile), 0.0);
        assert!(audiophile.target_crest_factor >= baseline.target_crest_factor);
        assert!(audiophile.target_lufs <= baseline.target_lufs);
    }

    #[test]
    fn test_processing_intensity_is_clamped() {
        let generator = TargetGenerator::new();
        let analysis = sample_analysis(21.0, -8.6, 5.5, 74.6, 21.3);
        let target = generator.generate_target(&analysis, None, 0.0);
        assert!(target.processing_intensity >= 0.0 && target.processing_intensity <= 1.0);
    }
}
