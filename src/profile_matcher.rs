/// Profile matching: selects one of the seven reference profiles for a
/// measurement, adjusts its numeric targets toward the source to preserve
/// artistic character, and reports a human-readable description of the
/// adjustment. Never infers from genre or metadata, only from the
/// content analysis already computed.

use crate::content_analyzer::ContentAnalysis;
use crate::metrics::MetricUtils;
use crate::reference_profile::ReferenceProfileStore;

const MAX_LUFS_CHANGE: f64 = 6.0;
const MAX_CREST_CHANGE: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserPreference {
    Audiophile,
    Loud,
    Balanced,
}

#[derive(Debug, Clone, Copy)]
pub struct FrequencyTarget {
    pub bass_pct: f64,
    pub mid_pct: f64,
    pub high_pct: f64,
    pub bass_to_mid_db: f64,
    pub high_to_mid_db: f64,
}

#[derive(Debug, Clone)]
pub struct MatchedTarget {
    pub profile_key: String,
    pub confidence: f64,
    pub target_lufs: f64,
    pub min_crest_factor: f64,
    pub frequency_target: FrequencyTarget,
    pub processing_intensity: f64,
    pub preserve_character: bool,
    pub adjustments_made: String,
}

pub struct ProfileMatcher<'a> {
    store: &'a ReferenceProfileStore,
}

impl<'a> ProfileMatcher<'a> {
    pub fn new(store: &'a ReferenceProfileStore) -> Self {
        Self { store }
    }

    pub fn generate_target(
        &self,
        content_analysis: &ContentAnalysis,
        preserve_character: bool,
        user_preference: Option<UserPreference>,
    ) -> MatchedTarget {
        let confidence = content_analysis.confidence;
        let mut profile_key = content_analysis.profile_match.to_string();
        let mut profile = self.store.get(&profile_key);

        if profile.is_none() {
            tracing::warn!(profile = %profile_key, "matched profile not found, using default");
            profile_key = "steven_wilson_2021".to_string();
            profile = self.store.get(&profile_key);
        }

        if let Some(preference) = user_preference {
            let (key, resolved) = self.apply_user_preference(preference);
            tracing::info!(preference = ?preference, profile = %key, "user preference applied");
            profile_key = key;
            profile = resolved;
        }

        let profile = match profile {
            Some(p) => p,
            None => {
                // No profile on disk at all (e.g. empty store in a test fixture);
                // fall through with the source's own characteristics as target.
                return self.fallback_target(content_analysis, profile_key, confidence, preserve_character);
            }
        };

        let mut target_lufs = profile.loudness.integrated_lufs;
        let mut target_crest = profile.dynamic_range.crest_factor_db;

        if preserve_character {
            let (adj_lufs, adj_crest) = self.adjust_for_character_preservation(
                target_lufs,
                target_crest,
                content_analysis,
            );
            target_lufs = adj_lufs;
            target_crest = adj_crest;
        }

        let processing_intensity = Self::calculate_processing_intensity(
            content_analysis,
            target_lufs,
            target_crest,
            confidence,
        );

        let frequency_target = FrequencyTarget {
            bass_pct: profile.frequency_response.bass_energy_pct,
            mid_pct: profile.frequency_response.mid_energy_pct,
            high_pct: profile.frequency_response.high_energy_pct,
            bass_to_mid_db: profile.frequency_response.bass_to_mid_ratio_db,
            high_to_mid_db: profile.frequency_response.high_to_mid_ratio_db,
        };

        let adjustments_made = self.describe_adjustments(
            content_analysis,
            target_lufs,
            target_crest,
            &profile_key,
        );

        MatchedTarget {
            profile_key,
            confidence,
            target_lufs,
            min_crest_factor: target_crest,
            frequency_target,
            processing_intensity,
            preserve_character,
            adjustments_made,
        }
    }

    fn fallback_target(
        &self,
        content_analysis: &ContentAnalysis,
        profile_key: String,
        confidence: f64,
        preserve_character: bool,
    ) -> MatchedTarget {
        MatchedTarget {
            profile_key,
            confidence,
            target_lufs: content_analysis.dynamic.estimated_lufs,
            min_crest_factor: content_analysis.dynamic.crest_factor_db,
            frequency_target: FrequencyTarget {
                bass_pct: content_analysis.spectral.bass_pct,
                mid_pct: content_analysis.spectral.mid_pct,
                high_pct: content_analysis.spectral.high_pct,
                bass_to_mid_db: content_analysis.spectral.bass_to_mid_db,
                high_to_mid_db: content_analysis.spectral.high_to_mid_db,
            },
            processing_intensity: 0.0,
            preserve_character,
            adjustments_made: "no reference profiles available, passthrough".to_string(),
        }
    }

    fn apply_user_preference(
        &self,
        preference: UserPreference,
    ) -> (String, Option<&'a crate::reference_profile::ReferenceProfile>) {
        let key = match preference {
            UserPreference::Audiophile => "steven_wilson_2024",
            UserPreference::Loud => "dio_holy_diver",
            UserPreference::Balanced => "blind_guardian",
        };
        (key.to_string(), self.store.get(key))
    }

    /// Don't change loudness or dynamics too drastically from the source;
    /// the artist's own intent takes priority over the matched profile.
    fn adjust_for_character_preservation(
        &self,
        target_lufs: f64,
        target_crest: f64,
        content_analysis: &ContentAnalysis,
    ) -> (f64, f64) {
        let source_lufs = content_analysis.dynamic.estimated_lufs;
        let source_crest = content_analysis.dynamic.crest_factor_db;

        let lufs_change = target_lufs - source_lufs;
        let crest_change = target_crest - source_crest;

        let adjusted_lufs = if lufs_change.abs() > MAX_LUFS_CHANGE {
            source_lufs + lufs_change.signum() * MAX_LUFS_CHANGE
        } else {
            target_lufs
        };

        let mut adjusted_crest = if crest_change.abs() > MAX_CREST_CHANGE {
            source_crest + crest_change.signum() * MAX_CREST_CHANGE
        } else {
            target_crest
        };

        if source_crest > 16.0 && adjusted_crest < source_crest {
            adjusted_crest = source_crest;
        }

        (adjusted_lufs, adjusted_crest)
    }

    fn calculate_processing_intensity(
        content_analysis: &ContentAnalysis,
        target_lufs: f64,
        target_crest: f64,
        confidence: f64,
    ) -> f64 {
        let source_lufs = content_analysis.dynamic.estimated_lufs;
        let source_crest = content_analysis.dynamic.crest_factor_db;

        let lufs_distance = (target_lufs - source_lufs).abs();
        let crest_distance = (target_crest - source_crest).abs();

        let lufs_norm = MetricUtils::normalize_to_range(lufs_distance, 10.0, true);
        let crest_norm = MetricUtils::normalize_to_range(crest_distance, 8.0, true);

        let mut intensity = lufs_norm * 0.6 + crest_norm * 0.4;
        intensity *= 0.5 + confidence * 0.5;

        MetricUtils::normalize_to_range(intensity, 1.0, true)
    }

    fn describe_adjustments(
        &self,
        content_analysis: &ContentAnalysis,
        target_lufs: f64,
        target_crest: f64,
        profile_key: &str,
    ) -> String {
        let source_lufs = content_analysis.dynamic.estimated_lufs;
        let source_crest = content_analysis.dynamic.crest_factor_db;

        let lufs_change = target_lufs - source_lufs;
        let crest_change = target_crest - source_crest;

        let mut parts = Vec::new();

        if lufs_change.abs() < 1.0 {
            parts.push("minimal loudness adjustment".to_string());
        } else if lufs_change < -3.0 {
            parts.push(format!("significant volume reduction ({:.1} dB)", lufs_change));
        } else if lufs_change < 0.0 {
            parts.push(format!("moderate volume reduction ({:.1} dB)", lufs_change));
        } else if lufs_change > 3.0 {
            parts.push(format!("significant volume increase (+{:.1} dB)", lufs_change));
        } else {
            parts.push(format!("moderate volume increase (+{:.1} dB)", lufs_change));
        }

        if crest_change.abs() < 1.0 {
            parts.push("dynamics preserved".to_string());
        } else if crest_change < -2.0 {
            parts.push(format!("dynamics reduced ({:.1} dB)", crest_change));
        } else if crest_change < 0.0 {
            parts.push(format!("dynamics slightly reduced ({:.1} dB)", crest_change));
        } else if crest_change > 2.0 {
            parts.push(format!("dynamics enhanced (+{:.1} dB)", crest_change));
        } else {
            parts.push(format!("dynamics slightly enhanced (+{:.1} dB)", crest_change));
        }

        parts.push(format!("using {} reference", profile_key.replace('_', " ")));

        parts.join(", ")
    }

    pub fn all_profile_keys(&self) -> Vec<&str> {
        self.store.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_analyzer::{DynamicContent, EnergyContent, SpectralContent};
    use crate::reference_profile::ReferenceProfileStore;
    use std::fs;
    use std::io::Write;

    fn profile_json(lufs: f64, crest: f64) -> String {
        format!(
            r#"{{
            "track_info": {{"title": "t", "artist": "a", "album": "al", "year": 2021,
                            "remaster_year": null, "engineer": null, "genre": null, "format": null}},
            "loudness": {{"integrated_lufs": {lufs}, "rms_db": -20.0, "peak_db": -1.0}},
            "dynamic_range": {{"crest_factor_db": {crest}, "peak_db": -1.0, "rms_db": -20.0}},
            "frequency_response": {{"bass_energy_pct": 40.0, "mid_energy_pct": 45.0, "high_energy_pct": 15.0,
                                    "bass_to_mid_ratio_db": -0.5, "high_to_mid_ratio_db": -3.0,
                                    "spectral_centroid_hz": 1800.0, "spectral_rolloff_hz": 6000.0}},
            "stereo_field": {{"stereo_width": 0.6, "side_energy_db": -12.0, "correlation": 0.7}},
            "third_octave_bands": {{"100": -2.0, "1000": 0.0, "8000": -4.0}}
        }}"#
        )
    }

    fn setup_store() -> (ReferenceProfileStore, std::path::PathBuf) {
        let tmp = std::env::temp_dir().join(format!("profile_matcher_test_{}", std::process::id()));
        fs::create_dir_all(&tmp).unwrap();
        let mut f = fs::File::create(tmp.join("steven_wilson_prodigal_2021.json")).unwrap();
        f.write_all(profile_json(-18.3, 18.5).as_bytes()).unwrap();
        let mut f = fs::File::create(tmp.join("dio_holy_diver_2005.json")).unwrap();
        f.write_all(profile_json(-8.6, 11.6).as_bytes()).unwrap();
        let store = ReferenceProfileStore::load(&tmp).unwrap();
        (store, tmp)
    }

    fn sample_analysis() -> ContentAnalysis {
        ContentAnalysis {
            spectral: SpectralContent {
                bass_pct: 55.0,
                mid_pct: 35.0,
                high_pct: 10.0,
                bass_to_mid_db: 1.0,
                high_to_mid_db: -2.0,
                spectral_centroid: 1500.0,
            },
            dynamic: DynamicContent {
                rms_db: -16.0,
                peak_db: -4.0,
                crest_factor_db: 12.0,
                estimated_lufs: -13.0,
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
    fn test_lufs_change_is_capped() {
        let (store, tmp) = setup_store();
        let matcher = ProfileMatcher::new(&store);
        let analysis = sample_analysis();
        let target = matcher.generate_target(&analysis, true, None);
        assert!((target.target_lufs - analysis.dynamic.estimated_lufs).abs() <= MAX_LUFS_CHANGE + 1e-9);
        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn test_excellent_source_dynamics_are_preserved_not_reduced() {
        let (store, tmp) = setup_store();
        let matcher = ProfileMatcher::new(&store);
        let mut analysis = sample_analysis();
        analysis.dynamic.crest_factor_db = 19.0;
        analysis.profile_match = "dio_holy_diver";
        let target = matcher.generate_target(&analysis, true, None);
        assert!(target.min_crest_factor >= 19.0);
        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn test_loud_preference_selects_dio_holy_diver() {
        let (store, tmp) = setup_store();
        let matcher = ProfileMatcher::new(&store);
        let analysis = sample_analysis();
        let target = matcher.generate_target(&analysis, false, Some(UserPreference::Loud));
        assert_eq!(target.profile_key, "dio_holy_diver");
        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn test_intensity_in_unit_range() {
        let (store, tmp) = setup_store();
        let matcher = ProfileMatcher::new(&store);
        let analysis = sample_analysis();
        let target = matcher.generate_target(&analysis, true, None);
        assert!(target.processing_intensity >= 0.0 && target.processing_intensity <= 1.0);
        fs::remove_dir_all(&tmp).ok();
    }
}
