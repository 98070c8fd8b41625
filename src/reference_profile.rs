/// Reference-profile file format and directory loading.
///
/// A profile is a read-only, pre-measured description of a mastering
/// reference track, stored as one UTF-8 JSON document per profile. The
/// profile set never changes at runtime: all profiles are loaded once at
/// construction and held behind an immutable map thereafter.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MasteringError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: u32,
    pub remaster_year: Option<u32>,
    pub engineer: Option<String>,
    pub genre: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoudnessInfo {
    pub integrated_lufs: f64,
    pub rms_db: f64,
    pub peak_db: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DynamicRangeInfo {
    pub crest_factor_db: f64,
    pub peak_db: f64,
    pub rms_db: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrequencyResponseInfo {
    pub bass_energy_pct: f64,
    pub mid_energy_pct: f64,
    pub high_energy_pct: f64,
    pub bass_to_mid_ratio_db: f64,
    pub high_to_mid_ratio_db: f64,
    pub spectral_centroid_hz: f64,
    pub spectral_rolloff_hz: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StereoFieldInfo {
    pub stereo_width: f64,
    pub side_energy_db: f64,
    pub correlation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceProfile {
    pub track_info: TrackInfo,
    pub loudness: LoudnessInfo,
    pub dynamic_range: DynamicRangeInfo,
    pub frequency_response: FrequencyResponseInfo,
    pub stereo_field: StereoFieldInfo,
    /// Third-octave band levels in dB, keyed by center frequency in Hz as a string
    /// (JSON object keys must be strings; see the schema documented alongside this type).
    pub third_octave_bands: HashMap<String, f64>,
}

/// The seven named, stable profile keys shipped with the engine and their
/// filenames on disk.
pub const PROFILE_FILES: &[(&str, &str)] = &[
    ("steven_wilson_2021", "steven_wilson_prodigal_2021.json"),
    ("steven_wilson_2024", "steven_wilson_normal_2024.json"),
    ("acdc_highway_to_hell", "acdc_highway_to_hell_2003.json"),
    ("blind_guardian", "power_metal_blind_guardian.json"),
    ("bob_marley_legend", "bob_marley_legend_2002.json"),
    ("joe_satriani", "joe_satriani_cant_go_back_2014.json"),
    ("dio_holy_diver", "dio_holy_diver_2005.json"),
];

pub struct ReferenceProfileStore {
    profiles: HashMap<String, ReferenceProfile>,
}

impl ReferenceProfileStore {
    /// Loads every named profile from `profiles_dir`. Fatal if the
    /// directory itself is missing; an individual missing or unparsable
    /// file is logged as a warning and simply absent from the map.
    pub fn load(profiles_dir: impl AsRef<Path>) -> Result<Self> {
        let profiles_dir = profiles_dir.as_ref();
        if !profiles_dir.is_dir() {
            return Err(MasteringError::ProfileDirMissing(
                profiles_dir.display().to_string(),
            ));
        }

        let mut profiles = HashMap::new();
        for &(key, filename) in PROFILE_FILES {
            let path: PathBuf = profiles_dir.join(filename);
            match Self::load_one(&path) {
                Ok(profile) => {
                    profiles.insert(key.to_string(), profile);
                }
                Err(err) => {
                    tracing::warn!(profile = key, path = %path.display(), error = %err, "reference profile unavailable");
                }
            }
        }

        Ok(Self { profiles })
    }

    fn load_one(path: &Path) -> Result<ReferenceProfile> {
        let contents = fs::read_to_string(path).map_err(|source| MasteringError::ProfileIo {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| MasteringError::ProfileParse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn get(&self, key: &str) -> Option<&ReferenceProfile> {
        self.profiles.get(key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.profiles.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_profile(dir: &Path, filename: &str) {
        let json = r#"{
            "track_info": {"title": "t", "artist": "a", "album": "al", "year": 2021,
                            "remaster_year": null, "engineer": null, "genre": null, "format": null},
            "loudness": {"integrated_lufs": -18.3, "rms_db": -20.0, "peak_db": -1.0},
            "dynamic_range": {"crest_factor_db": 18.5, "peak_db": -1.0, "rms_db": -20.0},
            "frequency_response": {"bass_energy_pct": 40.0, "mid_energy_pct": 45.0, "high_energy_pct": 15.0,
                                    "bass_to_mid_ratio_db": -0.5, "high_to_mid_ratio_db": -3.0,
                                    "spectral_centroid_hz": 1800.0, "spectral_rolloff_hz": 6000.0},
            "stereo_field": {"stereo_width": 0.6, "side_energy_db": -12.0, "correlation": 0.7},
            "third_octave_bands": {"100": -2.0, "1000": 0.0, "8000": -4.0}
        }"#;
        let mut file = fs::File::create(dir.join(filename)).unwrap();
        file.write_all(json.as_bytes()).unwrap();
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let result = ReferenceProfileStore::load("/nonexistent/path/for/profiles");
        assert!(matches!(result, Err(MasteringError::ProfileDirMissing(_))));
    }

    #[test]
    fn test_missing_individual_file_is_tolerated() {
        let tmp = std::env::temp_dir().join(format!("profiles_test_{}", std::process::id()));
        fs::create_dir_all(&tmp).unwrap();
        write_profile(&tmp, "steven_wilson_prodigal_2021.json");

        let store = ReferenceProfileStore::load(&tmp).unwrap();
        assert!(store.get("steven_wilson_2021").is_some());
        assert!(store.get("dio_holy_diver").is_none());

        fs::remove_dir_all(&tmp).ok();
    }
}
