/// Top-level configuration for the mastering engine.
///
/// A `MasteringConfig` is the single source of dynamic behavior: there are
/// no CLI flags, environment variables, or other persisted state beyond the
/// reference-profile JSON files on disk. `#[serde(deny_unknown_fields)]`
/// means an unrecognized key in a config file is rejected at deserialization
/// time rather than silently ignored.

use serde::{Deserialize, Serialize};

use crate::error::{MasteringError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserPreference {
    Audiophile,
    Punchy,
    Preserve,
    Balanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MasteringConfig {
    pub sample_rate: u32,
    pub channels: u32,

    /// Directory containing the seven named reference-profile JSON files.
    pub reference_profiles_dir: String,

    /// Optional caller intent that biases target generation toward a
    /// specific style instead of purely content-aware defaults.
    pub user_preference: Option<UserPreference>,

    /// How strongly to preserve the source's own dynamic/tonal character
    /// versus pulling fully toward the matched target, in `[0, 1]`.
    pub preserve_character: f64,

    /// Worker pool cap for parallel fingerprinting; actual pool size is
    /// `min(max_workers, available_parallelism)`.
    pub max_workers: usize,

    pub limiter_threshold_db: f32,
    pub limiter_release_ms: f32,
    pub limiter_lookahead_ms: f32,

    pub compressor_ratio: f32,
    pub compressor_knee_db: f32,
    pub compressor_attack_ms: f32,
    pub compressor_release_ms: f32,

    /// Streaming chunk size in samples per channel.
    pub chunk_size: usize,
}

impl Default for MasteringConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            reference_profiles_dir: "profiles".to_string(),
            user_preference: None,
            preserve_character: 0.5,
            max_workers: 8,
            limiter_threshold_db: -0.1,
            limiter_release_ms: 50.0,
            limiter_lookahead_ms: 5.0,
            compressor_ratio: 4.0,
            compressor_knee_db: 6.0,
            compressor_attack_ms: 10.0,
            compressor_release_ms: 100.0,
            chunk_size: 131072,
        }
    }
}

impl MasteringConfig {
    /// Validates invariants that can't be expressed in the type system:
    /// a non-finite or non-positive sample rate, an out-of-range
    /// `preserve_character`, or a zero worker/chunk budget are all fatal at
    /// construction, never discovered mid-stream.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate as f64).is_finite() || self.sample_rate == 0 {
            return Err(MasteringError::InvalidSampleRate(self.sample_rate as f64));
        }
        if self.channels == 0 {
            return Err(MasteringError::InvalidConfig {
                field: "channels".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.preserve_character) {
            return Err(MasteringError::InvalidConfig {
                field: "preserve_character".to_string(),
                message: "must be in [0, 1]".to_string(),
            });
        }
        if self.max_workers == 0 {
            return Err(MasteringError::InvalidConfig {
                field: "max_workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(MasteringError::InvalidConfig {
                field: "chunk_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Effective worker count for the parallel pool: `min(max_workers, 8)`
    /// capped further by the caller-supplied available parallelism.
    pub fn effective_workers(&self, available_parallelism: usize) -> usize {
        self.max_workers.min(8).min(available_parallelism.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(MasteringConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let mut config = MasteringConfig::default();
        config.sample_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_preserve_character_rejected() {
        let mut config = MasteringConfig::default();
        config.preserve_character = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_workers_caps_at_eight() {
        let mut config = MasteringConfig::default();
        config.max_workers = 64;
        assert_eq!(config.effective_workers(64), 8);
    }

    #[test]
    fn test_unknown_field_rejected_at_deserialization() {
        let json = r#"{
            "sample_rate": 44100,
            "channels": 2,
            "reference_profiles_dir": "profiles",
            "user_preference": null,
            "preserve_character": 0.5,
            "max_workers": 8,
            "limiter_threshold_db": -0.1,
            "limiter_release_ms": 50.0,
            "limiter_lookahead_ms": 5.0,
            "compressor_ratio": 4.0,
            "compressor_knee_db": 6.0,
            "compressor_attack_ms": 10.0,
            "compressor_release_ms": 100.0,
            "chunk_size": 131072,
            "bogus_field": true
        }"#;
        let parsed: std::result::Result<MasteringConfig, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }
}
