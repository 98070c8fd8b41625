/// Top-level adaptive mastering pipeline: analyze, derive a target (either
/// from a matched reference profile or purely from source content), then
/// drive frequency shaping, compression, and brick-wall limiting from that
/// target. This is the orchestrator the other C1-C12 pieces exist to feed.

use ndarray::{Array2, Axis};

use crate::biquad_filter::MultiBandEQ;
use crate::chunk_processor::{ChunkConfig, ChunkProcessor};
use crate::compressor::{Compressor, CompressorConfig, DetectionMode};
use crate::config::{MasteringConfig, UserPreference as ConfigUserPreference};
use crate::content_analyzer::{ContentAnalysis, ContentAwareAnalyzer};
use crate::error::{MasteringError, Result};
use crate::frequency_analysis::compute_frequency_distribution;
use crate::limiter::{Limiter, LimiterConfig};
use crate::profile_matcher::{ProfileMatcher, UserPreference as ProfilePreference};
use crate::reference_profile::ReferenceProfileStore;
use crate::target_generator::{TargetGenerator, UserIntent};

/// The 31 ISO-standard third-octave center frequencies spanning 20 Hz-20 kHz,
/// the index ranges the 7-band EQ curve is expanded across.
const STANDARD_BAND_TABLE_HZ: [f64; 31] = [
    20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0,
    500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0,
    8000.0, 10000.0, 12500.0, 16000.0, 20000.0,
];

#[derive(Debug, Clone, Copy)]
struct PerceptualBand {
    low_hz: f64,
    high_hz: f64,
    gain_range_db: (f64, f64),
}

/// Per-band gain ranges; sub-bass/bass/low-mid/mid/upper-mid are symmetric,
/// presence and air favor cut over boost (spec's worked example: presence
/// -6/+12 dB).
const PERCEPTUAL_BANDS: [PerceptualBand; 7] = [
    PerceptualBand { low_hz: 20.0, high_hz: 60.0, gain_range_db: (-12.0, 12.0) },    // sub_bass
    PerceptualBand { low_hz: 60.0, high_hz: 250.0, gain_range_db: (-12.0, 12.0) },   // bass
    PerceptualBand { low_hz: 250.0, high_hz: 500.0, gain_range_db: (-8.0, 8.0) },    // low_mid
    PerceptualBand { low_hz: 500.0, high_hz: 2000.0, gain_range_db: (-6.0, 6.0) },   // mid
    PerceptualBand { low_hz: 2000.0, high_hz: 4000.0, gain_range_db: (-8.0, 8.0) },  // upper_mid
    PerceptualBand { low_hz: 4000.0, high_hz: 8000.0, gain_range_db: (-6.0, 12.0) }, // presence
    PerceptualBand { low_hz: 8000.0, high_hz: 20000.0, gain_range_db: (-10.0, 10.0) }, // air
];

fn perceptual_band_index(hz: f64) -> usize {
    PERCEPTUAL_BANDS
        .iter()
        .position(|b| hz >= b.low_hz && hz < b.high_hz)
        .unwrap_or(PERCEPTUAL_BANDS.len() - 1)
}

/// Unifies the two possible sources of T: a profile-matched target (C8) or a
/// purely content-derived continuous target (C7). Only the fields the DSP
/// chain actually consumes survive into this struct.
#[derive(Debug, Clone, Copy)]
struct MasteringTarget {
    target_lufs: f64,
    target_crest_factor: f64,
    bass_pct: f64,
    mid_pct: f64,
    high_pct: f64,
    processing_intensity: f64,
}

fn config_to_profile_preference(pref: ConfigUserPreference) -> ProfilePreference {
    match pref {
        ConfigUserPreference::Audiophile => ProfilePreference::Audiophile,
        ConfigUserPreference::Punchy => ProfilePreference::Loud,
        ConfigUserPreference::Preserve | ConfigUserPreference::Balanced => ProfilePreference::Balanced,
    }
}

fn config_to_user_intent(pref: ConfigUserPreference) -> UserIntent {
    match pref {
        ConfigUserPreference::Audiophile => UserIntent::Audiophile,
        ConfigUserPreference::Punchy => UserIntent::Punchy,
        ConfigUserPreference::Preserve => UserIntent::Preserve,
        ConfigUserPreference::Balanced => UserIntent::Enhance,
    }
}

pub struct HybridProcessor {
    config: MasteringConfig,
    content_analyzer: ContentAwareAnalyzer,
    target_generator: TargetGenerator,
    profiles: Option<ReferenceProfileStore>,
}

impl HybridProcessor {
    pub fn new(config: MasteringConfig) -> Result<Self> {
        config.validate()?;
        let profiles = match ReferenceProfileStore::load(&config.reference_profiles_dir) {
            Ok(store) => Some(store),
            Err(MasteringError::ProfileDirMissing(_)) => None,
            Err(err) => return Err(err),
        };

        Ok(Self {
            config,
            content_analyzer: ContentAwareAnalyzer::new(),
            target_generator: TargetGenerator::new(),
            profiles,
        })
    }

    fn derive_target(&self, analysis: &ContentAnalysis) -> MasteringTarget {
        if let Some(store) = &self.profiles {
            let matcher = ProfileMatcher::new(store);
            let preference = self.config.user_preference.map(config_to_profile_preference);
            let matched = matcher.generate_target(analysis, self.config.preserve_character > 0.5, preference);

            return MasteringTarget {
                target_lufs: matched.target_lufs,
                target_crest_factor: matched.min_crest_factor,
                bass_pct: matched.frequency_target.bass_pct,
                mid_pct: matched.frequency_target.mid_pct,
                high_pct: matched.frequency_target.high_pct,
                processing_intensity: matched.processing_intensity,
            };
        }

        let intent = self.config.user_preference.map(config_to_user_intent);
        let continuous = self.target_generator.generate_target(
            analysis,
            intent,
            self.config.preserve_character,
        );

        MasteringTarget {
            target_lufs: continuous.target_lufs,
            target_crest_factor: continuous.target_crest_factor,
            bass_pct: continuous.target_bass_pct,
            mid_pct: continuous.target_mid_pct,
            high_pct: (100.0 - continuous.target_bass_pct - continuous.target_mid_pct).max(0.0),
            processing_intensity: continuous.processing_intensity,
        }
    }

    /// Builds the 31-band EQ cascade implementing the target's desired
    /// bass/mid/high balance. Each of the 7 perceptual bands gets a gain
    /// proportional to how far the source's measured share of energy in
    /// that region sits from the target's share, then that gain is applied
    /// uniformly to every standard band whose center frequency falls in the
    /// perceptual band's range.
    fn build_eq(&self, source_bands: [f64; 7], target: &MasteringTarget) -> MultiBandEQ {
        let source_bass = source_bands[0] + source_bands[1];
        let source_mid = source_bands[2] + source_bands[3] + source_bands[4];
        let source_high = source_bands[5] + source_bands[6];

        let bass_delta = (target.bass_pct / 100.0) - source_bass;
        let mid_delta = (target.mid_pct / 100.0) - source_mid;
        let high_delta = (target.high_pct / 100.0) - source_high;

        // Split each region's delta across its constituent perceptual bands
        // in proportion to how much of that region's energy each band holds.
        let region_deltas = [
            bass_delta * Self::split_weight(source_bands[0], source_bass),
            bass_delta * Self::split_weight(source_bands[1], source_bass),
            mid_delta * Self::split_weight(source_bands[2], source_mid),
            mid_delta * Self::split_weight(source_bands[3], source_mid),
            mid_delta * Self::split_weight(source_bands[4], source_mid),
            high_delta * Self::split_weight(source_bands[5], source_high),
            high_delta * Self::split_weight(source_bands[6], source_high),
        ];

        const DELTA_TO_DB: f64 = 40.0;

        let perceptual_gains: Vec<f64> = region_deltas
            .iter()
            .zip(PERCEPTUAL_BANDS.iter())
            .map(|(&delta, band)| (delta * DELTA_TO_DB).clamp(band.gain_range_db.0, band.gain_range_db.1))
            .collect();

        let bands: Vec<(f64, f64)> = STANDARD_BAND_TABLE_HZ
            .iter()
            .map(|&hz| (hz, perceptual_gains[perceptual_band_index(hz)]))
            .collect();

        MultiBandEQ::from_bands(self.config.sample_rate as f64, &bands, self.config.channels as usize)
    }

    fn split_weight(band_energy: f64, region_energy: f64) -> f64 {
        if region_energy > 1e-9 { band_energy / region_energy } else { 1.0 / 2.0 }
    }

    fn build_compressor(&self, target: &MasteringTarget) -> Compressor {
        let intensity = target.processing_intensity.clamp(0.0, 1.0);
        let config = CompressorConfig {
            sample_rate: self.config.sample_rate as usize,
            threshold_db: -18.0 - (intensity as f32) * 6.0,
            ratio: 2.0 + (intensity as f32) * 3.0,
            knee_db: self.config.compressor_knee_db,
            attack_ms: self.config.compressor_attack_ms,
            release_ms: self.config.compressor_release_ms,
            makeup_gain_db: 0.0,
            enable_lookahead: true,
            lookahead_ms: 5.0,
        };
        Compressor::new(config)
    }

    fn build_limiter(&self, target: &MasteringTarget) -> Limiter {
        let intensity = target.processing_intensity.clamp(0.0, 1.0);
        let ceiling_db = -1.0 + intensity * 0.7; // -1.0 (gentle) .. -0.3 (aggressive)
        let config = LimiterConfig {
            sample_rate: self.config.sample_rate as usize,
            threshold_db: ceiling_db as f32,
            release_ms: self.config.limiter_release_ms,
            lookahead_ms: self.config.limiter_lookahead_ms,
            isr_enabled: true,
            oversampling: 1,
        };
        Limiter::new(config)
    }

    /// Collapses `audio` (channels x samples) to a single averaged channel,
    /// the basis both analysis (C6) and the 7-band energy split analyze.
    fn to_mono(audio: &Array2<f64>) -> Vec<f64> {
        if audio.shape()[0] > 1 {
            let num_samples = audio.shape()[1];
            (0..num_samples)
                .map(|i| audio.column(i).mean().unwrap_or(0.0))
                .collect()
        } else {
            audio.row(0).to_vec()
        }
    }

    /// Runs the full analyze → derive-target → build-stages sequence and
    /// returns fresh EQ/compressor/limiter instances tuned to `audio`.
    fn analyze_and_build_stages(&self, audio: &Array2<f64>) -> (MultiBandEQ, Compressor, Limiter) {
        let mono = Self::to_mono(audio);
        let analysis = self.content_analyzer.analyze(&mono, self.config.sample_rate as usize);
        let target = self.derive_target(&analysis);

        let mono_f32: Vec<f32> = mono.iter().map(|&s| s as f32).collect();
        let source_bands = compute_frequency_distribution(&mono_f32, self.config.sample_rate);
        let source_bands_arr = [
            source_bands.sub_bass as f64,
            source_bands.bass as f64,
            source_bands.low_mid as f64,
            source_bands.mid as f64,
            source_bands.upper_mid as f64,
            source_bands.presence as f64,
            source_bands.air as f64,
        ];

        let eq = self.build_eq(source_bands_arr, &target);
        let compressor = self.build_compressor(&target);
        let limiter = self.build_limiter(&target);
        (eq, compressor, limiter)
    }

    /// Drives one block of audio through an already-built EQ → compressor →
    /// limiter chain, channel by channel.
    fn run_stages(
        eq: &mut MultiBandEQ,
        compressor: &mut Compressor,
        limiter: &mut Limiter,
        audio: &Array2<f64>,
    ) -> Array2<f64> {
        let eq_out = eq.process_stereo(&audio.view());

        let num_channels = eq_out.shape()[0];
        let num_samples = eq_out.shape()[1];
        let mut processed = Array2::<f64>::zeros((num_channels, num_samples));

        for ch in 0..num_channels {
            let channel: Vec<f32> = eq_out.index_axis(Axis(0), ch).iter().map(|&s| s as f32).collect();
            let (compressed, _info) = compressor.process(&channel, DetectionMode::Hybrid);
            let (limited, _limiting_info) = limiter.process(&compressed);

            for (i, &s) in limited.iter().enumerate() {
                processed[[ch, i]] = s as f64;
            }
        }

        processed
    }

    /// Masters `audio` (channels x samples). `audio_out.shape() ==
    /// audio.shape()` always; a mismatch anywhere in the chain is fatal
    /// rather than silently truncated or padded.
    pub fn process(&self, audio: &Array2<f64>) -> Result<Array2<f64>> {
        let input_shape = audio.shape().to_vec();

        let (mut eq, mut compressor, mut limiter) = self.analyze_and_build_stages(audio);
        let processed = Self::run_stages(&mut eq, &mut compressor, &mut limiter, audio);

        if processed.shape() != input_shape.as_slice() {
            return Err(MasteringError::ShapeInvariant(format!(
                "expected {:?}, got {:?}",
                input_shape,
                processed.shape()
            )));
        }

        Ok(processed)
    }

    /// Streaming/adaptive mode (spec §4.13's last paragraph): analysis and
    /// target generation run at a low duty cycle — every `analysis_interval`
    /// chunks rather than every sample — while `ChunkProcessor`'s
    /// overlap/crossfade carries each chunk's boundary smoothly into the
    /// next, so a parameter update between analyses never produces a click.
    /// `chunk_samples` and `analysis_interval` are both caller-tunable; a
    /// typical choice is a few seconds of audio per chunk with reanalysis
    /// every handful of chunks.
    pub fn process_streaming(
        &self,
        audio: &Array2<f64>,
        chunk_samples: usize,
        analysis_interval: usize,
    ) -> Result<Array2<f64>> {
        let input_shape = audio.shape().to_vec();
        let analysis_interval = analysis_interval.max(1);

        // 50ms crossfade region, clamped so a short chunk_samples never
        // underflows `chunk_size - overlap` in the chunker.
        let crossfade = (self.config.sample_rate as usize / 20).min(chunk_samples / 4).max(1);
        let chunk_config = ChunkConfig {
            chunk_size: chunk_samples,
            overlap: crossfade,
            num_channels: audio.shape()[0],
            crossfade_samples: crossfade,
        };
        let mut chunker = ChunkProcessor::new(chunk_config);

        let (mut eq, mut compressor, mut limiter) = self.analyze_and_build_stages(audio);
        let mut chunk_idx: usize = 0;

        let processed = chunker.process_chunks(&audio.view(), |chunk| {
            if chunk_idx > 0 && chunk_idx % analysis_interval == 0 {
                let chunk_owned = chunk.to_owned();
                let (new_eq, new_compressor, new_limiter) = self.analyze_and_build_stages(&chunk_owned);
                eq = new_eq;
                compressor = new_compressor;
                limiter = new_limiter;
            }
            chunk_idx += 1;

            Self::run_stages(&mut eq, &mut compressor, &mut limiter, &chunk.to_owned())
        });

        if processed.shape() != input_shape.as_slice() {
            return Err(MasteringError::ShapeInvariant(format!(
                "expected {:?}, got {:?}",
                input_shape,
                processed.shape()
            )));
        }

        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn stereo_tone(num_samples: usize, sr: u32) -> Array2<f64> {
        let mut audio = Array2::<f64>::zeros((2, num_samples));
        for i in 0..num_samples {
            let t = i as f64 / sr as f64;
            let s = 0.3 * (2.0 * std::f64::consts::PI * 220.0 * t).sin();
            audio[[0, i]] = s;
            audio[[1, i]] = s;
        }
        audio
    }

    #[test]
    fn test_process_preserves_shape_without_profiles() {
        let mut config = MasteringConfig::default();
        config.reference_profiles_dir = "/nonexistent/profiles/dir/for/unit/test".to_string();
        let processor = HybridProcessor::new(config).expect("missing dir falls back to continuous targets");

        let audio = stereo_tone(22050, 44100);
        let out = processor.process(&audio).expect("process should succeed");
        assert_eq!(out.shape(), audio.shape());
    }

    #[test]
    fn test_silence_round_trips_without_panicking() {
        let mut config = MasteringConfig::default();
        config.reference_profiles_dir = "/nonexistent/profiles/dir/for/unit/test".to_string();
        let processor = HybridProcessor::new(config).unwrap();

        let audio = Array2::<f64>::zeros((2, 4410));
        let out = processor.process(&audio).unwrap();
        assert_eq!(out.shape(), audio.shape());
    }

    #[test]
    fn test_mono_input_preserves_shape() {
        let mut config = MasteringConfig::default();
        config.reference_profiles_dir = "/nonexistent/profiles/dir/for/unit/test".to_string();
        config.channels = 1;
        let processor = HybridProcessor::new(config).unwrap();

        let mut audio = Array2::<f64>::zeros((1, 8820));
        for i in 0..8820 {
            audio[[0, i]] = 0.2 * (i as f64 * 0.05).sin();
        }
        let out = processor.process(&audio).unwrap();
        assert_eq!(out.shape(), audio.shape());
    }

    #[test]
    fn test_streaming_preserves_shape_across_chunk_boundaries() {
        let mut config = MasteringConfig::default();
        config.reference_profiles_dir = "/nonexistent/profiles/dir/for/unit/test".to_string();
        let processor = HybridProcessor::new(config).unwrap();

        // 5 chunks' worth of audio at a small chunk size, forcing several
        // reanalysis boundaries within one call.
        let audio = stereo_tone(5000, 44100);
        let out = processor.process_streaming(&audio, 1000, 2).expect("streaming process should succeed");
        assert_eq!(out.shape(), audio.shape());
    }

    #[test]
    fn test_perceptual_band_index_covers_full_range() {
        assert_eq!(perceptual_band_index(20.0), 0);
        assert_eq!(perceptual_band_index(100.0), 1);
        assert_eq!(perceptual_band_index(300.0), 2);
        assert_eq!(perceptual_band_index(1000.0), 3);
        assert_eq!(perceptual_band_index(3000.0), 4);
        assert_eq!(perceptual_band_index(5000.0), 5);
        assert_eq!(perceptual_band_index(15000.0), 6);
    }
}
