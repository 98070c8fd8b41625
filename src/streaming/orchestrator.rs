/// Orchestrates the four streaming analyzers into one incremental
/// 13-dimension fingerprint (extended to 16D with the optional harmonic
/// component), suitable for real-time or chunk-at-a-time callers that
/// cannot afford to re-run the batch [`crate::fingerprint_compute`] path
/// on every update.

use std::collections::HashMap;

use super::harmonic::{HarmonicConfidence, HarmonicMetrics, StreamingHarmonicAnalyzer};
use super::spectral::{SpectralConfidence, SpectralMetrics, StreamingSpectralAnalyzer};
use super::temporal::{StreamingTemporalAnalyzer, TemporalConfidence, TemporalMetrics};
use super::variation::{StreamingVariationAnalyzer, VariationConfidence, VariationMetrics};

pub struct StreamingFingerprint {
    enable_harmonic: bool,
    variation: StreamingVariationAnalyzer,
    spectral: StreamingSpectralAnalyzer,
    temporal: StreamingTemporalAnalyzer,
    harmonic: Option<StreamingHarmonicAnalyzer>,
    frame_count: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct StreamingFrame {
    pub variation: VariationMetrics,
    pub spectral: SpectralMetrics,
    pub temporal: TemporalMetrics,
    pub harmonic: Option<HarmonicMetrics>,
}

impl StreamingFingerprint {
    pub fn new(sr: u32, enable_harmonic: bool) -> Self {
        Self {
            enable_harmonic,
            variation: StreamingVariationAnalyzer::new(sr),
            spectral: StreamingSpectralAnalyzer::new(sr),
            temporal: StreamingTemporalAnalyzer::new(sr),
            harmonic: enable_harmonic.then(|| StreamingHarmonicAnalyzer::new(sr)),
            frame_count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.variation.reset();
        self.spectral.reset();
        self.temporal.reset();
        if let Some(h) = self.harmonic.as_mut() {
            h.reset();
        }
        self.frame_count = 0;
    }

    pub fn update(&mut self, frame: &[f32]) -> StreamingFrame {
        self.frame_count += 1;

        let variation = self.variation.update(frame);
        let spectral = self.spectral.update(frame);
        let temporal = self.temporal.update(frame);
        let harmonic = self.harmonic.as_mut().map(|h| h.update(frame));

        StreamingFrame { variation, spectral, temporal, harmonic }
    }

    pub fn fingerprint(&self) -> StreamingFrame {
        StreamingFrame {
            variation: self.variation.metrics(),
            spectral: self.spectral.metrics(),
            temporal: self.temporal.metrics(),
            harmonic: self.harmonic.as_ref().map(|h| h.metrics()),
        }
    }

    pub fn confidence(&self) -> HashMap<&'static str, f64> {
        let v = self.variation.confidence();
        let s = self.spectral.confidence();
        let t = self.temporal.confidence();

        let mut map = HashMap::new();
        map.insert("dynamic_range_variation", v.dynamic_range_variation);
        map.insert("loudness_variation_std", v.loudness_variation_std);
        map.insert("peak_consistency", v.peak_consistency);
        map.insert("spectral_centroid", s.spectral_centroid);
        map.insert("spectral_rolloff", s.spectral_rolloff);
        map.insert("spectral_flatness", s.spectral_flatness);
        map.insert("tempo_bpm", t.tempo_bpm);
        map.insert("rhythm_stability", t.rhythm_stability);
        map.insert("transient_density", t.transient_density);
        map.insert("silence_ratio", t.silence_ratio);

        if let Some(h) = self.harmonic.as_ref() {
            let hc: HarmonicConfidence = h.confidence();
            map.insert("harmonic_ratio", hc.harmonic_ratio);
            map.insert("pitch_stability", hc.pitch_stability);
            map.insert("chroma_energy", hc.chroma_energy);
        }

        map
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fingerprint_size(&self) -> usize {
        let base = 3 + 3 + 4;
        if self.enable_harmonic { base + 3 } else { base }
    }

    /// Conservative latency estimate dominated by the temporal analyzer's
    /// periodic beat tracking, not the per-frame O(1) components.
    pub fn latency_estimate_ms(&self) -> f64 {
        50.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_size_with_and_without_harmonic() {
        let with_harmonic = StreamingFingerprint::new(44100, true);
        let without_harmonic = StreamingFingerprint::new(44100, false);
        assert_eq!(with_harmonic.fingerprint_size(), 13);
        assert_eq!(without_harmonic.fingerprint_size(), 10);
    }

    #[test]
    fn test_update_advances_frame_count() {
        let mut sf = StreamingFingerprint::new(44100, false);
        let frame = vec![0.1_f32; 2205];
        sf.update(&frame);
        sf.update(&frame);
        assert_eq!(sf.frame_count(), 2);
    }

    #[test]
    fn test_reset_zeroes_frame_count() {
        let mut sf = StreamingFingerprint::new(44100, false);
        let frame = vec![0.1_f32; 2205];
        sf.update(&frame);
        sf.reset();
        assert_eq!(sf.frame_count(), 0);
    }
}
