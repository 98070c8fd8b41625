/// Real-time harmonic metrics: `harmonic_ratio`, `pitch_stability`,
/// `chroma_energy`. Analysis happens in non-overlapping chunks (the
/// batch HPSS/YIN/chroma algorithms need a meaningful window to be
/// accurate), with running sums feeding the O(1) per-chunk aggregation.

use std::collections::VecDeque;

use crate::chroma::chroma_cqt;
use crate::hpss::{hpss, HpssConfig};
use crate::metrics::MetricUtils;
use crate::yin::yin;

const EPSILON: f64 = 1e-10;
const PITCH_HISTORY_CAPACITY: usize = 1000;

struct HarmonicRunningStats {
    count: u64,
    harmonic_sum: f64,
    pitch_values: VecDeque<f64>,
    chroma_sum: f64,
}

impl HarmonicRunningStats {
    fn new() -> Self {
        Self {
            count: 0,
            harmonic_sum: 0.0,
            pitch_values: VecDeque::with_capacity(PITCH_HISTORY_CAPACITY),
            chroma_sum: 0.0,
        }
    }

    fn update_harmonic(&mut self, ratio: f64) {
        self.count += 1;
        self.harmonic_sum += ratio;
    }

    fn update_pitch(&mut self, f0: &[f64]) {
        for &v in f0.iter().filter(|&&v| v > 0.0) {
            if self.pitch_values.len() >= PITCH_HISTORY_CAPACITY {
                self.pitch_values.pop_front();
            }
            self.pitch_values.push_back(v);
        }
    }

    fn update_chroma(&mut self, energy: f64) {
        self.chroma_sum += energy;
    }

    fn harmonic_ratio(&self) -> f64 {
        if self.count > 0 { self.harmonic_sum / self.count as f64 } else { 0.5 }
    }

    fn pitch_stability(&self) -> f64 {
        if self.pitch_values.len() < 10 {
            return 0.5;
        }
        let values: Vec<f64> = self.pitch_values.iter().copied().collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        if mean <= 0.0 {
            return 0.7;
        }
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt();
        let cv = std / mean;
        MetricUtils::stability_from_cv(cv, 10.0).clamp(0.0, 1.0)
    }

    fn chroma_energy(&self) -> f64 {
        if self.count > 0 {
            let energy = self.chroma_sum / self.count as f64;
            MetricUtils::normalize_to_range(energy, 0.4, true)
        } else {
            0.5
        }
    }

    fn reset(&mut self) {
        self.count = 0;
        self.harmonic_sum = 0.0;
        self.pitch_values.clear();
        self.chroma_sum = 0.0;
    }
}

pub struct StreamingHarmonicAnalyzer {
    sr: u32,
    chunk_samples: usize,
    audio_buffer: VecDeque<f32>,
    buffer_capacity: usize,
    stats: HarmonicRunningStats,
    frame_count: u64,
    chunk_count: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct HarmonicMetrics {
    pub harmonic_ratio: f64,
    pub pitch_stability: f64,
    pub chroma_energy: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct HarmonicConfidence {
    pub harmonic_ratio: f64,
    pub pitch_stability: f64,
    pub chroma_energy: f64,
}

impl StreamingHarmonicAnalyzer {
    pub fn new(sr: u32) -> Self {
        Self::with_params(sr, 0.5)
    }

    pub fn with_params(sr: u32, chunk_duration_s: f64) -> Self {
        let chunk_samples = (sr as f64 * chunk_duration_s) as usize;
        Self {
            sr,
            chunk_samples: chunk_samples.max(1),
            audio_buffer: VecDeque::new(),
            buffer_capacity: (sr as f64 * 5.0) as usize,
            stats: HarmonicRunningStats::new(),
            frame_count: 0,
            chunk_count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.audio_buffer.clear();
        self.stats.reset();
        self.frame_count = 0;
        self.chunk_count = 0;
    }

    pub fn update(&mut self, frame: &[f32]) -> HarmonicMetrics {
        self.frame_count += 1;

        self.audio_buffer.extend(frame.iter().copied());
        while self.audio_buffer.len() > self.buffer_capacity {
            self.audio_buffer.pop_front();
        }

        if self.audio_buffer.len() >= self.chunk_samples {
            let chunk: Vec<f32> = self.audio_buffer.iter().take(self.chunk_samples).copied().collect();
            self.analyze_chunk(&chunk);
            self.chunk_count += 1;
        }

        self.metrics()
    }

    fn analyze_chunk(&mut self, chunk: &[f32]) {
        let audio: Vec<f64> = chunk.iter().map(|&s| s as f64).collect();

        let (harmonic, percussive) = hpss(&audio, &HpssConfig::default());
        let harmonic_energy = (harmonic.iter().map(|v| v * v).sum::<f64>() / harmonic.len().max(1) as f64).sqrt();
        let percussive_energy = (percussive.iter().map(|v| v * v).sum::<f64>() / percussive.len().max(1) as f64).sqrt();
        let total_energy = harmonic_energy + percussive_energy;
        let ratio = if total_energy > EPSILON { harmonic_energy / total_energy } else { 0.5 };
        self.stats.update_harmonic(ratio.clamp(0.0, 1.0));

        let f0 = yin(&audio, self.sr as usize, 65.0, 2093.0);
        self.stats.update_pitch(&f0);

        let chroma = chroma_cqt(&audio, self.sr as usize);
        let chroma_energy = chroma.mean().unwrap_or(0.5);
        self.stats.update_chroma(chroma_energy);
    }

    pub fn metrics(&self) -> HarmonicMetrics {
        HarmonicMetrics {
            harmonic_ratio: self.stats.harmonic_ratio().clamp(0.0, 1.0),
            pitch_stability: self.stats.pitch_stability().clamp(0.0, 1.0),
            chroma_energy: self.stats.chroma_energy().clamp(0.0, 1.0),
        }
    }

    pub fn confidence(&self) -> HarmonicConfidence {
        let c = (self.chunk_count as f64 / 5.0).clamp(0.0, 1.0);
        HarmonicConfidence {
            harmonic_ratio: c,
            pitch_stability: c,
            chroma_energy: c,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harmonic_ratio_stays_in_unit_range() {
        let mut analyzer = StreamingHarmonicAnalyzer::new(44100);
        let frame: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 44100.0).sin() * 0.4)
            .collect();
        let mut metrics = analyzer.metrics();
        for _ in 0..10 {
            metrics = analyzer.update(&frame);
        }
        assert!(metrics.harmonic_ratio >= 0.0 && metrics.harmonic_ratio <= 1.0);
    }

    #[test]
    fn test_chunk_count_increments() {
        let mut analyzer = StreamingHarmonicAnalyzer::new(44100);
        let frame = vec![0.1_f32; 4410];
        analyzer.update(&frame);
        assert!(analyzer.chunk_count() > 0);
    }
}
