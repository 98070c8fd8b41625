/// Real-time dynamic-variation metrics: `dynamic_range_variation`,
/// `loudness_variation_std`, `peak_consistency`. Each updates in O(1) per
/// frame via [`RunningStatistics`](super::welford::RunningStatistics) —
/// no re-scan of sample history is ever needed.

use std::collections::VecDeque;

use super::welford::{RunningStatistics, WindowedBuffer};

pub struct StreamingVariationAnalyzer {
    sr: u32,
    hop_length: usize,
    frame_length: usize,
    rms_window: WindowedBuffer,
    peak_window: WindowedBuffer,
    rms_stats: RunningStatistics,
    peak_stats: RunningStatistics,
    audio_buffer: VecDeque<f32>,
    frame_count: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct VariationMetrics {
    pub dynamic_range_variation: f64,
    pub loudness_variation_std: f64,
    pub peak_consistency: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct VariationConfidence {
    pub dynamic_range_variation: f64,
    pub loudness_variation_std: f64,
    pub peak_consistency: f64,
}

impl StreamingVariationAnalyzer {
    pub fn new(sr: u32) -> Self {
        Self::with_params(sr, 0.25, 0.5, 5.0)
    }

    pub fn with_params(sr: u32, hop_length_s: f64, frame_length_s: f64, window_duration_s: f64) -> Self {
        let hop_length = (sr as f64 * hop_length_s) as usize;
        let frame_length = (sr as f64 * frame_length_s) as usize;
        let window_frames = (1.0_f64).max((sr as f64 * window_duration_s / hop_length.max(1) as f64).floor()) as usize;

        Self {
            sr,
            hop_length: hop_length.max(1),
            frame_length: frame_length.max(1),
            rms_window: WindowedBuffer::new(window_frames.max(1)),
            peak_window: WindowedBuffer::new(window_frames.max(1)),
            rms_stats: RunningStatistics::new(),
            peak_stats: RunningStatistics::new(),
            audio_buffer: VecDeque::new(),
            frame_count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.rms_window.clear();
        self.peak_window.clear();
        self.rms_stats.reset();
        self.peak_stats.reset();
        self.audio_buffer.clear();
        self.frame_count = 0;
    }

    pub fn update(&mut self, frame: &[f32]) -> VariationMetrics {
        self.frame_count += 1;

        self.audio_buffer.extend(frame.iter().copied());
        while self.audio_buffer.len() > self.frame_length {
            self.audio_buffer.pop_front();
        }

        if self.audio_buffer.len() >= self.frame_length {
            let chunk: Vec<f32> = self.audio_buffer.iter().copied().collect();
            let rms_val = (chunk.iter().map(|s| (*s as f64).powi(2)).sum::<f64>() / chunk.len() as f64).sqrt();
            let rms_db = 20.0 * rms_val.max(1e-10).log10();
            let peak_val = chunk.iter().map(|s| s.abs() as f64).fold(0.0, f64::max);

            self.rms_window.push(rms_db);
            self.peak_window.push(peak_val);
            self.rms_stats.update(rms_db);
            self.peak_stats.update(peak_val);
        }

        self.metrics()
    }

    pub fn metrics(&self) -> VariationMetrics {
        let peak_mean = self.peak_stats.mean();
        let peak_std = self.peak_stats.std();

        let dynamic_range_variation = if peak_mean > 0.0 {
            (peak_std / peak_mean).clamp(0.0, 1.0)
        } else {
            0.5
        };

        let loudness_variation_std = self.rms_stats.std().clamp(0.0, 10.0);

        let peak_consistency = if self.peak_stats.count() < 2 {
            0.5
        } else if peak_mean > 0.0 {
            (1.0 - peak_std / peak_mean).clamp(0.0, 1.0)
        } else {
            0.5
        };

        VariationMetrics {
            dynamic_range_variation,
            loudness_variation_std,
            peak_consistency,
        }
    }

    pub fn confidence(&self) -> VariationConfidence {
        let stabilization_frames = ((self.sr as f64 * 5.0 / self.hop_length as f64).floor() as u64).max(1);
        let c = (self.peak_stats.count() as f64 / stabilization_frames as f64).clamp(0.0, 1.0);
        VariationConfidence {
            dynamic_range_variation: c,
            loudness_variation_std: c,
            peak_consistency: c,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_amplitude_reaches_high_consistency() {
        let mut analyzer = StreamingVariationAnalyzer::new(44100);
        let frame: Vec<f32> = (0..4410).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let mut metrics = analyzer.metrics();
        for _ in 0..20 {
            metrics = analyzer.update(&frame);
        }
        assert!(metrics.peak_consistency > 0.8);
    }

    #[test]
    fn test_confidence_grows_with_frames() {
        let mut analyzer = StreamingVariationAnalyzer::new(44100);
        let frame = vec![0.1_f32; 4410];
        let initial = analyzer.confidence().peak_consistency;
        for _ in 0..50 {
            analyzer.update(&frame);
        }
        let later = analyzer.confidence().peak_consistency;
        assert!(later >= initial);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut analyzer = StreamingVariationAnalyzer::new(44100);
        let frame = vec![0.3_f32; 4410];
        analyzer.update(&frame);
        analyzer.reset();
        assert_eq!(analyzer.frame_count(), 0);
        assert_eq!(analyzer.metrics().peak_consistency, 0.5);
    }
}
