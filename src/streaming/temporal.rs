/// Real-time temporal/rhythmic metrics: `tempo_bpm`, `rhythm_stability`,
/// `transient_density`, `silence_ratio`. Onset detection and tempo
/// estimation are expensive relative to a single frame, so they only run
/// periodically once the rolling buffer fills — everything else (silence
/// ratio) updates every frame from a cheap RMS history.

use std::collections::VecDeque;

use ndarray::Array1;

use crate::metrics::MetricUtils;
use crate::onset_detector::OnsetDetector;
use crate::tempo::{detect_tempo, TempoConfig};

const SILENCE_THRESHOLD_DB: f64 = -40.0;
const EPSILON: f64 = 1e-10;

pub struct StreamingTemporalAnalyzer {
    sr: u32,
    buffer_duration_s: f64,
    hop_length: usize,
    audio_buffer: VecDeque<f32>,
    buffer_capacity: usize,
    frame_rms_values: VecDeque<f64>,
    tempo_estimate: f64,
    rhythm_stability_estimate: f64,
    transient_density_estimate: f64,
    frame_count: u64,
    analysis_counter: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct TemporalMetrics {
    pub tempo_bpm: f64,
    pub rhythm_stability: f64,
    pub transient_density: f64,
    pub silence_ratio: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct TemporalConfidence {
    pub tempo_bpm: f64,
    pub rhythm_stability: f64,
    pub transient_density: f64,
    pub silence_ratio: f64,
}

impl StreamingTemporalAnalyzer {
    pub fn new(sr: u32) -> Self {
        Self::with_params(sr, 2.0, 0.25)
    }

    pub fn with_params(sr: u32, buffer_duration_s: f64, hop_length_s: f64) -> Self {
        let hop_length = ((sr as f64 * hop_length_s) as usize).max(1);
        let buffer_capacity = (sr as f64 * buffer_duration_s) as usize;
        let rms_history_capacity = (sr as f64 * 10.0 / hop_length as f64) as usize;

        Self {
            sr,
            buffer_duration_s,
            hop_length,
            audio_buffer: VecDeque::with_capacity(buffer_capacity),
            buffer_capacity: buffer_capacity.max(1),
            frame_rms_values: VecDeque::with_capacity(rms_history_capacity.max(1)),
            tempo_estimate: 120.0,
            rhythm_stability_estimate: 0.5,
            transient_density_estimate: 0.5,
            frame_count: 0,
            analysis_counter: 0,
        }
    }

    pub fn reset(&mut self) {
        self.audio_buffer.clear();
        self.frame_rms_values.clear();
        self.tempo_estimate = 120.0;
        self.rhythm_stability_estimate = 0.5;
        self.transient_density_estimate = 0.5;
        self.frame_count = 0;
        self.analysis_counter = 0;
    }

    pub fn update(&mut self, frame: &[f32]) -> TemporalMetrics {
        self.frame_count += 1;
        self.analysis_counter += 1;

        self.audio_buffer.extend(frame.iter().copied());
        while self.audio_buffer.len() > self.buffer_capacity {
            self.audio_buffer.pop_front();
        }

        let rms_val = (frame.iter().map(|s| (*s as f64).powi(2)).sum::<f64>() / frame.len().max(1) as f64).sqrt();
        let rms_db = 20.0 * rms_val.max(EPSILON).log10();
        self.frame_rms_values.push_back(rms_db);
        while self.frame_rms_values.len() > self.frame_rms_values.capacity().max(1) {
            self.frame_rms_values.pop_front();
        }

        let frames_per_analysis = ((self.sr as f64 * self.buffer_duration_s / frame.len().max(1) as f64).floor() as u64).max(1);
        if self.analysis_counter >= frames_per_analysis {
            self.perform_analysis();
            self.analysis_counter = 0;
        }

        self.metrics()
    }

    fn perform_analysis(&mut self) {
        if self.audio_buffer.len() < (self.sr / 4) as usize {
            return;
        }

        let audio: Vec<f64> = self.audio_buffer.iter().map(|&s| s as f64).collect();

        let tempo = detect_tempo(&audio, self.sr as usize, &TempoConfig::default());
        self.tempo_estimate = MetricUtils::clip_to_range(tempo, 40.0, 200.0);

        let detector = OnsetDetector::new(self.sr as f64, 2048, 512);
        let array = Array1::from_vec(audio.clone());
        let result = detector.detect(&array.view());

        if result.onset_frames.len() >= 3 {
            let hop = 512.0;
            let times: Vec<f64> = result
                .onset_frames
                .iter()
                .map(|&f| f as f64 * hop / self.sr as f64)
                .collect();
            let intervals: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
            let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
            if mean > 0.0 {
                let std = (intervals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / intervals.len() as f64).sqrt();
                let cv = std / mean;
                self.rhythm_stability_estimate = MetricUtils::stability_from_cv(cv, 1.0).clamp(0.0, 1.0);
            }
        }

        let duration = audio.len() as f64 / self.sr as f64;
        let onset_density = result.onset_frames.len() as f64 / duration.max(0.1);
        self.transient_density_estimate = (onset_density / 10.0).clamp(0.0, 1.0);
    }

    pub fn metrics(&self) -> TemporalMetrics {
        TemporalMetrics {
            tempo_bpm: self.tempo_estimate,
            rhythm_stability: self.rhythm_stability_estimate,
            transient_density: self.transient_density_estimate,
            silence_ratio: self.silence_ratio(),
        }
    }

    fn silence_ratio(&self) -> f64 {
        if self.frame_rms_values.is_empty() {
            return 0.1;
        }
        let silent = self.frame_rms_values.iter().filter(|&&db| db < SILENCE_THRESHOLD_DB).count();
        (silent as f64 / self.frame_rms_values.len() as f64).clamp(0.0, 1.0)
    }

    pub fn confidence(&self) -> TemporalConfidence {
        let frames_per_analysis = ((self.sr as f64 * self.buffer_duration_s / 4000.0).floor() as u64).max(1);
        let analysis_confidence = (self.frame_count as f64 / (5.0 * frames_per_analysis as f64)).clamp(0.0, 1.0);
        let silence_confidence = (self.frame_rms_values.len() as f64 / 100.0).clamp(0.0, 1.0);

        TemporalConfidence {
            tempo_bpm: analysis_confidence,
            rhythm_stability: analysis_confidence,
            transient_density: analysis_confidence,
            silence_ratio: silence_confidence,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn analysis_count(&self) -> u64 {
        let frames_per_analysis = ((self.sr as f64 * self.buffer_duration_s / 4000.0).floor() as u64).max(1);
        self.frame_count / frames_per_analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_ratio_is_high_for_quiet_audio() {
        let mut analyzer = StreamingTemporalAnalyzer::new(44100);
        let frame = vec![0.0_f32; 2205];
        for _ in 0..30 {
            analyzer.update(&frame);
        }
        assert!(analyzer.metrics().silence_ratio > 0.5);
    }

    #[test]
    fn test_tempo_defaults_to_120_before_first_analysis() {
        let analyzer = StreamingTemporalAnalyzer::new(44100);
        assert_eq!(analyzer.metrics().tempo_bpm, 120.0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut analyzer = StreamingTemporalAnalyzer::new(44100);
        let frame = vec![0.2_f32; 2205];
        for _ in 0..30 {
            analyzer.update(&frame);
        }
        analyzer.reset();
        assert_eq!(analyzer.frame_count(), 0);
        assert_eq!(analyzer.metrics().tempo_bpm, 120.0);
    }
}
