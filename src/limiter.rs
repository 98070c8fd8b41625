/// Adaptive Limiter
///
/// Lookahead brick-wall limiter: per-sample peak across channels, zero-padded
/// and run through an O(N) sliding-window maximum filter, then used to drive
/// a serial gain envelope with instant attack and exponential release.
///
/// Key features:
/// - Lookahead brick-wall limiting via sliding-window maximum
/// - Inter-sample peak detection (ISR)
/// - Optional 2x/4x oversampling
/// - Peak-hold metering

use std::collections::VecDeque;

/// Configuration for limiter
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    pub sample_rate: usize,
    pub threshold_db: f32,
    pub release_ms: f32,
    pub lookahead_ms: f32,
    pub isr_enabled: bool,
    pub oversampling: usize, // 1 (off), 2, or 4
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            threshold_db: -0.1,
            release_ms: 50.0,
            lookahead_ms: 5.0,
            isr_enabled: true,
            oversampling: 1,
        }
    }
}

/// Limiting statistics
#[derive(Debug, Clone)]
pub struct LimitingInfo {
    pub input_peak_db: f32,
    pub output_peak_db: f32,
    pub gain_reduction_db: f32,
    pub threshold_db: f32,
    pub peak_hold_db: f32,
}

/// Adaptive Limiter
pub struct Limiter {
    config: LimiterConfig,
    lookahead_samples: usize,
    release_coeff: f32,

    // State carried across `process` calls so chunk boundaries are seamless.
    current_gain: f32,
    peak_hold: f32,
}

impl Limiter {
    /// Create a new limiter
    pub fn new(config: LimiterConfig) -> Self {
        let lookahead_samples = (config.lookahead_ms * config.sample_rate as f32 / 1000.0) as usize;
        let release_samples = (config.release_ms * 0.001 * config.sample_rate as f32).max(1.0);
        let release_coeff = (-1.0 / release_samples).exp();

        Self {
            config,
            lookahead_samples,
            release_coeff,
            current_gain: 1.0,
            peak_hold: 0.0,
        }
    }

    /// Seed the persisted gain state (the documented default is 1.0; a
    /// caller continuing a stream from a prior chunk may pass its last gain).
    pub fn seed_gain(&mut self, gain: f32) {
        self.current_gain = gain;
    }

    /// Per-sample absolute peak across channels, with optional inter-sample
    /// (linear-interpolated) peak detection folded in.
    fn per_sample_envelope(&self, audio: &[f32]) -> Vec<f32> {
        if !self.config.isr_enabled || audio.len() < 2 {
            return audio.iter().map(|&x| x.abs()).collect();
        }

        let mut env = Vec::with_capacity(audio.len());
        for i in 0..audio.len() {
            let sample_peak = audio[i].abs();
            let interp_peak = if i + 1 < audio.len() {
                ((audio[i] + audio[i + 1]) / 2.0).abs()
            } else {
                0.0
            };
            env.push(sample_peak.max(interp_peak));
        }
        env
    }

    /// O(N) sliding-window maximum over a zero-padded envelope, shifted so
    /// that `result[i]` is the max of `env[i..i+window]` — the origin is
    /// shifted forward by `window` so the limiter reacts ahead of a
    /// transient rather than behind it.
    fn sliding_window_max(env: &[f32], window: usize) -> Vec<f32> {
        if window == 0 {
            return env.to_vec();
        }

        let mut padded = env.to_vec();
        padded.extend(std::iter::repeat(0.0).take(window));

        let mut result = vec![0.0; env.len()];
        let mut deque: VecDeque<usize> = VecDeque::new();

        for i in 0..padded.len() {
            while let Some(&back) = deque.back() {
                if padded[back] <= padded[i] {
                    deque.pop_back();
                } else {
                    break;
                }
            }
            deque.push_back(i);

            if let Some(&front) = deque.front() {
                if front + window <= i {
                    deque.pop_front();
                }
            }

            let out_idx = i as isize - (window as isize - 1);
            if out_idx >= 0 && (out_idx as usize) < result.len() {
                if let Some(&front) = deque.front() {
                    result[out_idx as usize] = padded[front];
                }
            }
        }

        result
    }

    /// Core limiting processing
    fn process_core(&mut self, audio: &[f32]) -> (Vec<f32>, LimitingInfo) {
        let threshold_linear = 10.0f32.powf(self.config.threshold_db / 20.0);

        let sample_env = self.per_sample_envelope(audio);
        let windowed_env = Self::sliding_window_max(&sample_env, self.lookahead_samples);

        let mut limited_audio = Vec::with_capacity(audio.len());
        let input_peak = sample_env.iter().cloned().fold(0.0f32, f32::max);

        for (i, &sample) in audio.iter().enumerate() {
            let env = windowed_env[i].max(1e-10);
            let target_gain = if env > threshold_linear {
                threshold_linear / env
            } else {
                1.0
            };

            // Instant attack: jump down immediately when gain must drop.
            // Exponential release: ease back up toward 1.0 otherwise.
            self.current_gain = if target_gain < self.current_gain {
                target_gain
            } else {
                target_gain + (self.current_gain - target_gain) * self.release_coeff
            };

            limited_audio.push(sample * self.current_gain);
        }

        let output_peak = limited_audio.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
        self.peak_hold = (self.peak_hold * 0.999).max(output_peak);

        let info = LimitingInfo {
            input_peak_db: 20.0 * input_peak.max(1e-10).log10(),
            output_peak_db: 20.0 * output_peak.max(1e-10).log10(),
            gain_reduction_db: 20.0 * self.current_gain.max(1e-10).log10(),
            threshold_db: self.config.threshold_db,
            peak_hold_db: 20.0 * self.peak_hold.max(1e-10).log10(),
        };

        (limited_audio, info)
    }

    /// Simple oversampling using zero-stuffing and a moving-average
    /// anti-aliasing filter.
    fn oversample(&self, audio: &[f32]) -> Vec<f32> {
        let factor = self.config.oversampling;
        if factor <= 1 {
            return audio.to_vec();
        }

        let mut oversampled = vec![0.0; audio.len() * factor];
        for (i, &sample) in audio.iter().enumerate() {
            oversampled[i * factor] = sample;
        }

        let kernel_size = factor * 2 + 1;
        let kernel_weight = 1.0 / kernel_size as f32;

        let mut filtered = vec![0.0; oversampled.len()];
        for i in 0..oversampled.len() {
            let start = i.saturating_sub(kernel_size / 2);
            let end = (i + kernel_size / 2 + 1).min(oversampled.len());
            filtered[i] = oversampled[start..end].iter().sum::<f32>() * kernel_weight * factor as f32;
        }

        filtered
    }

    fn downsample(&self, audio_os: &[f32]) -> Vec<f32> {
        let factor = self.config.oversampling;
        if factor <= 1 {
            return audio_os.to_vec();
        }
        audio_os.iter().step_by(factor).copied().collect()
    }

    /// Process audio through limiter
    ///
    /// # Arguments
    /// * `audio` - Input audio samples
    ///
    /// # Returns
    /// * Tuple of (processed_audio, limiting_info)
    pub fn process(&mut self, audio: &[f32]) -> (Vec<f32>, LimitingInfo) {
        if audio.is_empty() {
            return (
                Vec::new(),
                LimitingInfo {
                    input_peak_db: -100.0,
                    output_peak_db: -100.0,
                    gain_reduction_db: 0.0,
                    threshold_db: self.config.threshold_db,
                    peak_hold_db: -100.0,
                },
            );
        }

        if self.config.oversampling > 1 {
            let audio_os = self.oversample(audio);
            let (processed_os, limit_info) = self.process_core(&audio_os);
            let processed_audio = self.downsample(&processed_os);
            (processed_audio, limit_info)
        } else {
            self.process_core(audio)
        }
    }

    /// Reset limiter state
    pub fn reset(&mut self) {
        self.current_gain = 1.0;
        self.peak_hold = 0.0;
    }

    /// Get current limiter state
    pub fn get_state(&self) -> (f32, f32) {
        (self.current_gain, self.peak_hold)
    }
}

/// Convenience function for one-shot limiting
///
/// # Arguments
/// * `audio` - Input audio samples
/// * `config` - Limiter configuration
///
/// # Returns
/// * Tuple of (processed_audio, limiting_info)
pub fn limit(audio: &[f32], config: &LimiterConfig) -> (Vec<f32>, LimitingInfo) {
    let mut limiter = Limiter::new(config.clone());
    limiter.process(audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_creation() {
        let config = LimiterConfig::default();
        let limiter = Limiter::new(config);
        let (gain, peak_hold) = limiter.get_state();
        assert_eq!(gain, 1.0);
        assert_eq!(peak_hold, 0.0);
    }

    #[test]
    fn test_limit_silence() {
        let audio = vec![0.0; 1000];
        let config = LimiterConfig::default();
        let (processed, info) = limit(&audio, &config);

        assert_eq!(processed.len(), audio.len());
        assert!(info.gain_reduction_db >= -1.0);
    }

    #[test]
    fn test_limit_clipping_signal() {
        let audio = vec![1.2; 1000];
        let mut config = LimiterConfig::default();
        config.threshold_db = -0.1;

        let (processed, info) = limit(&audio, &config);

        let max_output = processed.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
        let threshold_linear = 10.0f32.powf(config.threshold_db / 20.0);
        assert!(max_output <= threshold_linear * 1.01);
        assert!(info.gain_reduction_db < 0.0);
    }

    #[test]
    fn test_sliding_window_max_is_monotone_and_bounded() {
        let env = vec![0.1, 0.9, 0.2, 0.2, 0.2, 0.05];
        let windowed = Limiter::sliding_window_max(&env, 2);
        assert_eq!(windowed.len(), env.len());
        assert!(windowed.iter().any(|&v| (v - 0.9).abs() < 1e-6));
    }

    #[test]
    fn test_seed_gain_is_respected() {
        let mut limiter = Limiter::new(LimiterConfig::default());
        limiter.seed_gain(0.5);
        assert_eq!(limiter.get_state().0, 0.5);
    }

    #[test]
    fn test_oversampling() {
        let audio: Vec<f32> = (0..100).map(|i| (i as f32 * 0.1).sin() * 0.95).collect();
        let mut config = LimiterConfig::default();

        for &factor in &[1, 2, 4] {
            config.oversampling = factor;
            let (processed, _) = limit(&audio, &config);
            assert_eq!(processed.len(), audio.len());
        }
    }

    #[test]
    fn test_isr_detection() {
        let audio: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin() * 0.9).collect();
        let mut config = LimiterConfig::default();

        config.isr_enabled = true;
        let (_, info_isr) = limit(&audio, &config);

        config.isr_enabled = false;
        let (_, info_no_isr) = limit(&audio, &config);

        assert!(info_isr.input_peak_db >= info_no_isr.input_peak_db - 1.0);
    }
}
