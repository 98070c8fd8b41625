/// Temporal variation analysis
/// Measures how dynamic range, loudness, and peak level drift over the
/// course of a track, each reduced to a single bounded scalar.

use crate::metrics::{MetricUtils, SafeOperations};

const FRAME_SECONDS: f32 = 1.0;

/// Std dev of per-frame crest factor (`20*log10(peak/rms)`), normalized
/// against a 6 dB span so a perfectly stable mix reads near 0.0 and a mix
/// whose dynamic range swings by a full 6 dB reads near 1.0.
pub fn compute_dynamic_range_variation(signal: &[f32], sample_rate: u32) -> f32 {
    let crest_values = frame_metric(signal, sample_rate, |frame| {
        let peak = frame.iter().map(|s| s.abs() as f64).fold(0.0, f64::max);
        let rms = compute_rms(frame) as f64;
        20.0 * SafeOperations::safe_log(
            SafeOperations::safe_divide(peak, rms, 1.0),
            0.0,
        ) / std::f64::consts::LN_10
    });

    if crest_values.len() < 2 {
        return 0.0;
    }

    let std = compute_std_dev(&crest_values);
    MetricUtils::normalize_to_range(std, 6.0, true) as f32
}

/// Std dev of per-frame `20*log10(rms/max_rms)`, clipped to `[0, 10]` dB.
/// `max_rms` is the loudest 1s frame in the signal, so this measures how far
/// quieter passages fall below the track's loudest moment.
pub fn compute_loudness_variation(signal: &[f32], sample_rate: u32) -> f32 {
    let rms_values = frame_metric(signal, sample_rate, |frame| compute_rms(frame) as f64);

    if rms_values.len() < 2 {
        return 0.0;
    }

    let max_rms = rms_values.iter().cloned().fold(0.0, f64::max);
    if max_rms <= 1e-10 {
        return 0.0;
    }

    let db_values: Vec<f64> = rms_values
        .iter()
        .map(|&rms| 20.0 * SafeOperations::safe_log(rms / max_rms, 0.0) / std::f64::consts::LN_10)
        .collect();

    let std = compute_std_dev(&db_values);
    MetricUtils::clip_to_range(std, 0.0, 10.0) as f32
}

/// Consistency of per-frame peak level as a stability score in `[0, 1]`:
/// the coefficient of variation of per-frame peaks mapped through
/// `stability_from_cv`, so a track whose peaks never move reads near 1.0.
pub fn compute_peak_consistency(signal: &[f32], sample_rate: u32) -> f32 {
    let peak_values = frame_metric(signal, sample_rate, |frame| {
        frame.iter().map(|s| s.abs() as f64).fold(0.0, f64::max)
    });

    if peak_values.len() < 2 {
        return 1.0;
    }

    let cv = compute_cv(&peak_values);
    MetricUtils::stability_from_cv(cv, 1.0) as f32
}

/// Applies `metric_fn` to consecutive ~1s frames of `signal`.
fn frame_metric<F>(signal: &[f32], sample_rate: u32, metric_fn: F) -> Vec<f64>
where
    F: Fn(&[f32]) -> f64,
{
    let frame_size = ((sample_rate as f32) * FRAME_SECONDS).max(1.0) as usize;
    if signal.len() < frame_size {
        return Vec::new();
    }
    signal.chunks(frame_size).map(metric_fn).collect()
}

fn compute_rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = signal.iter().map(|s| s * s).sum();
    (sum_sq / signal.len() as f32).sqrt()
}

fn compute_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Coefficient of variation = std / mean, guarded against a near-zero mean.
fn compute_cv(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let std = compute_std_dev(values);
    SafeOperations::safe_divide(std, mean.abs(), 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_has_zero_variation() {
        let signal = vec![0.0f32; 44100 * 3];
        assert_eq!(compute_dynamic_range_variation(&signal, 44100), 0.0);
        assert_eq!(compute_loudness_variation(&signal, 44100), 0.0);
    }

    #[test]
    fn test_constant_amplitude_is_consistent() {
        let signal = vec![0.5f32; 44100 * 3];
        let consistency = compute_peak_consistency(&signal, 44100);
        assert!(consistency > 0.99, "expected near-1.0, got {}", consistency);
    }

    #[test]
    fn test_loudness_variation_detects_swell() {
        let mut signal = Vec::new();
        for _ in 0..44100 {
            signal.push(0.1);
        }
        for _ in 0..44100 {
            signal.push(0.9);
        }
        let variation = compute_loudness_variation(&signal, 44100);
        assert!(variation > 0.0);
        assert!(variation <= 10.0);
    }

    #[test]
    fn test_dynamic_range_variation_bounded() {
        let signal: Vec<f32> = (0..44100 * 3)
            .map(|i| (i as f32 * 0.01).sin() * 0.5)
            .collect();
        let variation = compute_dynamic_range_variation(&signal, 44100);
        assert!(variation >= 0.0 && variation <= 1.0);
    }

    #[test]
    fn test_too_short_signal_returns_defaults() {
        let signal = vec![0.5f32; 100];
        assert_eq!(compute_dynamic_range_variation(&signal, 44100), 0.0);
        assert_eq!(compute_loudness_variation(&signal, 44100), 0.0);
        assert_eq!(compute_peak_consistency(&signal, 44100), 1.0);
    }

    #[test]
    fn test_peak_consistency_varies_with_transients() {
        let mut signal = vec![0.1f32; 44100 * 4];
        for i in 0..4 {
            signal[i * 44100] = 0.9;
        }
        let consistency = compute_peak_consistency(&signal, 44100);
        assert!(consistency < 1.0);
    }
}
